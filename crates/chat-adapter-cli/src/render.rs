//! Terminal output.
//!
//! Answer text goes to stdout; reasoning and status lines go to stderr so the
//! answer can be piped on its own.

use std::io::{self, Write as _};

use anyhow::Result;
use chat_adapter::models;
use chat_adapter::prelude::*;

pub struct Renderer {
    json: bool,
    wrote_text: bool,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            wrote_text: false,
        }
    }

    pub fn event(&mut self, event: &StreamEvent) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }
        match event {
            StreamEvent::ReasoningStart { .. } => eprintln!("[thinking]"),
            StreamEvent::ReasoningDelta { text } => {
                eprint!("{text}");
                io::stderr().flush()?;
            }
            StreamEvent::ReasoningTimeUpdate { .. } => {}
            StreamEvent::ReasoningEnd { elapsed_secs, .. } => {
                eprintln!("\n[thought for {elapsed_secs}s]");
            }
            StreamEvent::TextDelta { text } => {
                self.wrote_text = true;
                print!("{text}");
                io::stdout().flush()?;
            }
            StreamEvent::Finish { reason, usage } => {
                if self.wrote_text {
                    println!();
                }
                eprintln!(
                    "[{reason}; prompt {} + completion {} tokens]",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }
            StreamEvent::StreamError { kind, message } => {
                if self.wrote_text {
                    println!();
                }
                eprintln!("error ({kind}): {message}");
            }
        }
        Ok(())
    }
}

pub fn response(response: &ChatResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(response)?);
        return Ok(());
    }
    if let Some(reasoning) = &response.reasoning {
        eprintln!("[thinking]\n{reasoning}");
    }
    println!("{}", response.text);
    eprintln!(
        "[{}; prompt {} + completion {} tokens]",
        response.finish_reason, response.usage.prompt_tokens, response.usage.completion_tokens
    );
    Ok(())
}

pub fn title(title: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "title": title }));
    } else {
        println!("{title}");
    }
    Ok(())
}

pub fn model_list(json: bool) -> Result<()> {
    let chat: Vec<_> = models::chat_models().collect();
    if json {
        println!("{}", serde_json::to_string(&chat)?);
        return Ok(());
    }
    for model in chat {
        println!(
            "{:<20} {}/{}  {}",
            model.id, model.provider, model.model, model.name
        );
    }
    Ok(())
}
