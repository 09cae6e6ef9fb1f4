//! Command-line arguments and command handlers.

use std::io::Read as _;

use anyhow::{Context as _, Result, anyhow, bail};
use chat_adapter::models::{self, DEFAULT_CHAT_MODEL};
use chat_adapter::observability::{LogSettings, init_with};
use chat_adapter::prelude::*;
use clap::{Args, Parser, Subcommand};

use crate::render::{self, Renderer};

/// Chat with DashScope-hosted models from the terminal.
#[derive(Debug, Parser)]
#[command(name = "chat-adapter", version, about)]
pub struct App {
    /// Print events and results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (use -v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a message and print the answer
    Chat(ChatCmd),
    /// Generate a conversation title for a first message
    Title(TitleCmd),
    /// List the models offered for chat
    Models,
}

#[derive(Debug, Args)]
pub struct ChatCmd {
    /// Catalog model id or `provider/model`
    #[arg(short, long, default_value = DEFAULT_CHAT_MODEL)]
    pub model: String,

    /// System prompt sent before the message
    #[arg(short, long)]
    pub system: Option<String>,

    /// Wait for the full answer instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Message text; read from stdin when omitted
    pub message: Vec<String>,
}

#[derive(Debug, Args)]
pub struct TitleCmd {
    /// First message of the conversation; read from stdin when omitted
    pub message: Vec<String>,
}

impl App {
    /// Initializes logging from the environment. `-v` raises the level when
    /// no explicit level is configured.
    pub fn init_logging(&self) {
        let mut settings = LogSettings::from_env();
        if settings.level.is_none() && self.verbose > 0 {
            settings.level = Some(
                match self.verbose {
                    1 => "chat_adapter=debug",
                    2 => "debug",
                    _ => "trace",
                }
                .to_string(),
            );
        }
        init_with(settings);
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Models => render::model_list(self.json),
            Command::Title(cmd) => {
                let harness = Harness::from_env()?;
                let message = message_text(&cmd.message)?;
                let title = harness.generate_title(&message).await;
                render::title(&title, self.json)
            }
            Command::Chat(cmd) => cmd.run(self.json).await,
        }
    }
}

impl ChatCmd {
    fn generation(&self) -> GenerationConfig {
        let mut generation = GenerationConfig::default();
        if let Some(temperature) = self.temperature {
            generation = generation.temperature(temperature);
        }
        if let Some(top_p) = self.top_p {
            generation = generation.top_p(top_p);
        }
        if let Some(max_tokens) = self.max_tokens {
            generation = generation.max_tokens(max_tokens);
        }
        generation
    }

    pub async fn run(&self, json: bool) -> Result<()> {
        let model = models::resolve(&self.model)
            .ok_or_else(|| anyhow!("unknown model `{}`", self.model))?;
        let message = message_text(&self.message)?;
        let harness = Harness::from_env()?;

        let mut run = harness
            .session(SessionConfig::named("cli"))
            .run(model)
            .generation_config(self.generation())
            .user_text(message);
        if let Some(system) = &self.system {
            run = run.system_prompt(system.clone());
        }

        if self.no_stream {
            let response = run.generate().await?;
            return render::response(&response, json);
        }

        let mut stream = run.start_stream().await?;
        let abort = stream.abort_handle();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, aborting run");
                abort.abort();
            }
        });

        let mut renderer = Renderer::new(json);
        while let Some(event) = stream.next_event().await {
            renderer.event(&event)?;
        }
        let outcome = stream.finish().await;
        interrupt.abort();

        match outcome {
            Ok(_) => Ok(()),
            Err(ChatError::Cancelled) => {
                eprintln!("\ncancelled");
                Ok(())
            }
            // Already reported through the event stream.
            Err(ChatError::StreamFailed { .. }) => std::process::exit(1),
            Err(err) => Err(err.into()),
        }
    }
}

/// Joins positional words, or reads stdin when there are none.
fn message_text(words: &[String]) -> Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read message from stdin")?;
    if text.trim().is_empty() {
        bail!("no message given");
    }
    Ok(text)
}
