use chat_adapter::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ChatError> {
    chat_adapter::observability::init_observability();
    let harness = Harness::from_env()?;

    let mut run = harness
        .session(SessionConfig::named("stream"))
        .run(ModelRef::new("deepseek", "deepseek-r1"))
        .system_prompt("Answer in one short paragraph.")
        .user_text("Why is the sky blue?")
        .start_stream()
        .await?;

    while let Some(event) = run.next_event().await {
        match event {
            StreamEvent::ReasoningStart { .. } => eprintln!("[thinking]"),
            StreamEvent::ReasoningDelta { text } => eprint!("{text}"),
            StreamEvent::ReasoningTimeUpdate { elapsed_secs, .. } => {
                eprintln!("\n[thinking for {elapsed_secs}s]")
            }
            StreamEvent::ReasoningEnd { elapsed_secs, .. } => {
                eprintln!("\n[thought for {elapsed_secs}s]")
            }
            StreamEvent::TextDelta { text } => print!("{text}"),
            StreamEvent::Finish { reason, usage } => {
                println!("\n[{reason}, {} tokens]", usage.total_tokens())
            }
            StreamEvent::StreamError { message, .. } => eprintln!("run error: {message}"),
        }
    }

    Ok(())
}
