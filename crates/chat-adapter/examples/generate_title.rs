use chat_adapter::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ChatError> {
    let harness = Harness::from_env()?;

    let title = harness
        .generate_title("帮我写一个周末去杭州的两日游行程")
        .await;
    println!("{title}");

    let response = harness
        .session(SessionConfig::named("buffered"))
        .run(ModelRef::new("bailian", "qwen-max"))
        .user_text("用一句话介绍西湖。")
        .generate()
        .await?;
    println!("{} ({} tokens)", response.text, response.usage.total_tokens());
    Ok(())
}
