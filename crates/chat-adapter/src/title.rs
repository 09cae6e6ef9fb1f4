//! Conversation title generation.

use tracing::warn;

use crate::harness::Harness;
use crate::model::ModelRef;
use crate::models;
use crate::session::SessionConfig;

/// Title returned whenever generation fails.
pub const FALLBACK_TITLE: &str = "新对话";
/// Upper bound on title length, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

const TITLE_SYSTEM_PROMPT: &str = "\
- 你将根据用户的第一条消息生成一个简短的标题
- 确保标题不超过80个字符
- 标题应该是用户消息的摘要
- 不要使用引号或冒号";

const TITLE_QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '「', '」', '《', '》', '`'];

/// Generates a short title for the first message of a conversation using the
/// catalog title model.
///
/// Never fails: any error, or an empty answer, yields [`FALLBACK_TITLE`].
pub async fn generate_title(harness: &Harness, message: &str) -> String {
    generate_title_with(harness, models::title_model(), message).await
}

/// Same as [`generate_title`] with an explicit model.
pub async fn generate_title_with(harness: &Harness, model: ModelRef, message: &str) -> String {
    if message.trim().is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    let result = harness
        .session(SessionConfig::named("title"))
        .run(model)
        .system_prompt(TITLE_SYSTEM_PROMPT)
        .user_text(message)
        .temperature(0.5)
        .top_p(0.8)
        .max_tokens(100)
        .generate()
        .await;
    match result {
        Ok(response) => clean_title(&response.text).unwrap_or_else(|| {
            warn!("title model returned no usable text, using fallback title");
            FALLBACK_TITLE.to_string()
        }),
        Err(err) => {
            warn!(error = %err, "title generation failed, using fallback title");
            FALLBACK_TITLE.to_string()
        }
    }
}

/// Normalizes a model-produced title: first non-empty line, surrounding
/// quotes removed, at most [`MAX_TITLE_CHARS`] characters.
pub fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_matches(TITLE_QUOTES).trim();
    let title: String = line.chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim_end().to_string();
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::errors::AdapterError;
    use crate::transport::testing::{Script, ScriptedTransport};
    use crate::vendors::dashscope::{DashScopeConfig, DashScopeProvider};

    fn harness(transport: &ScriptedTransport) -> Harness {
        Harness::builder()
            .register_provider(Arc::new(DashScopeProvider::new(DashScopeConfig::new("sk"))))
            .transport(Arc::new(transport.clone()))
            .build()
            .expect("harness")
    }

    #[test]
    fn clean_title_strips_quotes_and_extra_lines() {
        assert_eq!(clean_title("  “Rust 异步入门”\n解释如下"), Some("Rust 异步入门".into()));
        assert_eq!(clean_title("\n\n\"Plan a trip\""), Some("Plan a trip".into()));
        assert_eq!(clean_title("  \n \"\" "), None);
    }

    #[test]
    fn clean_title_truncates_by_characters() {
        let long = "题".repeat(100);
        let title = clean_title(&long).expect("title");
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[tokio::test]
    async fn generates_title_with_title_parameters() {
        let transport = ScriptedTransport::new(Script::Chunks(vec![
            "{\"output\":{\"text\":\"  周末旅行计划 \"}}",
        ]));
        let title = generate_title(&harness(&transport), "帮我规划一下这个周末去杭州的行程").await;
        assert_eq!(title, "周末旅行计划");

        let sent = transport.last_request().expect("request");
        assert_eq!(sent.body["model"], "qwen-max");
        assert_eq!(
            sent.body["parameters"],
            serde_json::json!({"temperature": 0.5, "top_p": 0.8, "max_tokens": 100})
        );
        assert_eq!(sent.body["input"]["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn failures_degrade_to_fallback() {
        let transport = ScriptedTransport::new(Script::Fail(AdapterError::upstream_http(
            "bailian", 500, "oops",
        )));
        assert_eq!(generate_title(&harness(&transport), "hello").await, FALLBACK_TITLE);

        let empty = ScriptedTransport::new(Script::Chunks(vec!["{\"output\":{\"text\":\"\"}}"]));
        assert_eq!(generate_title(&harness(&empty), "hello").await, FALLBACK_TITLE);

        let unregistered = Harness::builder().build().expect("harness");
        assert_eq!(generate_title(&unregistered, "hello").await, FALLBACK_TITLE);
    }

    #[tokio::test]
    async fn blank_message_skips_the_request() {
        let transport = ScriptedTransport::new(Script::Chunks(vec![]));
        assert_eq!(generate_title(&harness(&transport), "   ").await, FALLBACK_TITLE);
        assert_eq!(transport.call_count(), 0);
    }
}
