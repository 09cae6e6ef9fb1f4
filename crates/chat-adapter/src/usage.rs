//! Token usage accounting.
//!
//! When an upstream response carries no usage figures, counts are estimated
//! with a character-class heuristic. The estimate is only an approximation and
//! is not suitable for billing.

/// Token counts for one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    /// Estimates usage from the serialized prompt and the generated text.
    ///
    /// Answer and reasoning text are estimated separately and summed.
    pub fn estimate(prompt: &str, answer: &str, reasoning: &str) -> Self {
        Self {
            prompt_tokens: estimate_tokens(prompt),
            completion_tokens: estimate_tokens(answer).saturating_add(estimate_tokens(reasoning)),
        }
    }
}

// Weights in tenths of a token.
const CJK_WEIGHT: u64 = 15;
const WORD_WEIGHT: u64 = 13;
const OTHER_WEIGHT: u64 = 5;

/// Estimates the token count of `text`.
///
/// CJK ideographs weigh 1.5 tokens each, every run of Latin letters weighs
/// 1.3 tokens, and every other character weighs 0.5 tokens. The sum is
/// rounded up. Appending text never lowers the result.
pub fn estimate_tokens(text: &str) -> u32 {
    let mut tenths: u64 = 0;
    let mut in_word = false;
    for ch in text.chars() {
        if is_cjk_ideograph(ch) {
            tenths += CJK_WEIGHT;
            in_word = false;
        } else if is_latin_letter(ch) {
            if !in_word {
                tenths += WORD_WEIGHT;
                in_word = true;
            }
        } else {
            tenths += OTHER_WEIGHT;
            in_word = false;
        }
    }
    u32::try_from(tenths.div_ceil(10)).unwrap_or(u32::MAX)
}

/// ASCII letters plus the accented letters of Latin-1 Supplement and Latin
/// Extended-A/B. `×` and `÷` are symbols.
fn is_latin_letter(ch: char) -> bool {
    match ch {
        'A'..='Z' | 'a'..='z' => true,
        '\u{C0}'..='\u{24F}' => ch != '\u{D7}' && ch != '\u{F7}',
        _ => false,
    }
}

fn is_cjk_ideograph(ch: char) -> bool {
    matches!(
        ch,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn weights_follow_character_classes() {
        // one word: 1.3 -> 2
        assert_eq!(estimate_tokens("Hello"), 2);
        // two words and a space: 1.3 + 1.3 + 0.5 = 3.1 -> 4
        assert_eq!(estimate_tokens("Hello world"), 4);
        // two ideographs: 3.0
        assert_eq!(estimate_tokens("你好"), 3);
        // ideograph + punctuation: 1.5 + 0.5 = 2.0
        assert_eq!(estimate_tokens("好!"), 2);
        // digits are "other" characters
        assert_eq!(estimate_tokens("2024"), 2);
    }

    #[test]
    fn accented_letters_stay_in_one_word() {
        assert_eq!(estimate_tokens("café"), estimate_tokens("cafe"));
        // two words and a space: 3.1 -> 4
        assert_eq!(estimate_tokens("señor niño"), 4);
        assert_eq!(estimate_tokens("Łódź"), 2);
        // multiplication sign splits: 1.3 + 0.5 + 1.3 = 3.1 -> 4
        assert_eq!(estimate_tokens("a×b"), 4);
    }

    #[test]
    fn mixed_text_is_stable() {
        // 4 * 1.5 + 3 words * 1.3 + 4 others * 0.5 = 11.9 -> 12
        assert_eq!(estimate_tokens("通义千问 is a model."), 12);
    }

    #[test]
    fn estimate_is_monotonic_over_prefixes() {
        let text = "Rust 是一门系统编程语言, with zero-cost abstractions! 🚀 done";
        let mut previous = 0;
        for (idx, _) in text.char_indices().skip(1) {
            let current = estimate_tokens(&text[..idx]);
            assert!(current >= previous, "estimate dropped at byte {idx}");
            previous = current;
        }
        assert!(estimate_tokens(text) >= previous);
    }

    #[test]
    fn usage_estimate_sums_answer_and_reasoning() {
        let usage = Usage::estimate("[]", "Hello", "think");
        assert_eq!(usage.prompt_tokens, 1);
        assert_eq!(usage.completion_tokens, 4);
        assert_eq!(usage.total_tokens(), 5);
    }
}
