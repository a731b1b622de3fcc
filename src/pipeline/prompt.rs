//! Prompt assembly: system instruction + bill text as the user turn.

use edgequake_llm::ChatMessage;

/// The two messages sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Whether `user` was cut short to fit the character budget.
    pub truncated: bool,
}

impl Prompt {
    /// Build a prompt, keeping at most `max_chars` characters of `raw_text`.
    ///
    /// Truncation is silent: no marker is appended.
    pub fn assemble(system: &str, raw_text: &str, max_chars: usize) -> Self {
        let user = truncate_chars(raw_text, max_chars);
        Self {
            system: system.to_string(),
            truncated: user.len() < raw_text.len(),
            user: user.to_string(),
        }
    }

    /// Chat messages in request order.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(&self.system),
            ChatMessage::user(&self.user),
        ]
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_INPUT_CHARS;

    #[test]
    fn long_text_is_cut_to_exact_budget() {
        let text = "a".repeat(MAX_INPUT_CHARS + 5_000);
        let prompt = Prompt::assemble("sys", &text, MAX_INPUT_CHARS);
        assert_eq!(prompt.user.chars().count(), MAX_INPUT_CHARS);
        assert!(prompt.truncated);
    }

    #[test]
    fn short_text_unchanged() {
        let prompt = Prompt::assemble("sys", "CONTA DE ENERGIA", MAX_INPUT_CHARS);
        assert_eq!(prompt.user, "CONTA DE ENERGIA");
        assert_eq!(prompt.system, "sys");
        assert!(!prompt.truncated);
    }

    #[test]
    fn text_at_exact_budget_unchanged() {
        let text = "x".repeat(10);
        let prompt = Prompt::assemble("sys", &text, 10);
        assert_eq!(prompt.user, text);
        assert!(!prompt.truncated);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "ção".repeat(4);
        let prompt = Prompt::assemble("sys", &text, 5);
        assert_eq!(prompt.user, "çãoçã");
    }

    #[test]
    fn messages_are_system_then_user() {
        let prompt = Prompt::assemble("instrução", "texto", 100);
        assert_eq!(prompt.to_messages().len(), 2);
    }
}
