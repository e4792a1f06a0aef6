//! Outbound prompt construction.

use crate::ai::topic::Topic;
use crate::chat::message::{Message, Sender};

/// Build the outbound prompt: optional history block, topic prefix, user text.
///
/// Only the last `max_history` entries of `history` are used.
#[must_use]
pub fn build_prompt(user_text: &str, topic: Topic, history: &[Message], max_history: usize) -> String {
    let start = history.len().saturating_sub(max_history);
    let window = &history[start..];

    let prefix = topic.prompt_prefix();
    let mut out = String::with_capacity(estimate_len(window) + prefix.len() + user_text.len());

    if !window.is_empty() {
        out.push_str("Previous conversation:\n");
        for message in window {
            render_turn(&mut out, message);
        }
        out.push('\n');
    }

    out.push_str(prefix);
    out.push_str(user_text);
    out
}

fn render_turn(out: &mut String, message: &Message) {
    let role = match message.sender {
        Sender::User => "User",
        Sender::Ai => "Assistant",
    };
    out.push_str(role);
    out.push_str(": ");
    out.push_str(&message.text);
    out.push('\n');
}

fn estimate_len(window: &[Message]) -> usize {
    if window.is_empty() {
        return 0;
    }
    "Previous conversation:\n".len() + 1 + window.iter().map(|m| m.text.len() + 12).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_history() {
        let prompt = build_prompt("What is an atom?", Topic::Science, &[], 6);
        assert_eq!(
            prompt,
            format!("{}What is an atom?", Topic::Science.prompt_prefix())
        );
    }

    #[test]
    fn test_prompt_with_bounded_history() {
        let history = vec![
            Message::user("first"),
            Message::ai("second"),
            Message::user("third"),
        ];
        let prompt = build_prompt("next", Topic::General, &history, 2);
        assert!(prompt.starts_with("Previous conversation:\nAssistant: second\nUser: third\n\n"));
        assert!(!prompt.contains("first"));
        assert!(prompt.ends_with("next"));
    }

    #[test]
    fn test_zero_history_window() {
        let history = vec![Message::user("old")];
        let prompt = build_prompt("new", Topic::Math, &history, 0);
        assert!(!prompt.contains("Previous conversation"));
    }
}
