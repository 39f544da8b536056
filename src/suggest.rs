//! Turning assistant answers into task suggestions.
//!
//! Extraction is pure; creating todos from the candidates is a separate,
//! confirmed step in the controller.

use crate::ai::{ChatMessage, ChatRole, ConversationView};
use regex_lite::Regex;
use std::sync::LazyLock;

/// `1.`, `-` or `*` at the start of a line. The whitespace after it is
/// checked separately since regex-lite's `\s` is ASCII only.
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.|-|\*)").expect("list marker pattern is valid"));

/// Candidate task descriptions from a transcript entry, in line order.
///
/// Returns nothing unless the entry is an assistant message and no response
/// is currently in flight.
pub fn extract_candidates(message: &ChatMessage, in_flight: bool) -> Vec<String> {
    if in_flight || message.role != ChatRole::Assistant {
        return Vec::new();
    }
    candidates_from_text(&message.content.text())
}

/// List-formatted lines of `text` with their markers removed.
pub fn candidates_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > 2)
        .filter_map(list_item_body)
        .map(str::to_string)
        .collect()
}

/// Text after a list marker, which must be followed by whitespace.
fn list_item_body(line: &str) -> Option<&str> {
    let rest = &line[LIST_MARKER.find(line)?.end()..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim()).filter(|item| !item.is_empty())
}

/// Fires extraction once per completed assistant turn.
///
/// Feed it every [`ConversationView`] published by the conversation; it
/// yields candidates only when the transcript has grown and nothing is in
/// flight any more.
#[derive(Debug, Clone, Default)]
pub struct SuggestionTracker {
    seen_messages: usize,
}

impl SuggestionTracker {
    /// Start tracking after the messages already in `view`, so history loaded
    /// on startup never produces suggestions.
    pub fn starting_at(view: &ConversationView) -> Self {
        Self {
            seen_messages: view.messages.len(),
        }
    }

    pub fn observe(&mut self, view: &ConversationView) -> Option<Vec<String>> {
        if view.is_loading || view.messages.len() <= self.seen_messages {
            return None;
        }
        self.seen_messages = view.messages.len();

        let candidates = extract_candidates(view.last()?, view.is_loading);
        if candidates.is_empty() {
            None
        } else {
            Some(candidates)
        }
    }
}
