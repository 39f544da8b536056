//! AI conversation and structured task generation.
//!
//! Model invocation itself lives behind the [`ChatModel`] trait; this module
//! owns the transcript, the in-flight flag and the parsing of structured
//! generation output.

pub mod conversation;
pub mod generation;

pub use conversation::{ChatModel, ConversationSession, ConversationView, ScriptedModel};
pub use generation::{TaskGenerator, TaskPlan, parse_task_plan};

use serde::{Deserialize, Serialize};

/// Default conversation identifier.
pub const DEFAULT_CONVERSATION_ID: &str = "chat";

/// System prompt shared by the conversation and the generation endpoint.
pub const TASK_DECOMPOSITION_PROMPT: &str = "\
You are a capable task management assistant. Analyse the user's request and break it down into tasks.

Always answer with the JSON object described below and nothing else.

### Output format
- name: a string title representing the whole task
- ingredients: an array of strings listing the subtasks or things needed
- instructions: a single string describing the overall procedure

### Example
User: \"Apply for a new passport in Tokyo\"
You:
{
  \"name\": \"New passport application in Tokyo\",
  \"ingredients\": [
    \"Certified copy of family register\",
    \"Passport photo\",
    \"Photo ID such as a driving licence\",
    \"Passport application form\",
    \"Fees (revenue stamp and prefectural fee)\"
  ],
  \"instructions\": \"1. Gather the documents.\\n2. Fill in the application form.\\n3. Apply at the nearest passport office.\\n4. Pay the fees and collect the passport within the stated period.\"
}
";

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One piece of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Text { text: String },
    Image { key: String },
    ToolUse { name: String, input: serde_json::Value },
    /// Any fragment kind this crate does not know.
    #[serde(other)]
    Other,
}

/// Message content: a plain string or a sequence of fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Fragments(Vec<Fragment>),
}

impl ChatContent {
    /// Plain text of the message. Non-text fragments are skipped and text
    /// fragments are joined as-is, without a separator.
    pub fn text(&self) -> String {
        match self {
            ChatContent::Text(s) => s.clone(),
            ChatContent::Fragments(parts) => parts
                .iter()
                .filter_map(|f| match f {
                    Fragment::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }
}

impl From<&str> for ChatContent {
    fn from(s: &str) -> Self {
        ChatContent::Text(s.to_string())
    }
}

impl From<String> for ChatContent {
    fn from(s: String) -> Self {
        ChatContent::Text(s)
    }
}

/// A transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: ChatContent,
    #[serde(default)]
    pub created_at: i64,
}

impl ChatMessage {
    pub fn user(content: impl Into<ChatContent>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            created_at: crate::db::now_ms(),
        }
    }

    pub fn assistant(content: impl Into<ChatContent>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            created_at: crate::db::now_ms(),
        }
    }
}
