//! Core types for the task manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signed-in identity. Every todo row and conversation is scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A task record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub owner: String,
    pub content: String,
    pub is_done: bool,
    pub deadline: Option<DateTime<Utc>>,
    /// Absent means this is a root task.
    pub parent_todo_id: Option<String>,
    /// Unprefixed object name in image storage.
    pub image_key: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for creating a todo. `id`, `owner` and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTodo {
    pub content: String,
    #[serde(default)]
    pub is_done: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub parent_todo_id: Option<String>,
    pub image_key: Option<String>,
}

impl NewTodo {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_todo_id = Some(parent_id.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_image_key(mut self, key: impl Into<String>) -> Self {
        self.image_key = Some(key.into());
        self
    }
}

/// Partial update. Outer `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub content: Option<String>,
    pub is_done: Option<bool>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub parent_todo_id: Option<Option<String>>,
    pub image_key: Option<Option<String>>,
}

impl TodoPatch {
    pub fn done(is_done: bool) -> Self {
        Self {
            is_done: Some(is_done),
            ..Default::default()
        }
    }

    pub fn deadline(deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            deadline: Some(deadline),
            ..Default::default()
        }
    }

    pub fn image_key(key: Option<String>) -> Self {
        Self {
            image_key: Some(key),
            ..Default::default()
        }
    }
}

/// Parse a deadline given on the command line or in a prompt.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_deadline(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
