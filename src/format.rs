//! Output formatting for the task forest.

use crate::tree::{ForestStats, TodoNode, flatten};
use crate::types::Todo;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Render the forest in the requested format.
pub fn render_forest(forest: &[TodoNode], stats: &ForestStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Markdown => format_forest_markdown(forest, stats),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "stats": stats,
            "todos": forest,
        }))
        .unwrap_or_default(),
    }
}

/// Format the forest as a nested markdown checklist.
pub fn format_forest_markdown(forest: &[TodoNode], stats: &ForestStats) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({}/{} done)\n\n", stats.done, stats.total));

    if forest.is_empty() {
        md.push_str("_Nothing to do._\n");
    }
    for (depth, todo) in flatten(forest) {
        md.push_str(&"  ".repeat(depth));
        md.push_str(&format_todo_line(todo));
        md.push('\n');
    }

    if stats.orphaned > 0 {
        md.push_str(&format!(
            "\n_{} task(s) reference a missing parent._\n",
            stats.orphaned
        ));
    }

    md
}

/// One checklist line: checkbox, content, short id, deadline and image marker.
pub fn format_todo_line(todo: &Todo) -> String {
    let check = if todo.is_done { "[x]" } else { "[ ]" };

    let deadline = todo
        .deadline
        .map(|d| format!(" (due {})", d.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();

    let image = if todo.image_key.is_some() {
        " [image]"
    } else {
        ""
    };

    format!(
        "- {} {} `{}`{}{}",
        check,
        todo.content,
        short_id(&todo.id),
        deadline,
        image,
    )
}

/// Trailing characters of an id; UUIDv7 prefixes are timestamps and collide.
pub fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(8);
    id.get(start..).unwrap_or(id)
}
