//! AI-assisted subcommands: suggest and plan.

use crate::ai::{ChatMessage, ConversationView, TaskPlan};
use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Transcript file: a JSON array of chat messages
    #[arg(value_name = "FILE")]
    pub transcript: PathBuf,

    /// Offer to add the suggestions as tasks
    #[arg(short, long)]
    pub add: bool,

    /// Skip the confirmation question
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// File holding the raw generation output
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// The request the output answers
    #[arg(short, long, default_value = "Break this down into tasks")]
    pub request: String,

    /// Offer to add the plan as a task with subtasks
    #[arg(short, long)]
    pub adopt: bool,

    /// Skip the confirmation question
    #[arg(short, long)]
    pub yes: bool,
}

/// Load a transcript as a settled conversation (no response in flight).
pub fn load_transcript(path: &Path) -> Result<ConversationView> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))?;
    let messages: Vec<ChatMessage> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of chat messages", path.display()))?;
    Ok(ConversationView {
        messages,
        is_loading: false,
    })
}

/// Read raw generation output for replay.
pub fn read_output(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Human-readable plan summary.
pub fn describe_plan(plan: &TaskPlan) -> String {
    let mut out = format!("# {}\n\n", plan.name.trim());
    for item in plan.subtasks() {
        out.push_str(&format!("- {}\n", item));
    }
    if !plan.instructions.trim().is_empty() {
        out.push('\n');
        out.push_str(plan.instructions.trim());
        out.push('\n');
    }
    out
}
