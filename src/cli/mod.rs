//! CLI command definitions for tasknest
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod assist;
pub mod todo;
pub mod watch;

use anyhow::{Result, anyhow};
use assist::{PlanArgs, SuggestArgs};
use clap::{Parser, Subcommand};
use crate::format::OutputFormat;
use std::io::{BufRead, Write};
use todo::{AddArgs, DeadlineArgs, DeleteArgs, DoneArgs, ImageArgs, ListArgs};
use watch::WatchArgs;

/// Personal task manager with nested subtasks and AI suggestions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Path to image storage directory (overrides config)
    #[arg(short, long, global = true)]
    pub storage_dir: Option<String>,

    /// Identity to act as (overrides config)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off (default), 1/stdout, 2/stderr, or filename
    #[arg(long, default_value = "0", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the task tree (default if no subcommand given)
    List(ListArgs),

    /// Add a task or subtask (asks for the subtask text when not given)
    Add(AddArgs),

    /// Mark a task as done (or not done with --undo)
    Done(DoneArgs),

    /// Set or clear a task's deadline (asks for it when not given)
    Deadline(DeadlineArgs),

    /// Attach an image to a task
    Image(ImageArgs),

    /// Delete a task and all of its subtasks
    Delete(DeleteArgs),

    /// Extract task suggestions from the last assistant message of a transcript
    Suggest(SuggestArgs),

    /// Parse structured generation output into a task with subtasks
    Plan(PlanArgs),

    /// Print the task tree every time it changes
    Watch(WatchArgs),
}

/// Ask a yes/no question on stdin. `assume_yes` answers without asking.
pub fn confirm(message: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    eprint!("{} [y/N] ", message);
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Read one line of free text on stdin. `None` when stdin is closed.
pub fn prompt(message: &str) -> Option<String> {
    eprint!("{}: ", message);
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(answer.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// Resolve a `--format` flag, falling back to the configured default.
pub fn resolve_format(flag: Option<&str>, default: OutputFormat) -> Result<OutputFormat> {
    match flag {
        None => Ok(default),
        Some(s) => OutputFormat::from_str(s).ok_or_else(|| anyhow!("unknown format: {}", s)),
    }
}
