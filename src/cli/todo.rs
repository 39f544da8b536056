//! Task subcommands: list, add, done, deadline, image, delete.

use crate::app::ImageUpload;
use crate::format::OutputFormat;
use crate::types::parse_deadline;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Output format: markdown (default) or json
    #[arg(short, long)]
    pub format: Option<String>,
}

impl ListArgs {
    pub fn output_format(&self, default: OutputFormat) -> Result<OutputFormat> {
        super::resolve_format(self.format.as_deref(), default)
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task description
    #[arg(required_unless_present = "parent")]
    pub content: Option<String>,

    /// Add as a subtask of this task id
    #[arg(short, long, value_name = "ID")]
    pub parent: Option<String>,

    /// Deadline (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "WHEN")]
    pub deadline: Option<String>,

    /// Image file to attach
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,
}

impl AddArgs {
    pub fn deadline(&self) -> Result<Option<DateTime<Utc>>> {
        parse_optional_deadline(self.deadline.as_deref())
    }
}

#[derive(Args, Debug)]
pub struct DoneArgs {
    /// Task id
    pub id: String,

    /// Mark as not done instead
    #[arg(long)]
    pub undo: bool,
}

#[derive(Args, Debug)]
pub struct DeadlineArgs {
    /// Task id
    pub id: String,

    /// New deadline (YYYY-MM-DD or RFC 3339)
    #[arg(conflicts_with = "clear")]
    pub when: Option<String>,

    /// Remove the deadline
    #[arg(long)]
    pub clear: bool,
}

impl DeadlineArgs {
    /// Neither a deadline nor `--clear` was given.
    pub fn needs_prompt(&self) -> bool {
        self.when.is_none() && !self.clear
    }

    pub fn deadline(&self) -> Result<Option<DateTime<Utc>>> {
        if self.clear {
            return Ok(None);
        }
        parse_optional_deadline(self.when.as_deref())
    }
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Task id
    pub id: String,

    /// Image file
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Task id
    pub id: String,

    /// Skip the confirmation question
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_optional_deadline(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match s {
        None => Ok(None),
        Some(s) => parse_deadline(s)
            .map(Some)
            .ok_or_else(|| anyhow!("invalid deadline '{}': use YYYY-MM-DD or RFC 3339", s)),
    }
}

/// Read an image file for upload.
pub fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(ImageUpload { filename, bytes })
}
