//! Logging and user-visible notices.
//!
//! [`Logger`] writes every message to tracing and, when a sink is attached,
//! forwards it as a [`Notice`] to whatever renders notifications for the user.
//! [`init_tracing`] installs the process-wide subscriber.

use anyhow::Result;
use serde::Serialize;
use std::fs::OpenOptions;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::error::AppError;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Debug = 0,
    Info = 1,
    Success = 2,
    Warning = 3,
    Error = 4,
}

impl NoticeLevel {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => NoticeLevel::Debug,
            1 => NoticeLevel::Info,
            2 => NoticeLevel::Success,
            3 => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }
}

/// Convert a notice level to the tracing level it is logged at.
pub fn notice_level_to_tracing(level: NoticeLevel) -> Level {
    match level {
        NoticeLevel::Debug => Level::DEBUG,
        NoticeLevel::Info | NoticeLevel::Success => Level::INFO,
        NoticeLevel::Warning => Level::WARN,
        NoticeLevel::Error => Level::ERROR,
    }
}

/// A message meant for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Atomic minimum level for notices forwarded to the sink.
pub struct LevelFilter(AtomicU8);

impl LevelFilter {
    pub fn new(level: NoticeLevel) -> Self {
        Self(AtomicU8::new(level as u8))
    }

    pub fn get(&self) -> NoticeLevel {
        NoticeLevel::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: NoticeLevel) {
        self.0.store(level as u8, Ordering::Relaxed);
    }

    pub fn should_notify(&self, level: NoticeLevel) -> bool {
        level as u8 >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(NoticeLevel::Info)
    }
}

/// Logger with tracing output plus an optional notice sink.
#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<UnboundedSender<Notice>>,
    level_filter: Arc<LevelFilter>,
    name: Option<String>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward notices to `sink`.
    pub fn with_sink(mut self, sink: UnboundedSender<Notice>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_level_filter(mut self, filter: Arc<LevelFilter>) -> Self {
        self.level_filter = filter;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Log `message` and forward it to the sink if the filter allows.
    pub fn log(&self, level: NoticeLevel, message: &str) {
        let name = self.name.as_deref().unwrap_or("app");
        match notice_level_to_tracing(level) {
            Level::ERROR => tracing::error!(logger = %name, "{}", message),
            Level::WARN => tracing::warn!(logger = %name, "{}", message),
            Level::INFO => tracing::info!(logger = %name, "{}", message),
            _ => tracing::debug!(logger = %name, "{}", message),
        }

        if !self.level_filter.should_notify(level) {
            return;
        }
        if let Some(ref sink) = self.sink {
            // A closed sink means the UI is gone; the tracing line above is enough.
            let _ = sink.send(Notice {
                level,
                message: message.to_string(),
            });
        }
    }

    pub fn debug(&self, msg: &str) {
        self.log(NoticeLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(NoticeLevel::Info, msg);
    }

    pub fn success(&self, msg: &str) {
        self.log(NoticeLevel::Success, msg);
    }

    pub fn warning(&self, msg: &str) {
        self.log(NoticeLevel::Warning, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(NoticeLevel::Error, msg);
    }

    /// Report a failed operation: the cause is logged, the user sees only the message.
    pub fn report(&self, err: &AppError) {
        if let Some(ref details) = err.details {
            tracing::warn!(code = ?err.code, details = %details, "{}", err.message);
        }
        self.error(&err.message);
    }
}

/// Install the global tracing subscriber.
///
/// `target` is `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a file path opened in
/// append mode.
pub fn init_tracing(target: &str, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    match target {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
