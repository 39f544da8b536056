//! Structured error types surfaced by the controller.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Authentication
    NotSignedIn,

    // Not found errors
    TodoNotFound,

    // UI state
    DialogBusy,
    NoPendingDialog,

    // Backend errors
    StoreError,
    StorageError,
    AiError,
    InternalError,
}

/// Structured error returned from controller operations.
#[derive(Debug, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn not_signed_in(action: &str) -> Self {
        Self::new(ErrorCode::NotSignedIn, format!("Sign in to {}", action))
    }

    pub fn todo_not_found(todo_id: &str) -> Self {
        Self::new(
            ErrorCode::TodoNotFound,
            format!("Todo not found: {}", todo_id),
        )
    }

    pub fn dialog_busy() -> Self {
        Self::new(
            ErrorCode::DialogBusy,
            "Another dialog is waiting for an answer",
        )
    }

    pub fn no_pending_dialog() -> Self {
        Self::new(ErrorCode::NoPendingDialog, "No dialog is open")
    }

    /// A store call failed. The user sees `message`; the cause goes to `details`.
    pub fn store(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StoreError, message).with_details(err.to_string())
    }

    pub fn storage(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StorageError, message).with_details(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => AppError::internal(err),
        }
    }
}

/// Result type for controller operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
