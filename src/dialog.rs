//! Modal dialog state machine.
//!
//! At most one dialog is open at a time. Dialogs change only through
//! [`DialogEvent`]s; opening a dialog while another is pending is refused so a
//! pending action can never be overwritten or dropped.

use crate::ai::TaskPlan;
use crate::error::{AppError, AppResult};

/// A mutation waiting on a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Delete a todo and all its descendants.
    DeleteTodo { id: String },
    /// Create one root todo per suggestion.
    AddSuggestions { items: Vec<String> },
    /// Create a root todo for the plan with one subtask per item.
    AdoptPlan { plan: TaskPlan },
}

/// What a free-text prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPurpose {
    AddSubtask { parent_id: String },
    EditDeadline { id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogState {
    #[default]
    Idle,
    AlertPending {
        message: String,
    },
    ConfirmPending {
        message: String,
        action: PendingAction,
    },
    PromptPending {
        message: String,
        purpose: PromptPurpose,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    OpenAlert(String),
    OpenConfirm(String, PendingAction),
    OpenPrompt(String, PromptPurpose),
    /// OK / Yes. Prompts carry the entered text.
    Submit(Option<String>),
    Cancel,
}

/// What the caller should do after a dialog closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Dismissed,
    Confirmed(PendingAction),
    Prompted(PromptPurpose, String),
    Declined,
}

impl DialogState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogState::Idle)
    }

    /// Message shown by the open dialog.
    pub fn message(&self) -> Option<&str> {
        match self {
            DialogState::Idle => None,
            DialogState::AlertPending { message }
            | DialogState::ConfirmPending { message, .. }
            | DialogState::PromptPending { message, .. } => Some(message),
        }
    }

    /// Apply `event`, returning the next state and, when a dialog closes, its outcome.
    pub fn transition(self, event: DialogEvent) -> AppResult<(DialogState, Option<DialogOutcome>)> {
        use DialogEvent::*;

        match (self, event) {
            (DialogState::Idle, OpenAlert(message)) => {
                Ok((DialogState::AlertPending { message }, None))
            }
            (DialogState::Idle, OpenConfirm(message, action)) => {
                Ok((DialogState::ConfirmPending { message, action }, None))
            }
            (DialogState::Idle, OpenPrompt(message, purpose)) => {
                Ok((DialogState::PromptPending { message, purpose }, None))
            }
            (_, OpenAlert(_) | OpenConfirm(..) | OpenPrompt(..)) => Err(AppError::dialog_busy()),

            (DialogState::Idle, Submit(_) | Cancel) => Err(AppError::no_pending_dialog()),

            (DialogState::AlertPending { .. }, Submit(_) | Cancel) => {
                Ok((DialogState::Idle, Some(DialogOutcome::Dismissed)))
            }
            (DialogState::ConfirmPending { action, .. }, Submit(_)) => {
                Ok((DialogState::Idle, Some(DialogOutcome::Confirmed(action))))
            }
            (DialogState::PromptPending { purpose, .. }, Submit(text)) => {
                let text = text.unwrap_or_default();
                Ok((DialogState::Idle, Some(DialogOutcome::Prompted(purpose, text))))
            }
            (DialogState::ConfirmPending { .. } | DialogState::PromptPending { .. }, Cancel) => {
                Ok((DialogState::Idle, Some(DialogOutcome::Declined)))
            }
        }
    }
}
