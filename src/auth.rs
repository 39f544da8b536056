//! Authentication state as seen by the controller.

use crate::error::{AppError, AppResult};
use crate::types::Identity;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    SignedOut,
    SignedIn(Identity),
}

/// User actions that require a signed-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddTodo,
    AddSubtask,
    UpdateTodo,
    DeleteTodo,
    AttachImage,
    AddSuggestions,
    Chat,
    Generate,
}

impl Action {
    /// Completes the sentence "Sign in to ...".
    pub fn description(&self) -> &'static str {
        match self {
            Action::AddTodo => "add tasks",
            Action::AddSubtask => "add subtasks",
            Action::UpdateTodo => "edit tasks",
            Action::DeleteTodo => "delete tasks",
            Action::AttachImage => "attach images",
            Action::AddSuggestions => "add suggested tasks",
            Action::Chat => "chat with the assistant",
            Action::Generate => "generate tasks",
        }
    }
}

/// Current sign-in status, observable through a watch channel.
pub struct AuthState {
    tx: watch::Sender<AuthStatus>,
}

impl AuthState {
    pub fn new(initial: AuthStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self::new(AuthStatus::SignedIn(identity))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthStatus::SignedOut)
    }

    pub fn current(&self) -> AuthStatus {
        self.tx.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        match &*self.tx.borrow() {
            AuthStatus::SignedIn(id) => Some(id.clone()),
            AuthStatus::SignedOut => None,
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        info!(identity = %identity, "Signed in");
        self.tx.send_replace(AuthStatus::SignedIn(identity));
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        self.tx.send_replace(AuthStatus::SignedOut);
    }

    pub fn watch(&self) -> watch::Receiver<AuthStatus> {
        self.tx.subscribe()
    }

    /// The signed-in identity, or an error naming the refused action.
    pub fn require(&self, action: Action) -> AppResult<Identity> {
        self.identity()
            .ok_or_else(|| AppError::not_signed_in(action.description()))
    }
}
