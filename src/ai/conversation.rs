//! Stateful chat session keyed by a fixed conversation id.

use super::{ChatContent, ChatMessage};
use crate::types::Identity;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Something that can answer a conversation turn.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn respond(&self, system_prompt: &str, transcript: &[ChatMessage])
    -> Result<ChatContent>;
}

/// Snapshot of a conversation as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationView {
    pub messages: Vec<ChatMessage>,
    /// True while a response is awaited.
    pub is_loading: bool,
}

impl ConversationView {
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// An owner-scoped conversation with an append-only transcript.
///
/// State changes are published on a `watch` channel so consumers always see
/// the latest transcript and in-flight flag without polling.
pub struct ConversationSession {
    id: String,
    owner: Identity,
    system_prompt: String,
    model: Arc<dyn ChatModel>,
    state: watch::Sender<ConversationView>,
}

impl ConversationSession {
    pub fn new(
        id: impl Into<String>,
        owner: Identity,
        system_prompt: impl Into<String>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let (state, _) = watch::channel(ConversationView::default());
        Self {
            id: id.into(),
            owner,
            system_prompt: system_prompt.into(),
            model,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Current transcript and loading flag.
    pub fn view(&self) -> ConversationView {
        self.state.borrow().clone()
    }

    /// Subscribe to transcript updates.
    pub fn watch(&self) -> watch::Receiver<ConversationView> {
        self.state.subscribe()
    }

    /// Append a user message and wait for the assistant's answer.
    ///
    /// Only one turn may be in flight at a time.
    pub async fn send(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            bail!("message is empty");
        }
        let started = self.state.send_if_modified(|view| {
            if view.is_loading {
                return false;
            }
            view.messages.push(ChatMessage::user(text));
            view.is_loading = true;
            true
        });
        if !started {
            bail!("conversation {} is awaiting a response", self.id);
        }
        debug!(conversation = %self.id, owner = %self.owner, "Sent message");

        let transcript = self.state.borrow().messages.clone();
        match self.model.respond(&self.system_prompt, &transcript).await {
            Ok(content) => {
                self.state.send_modify(|view| {
                    view.messages.push(ChatMessage::assistant(content));
                    view.is_loading = false;
                });
                info!(conversation = %self.id, "Assistant response received");
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|view| view.is_loading = false);
                warn!(conversation = %self.id, error = %e, "Assistant response failed");
                Err(e)
            }
        }
    }
}

/// A model that replays canned answers in order.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
        }
    }

    /// Queue a failure for the next turn.
    pub fn push_failure(&self, reason: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(reason.into()));
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn respond(
        &self,
        _system_prompt: &str,
        _transcript: &[ChatMessage],
    ) -> Result<ChatContent> {
        let next = self
            .replies
            .lock()
            .map_err(|_| anyhow!("scripted model lock poisoned"))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(ChatContent::Text(text)),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}
