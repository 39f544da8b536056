//! Task store interface and its SQLite-backed implementation.

use crate::db::Database;
use crate::subscriptions::{SnapshotEvent, SnapshotHub, Subscription};
use crate::types::{Identity, NewTodo, Todo, TodoPatch};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Owner-scoped access to todo records.
///
/// A store instance is bound to one identity and never exposes another
/// identity's rows. Every successful mutation is followed by a full snapshot
/// pushed to the owner's subscribers.
#[async_trait]
pub trait TodoStore: Send + Sync {
    fn owner(&self) -> &Identity;

    async fn list(&self) -> Result<Vec<Todo>>;

    async fn create(&self, fields: NewTodo) -> Result<Todo>;

    async fn update(&self, id: &str, patch: TodoPatch) -> Result<Todo>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Open a live query. The current snapshot is queued immediately.
    async fn observe(&self) -> Subscription;
}

/// [`TodoStore`] over the local SQLite database.
pub struct SqliteStore {
    db: Database,
    hub: Arc<SnapshotHub>,
    owner: Identity,
    last_published: Mutex<Option<Vec<Todo>>>,
}

impl SqliteStore {
    pub fn new(db: Database, hub: Arc<SnapshotHub>, owner: Identity) -> Self {
        Self {
            db,
            hub,
            owner,
            last_published: Mutex::new(None),
        }
    }

    pub fn hub(&self) -> &Arc<SnapshotHub> {
        &self.hub
    }

    fn current_event(&self) -> SnapshotEvent {
        match self.db.list_todos(self.owner.as_str()) {
            Ok(todos) => SnapshotEvent::Snapshot(todos),
            Err(e) => {
                warn!(owner = %self.owner, error = %e, "Todo live query failed");
                SnapshotEvent::Error(e.to_string())
            }
        }
    }

    fn remember(&self, event: &SnapshotEvent) {
        if let SnapshotEvent::Snapshot(todos) = event {
            let mut last = self.last_published.lock().unwrap_or_else(|e| e.into_inner());
            *last = Some(todos.clone());
        }
    }

    fn publish_snapshot(&self) {
        if !self.hub.has_subscribers(self.owner.as_str()) {
            return;
        }
        let event = self.current_event();
        self.remember(&event);
        let delivered = self.hub.publish(self.owner.as_str(), event);
        debug!(owner = %self.owner, delivered, "Published todo snapshot");
    }

    /// Publish a snapshot if the rows changed since the last one published,
    /// e.g. because another process wrote to the same database.
    pub fn poll_changes(&self) -> Result<bool> {
        let todos = self.db.list_todos(self.owner.as_str())?;
        let changed = {
            let last = self.last_published.lock().unwrap_or_else(|e| e.into_inner());
            last.as_ref() != Some(&todos)
        };
        if changed {
            let event = SnapshotEvent::Snapshot(todos);
            self.remember(&event);
            self.hub.publish(self.owner.as_str(), event);
        }
        Ok(changed)
    }
}

#[async_trait]
impl TodoStore for SqliteStore {
    fn owner(&self) -> &Identity {
        &self.owner
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        self.db.list_todos(self.owner.as_str())
    }

    async fn create(&self, fields: NewTodo) -> Result<Todo> {
        let todo = self.db.create_todo(self.owner.as_str(), &fields)?;
        debug!(todo_id = %todo.id, parent_id = ?todo.parent_todo_id, "Created todo");
        self.publish_snapshot();
        Ok(todo)
    }

    async fn update(&self, id: &str, patch: TodoPatch) -> Result<Todo> {
        let todo = self.db.update_todo(self.owner.as_str(), id, &patch)?;
        debug!(todo_id = %id, "Updated todo");
        self.publish_snapshot();
        Ok(todo)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.db.delete_todo(self.owner.as_str(), id)?;
        debug!(todo_id = %id, "Deleted todo");
        self.publish_snapshot();
        Ok(())
    }

    async fn observe(&self) -> Subscription {
        let subscription = self.hub.subscribe(self.owner.as_str());
        let event = self.current_event();
        self.remember(&event);
        self.hub.send_to(subscription.id(), event);
        subscription
    }
}
