//! The task controller: what the UI calls for every user action.
//!
//! The controller validates input, checks sign-in, gates destructive and bulk
//! actions behind a confirmation dialog, issues mutations to the store and
//! reports every outcome through the [`Logger`]. It never mutates its own copy
//! of the data; the forest only changes when a new snapshot arrives.

use crate::ai::{ConversationSession, ConversationView, TaskPlan};
use crate::auth::{Action, AuthState};
use crate::dialog::{DialogEvent, DialogOutcome, DialogState, PendingAction, PromptPurpose};
use crate::error::{AppError, AppResult, ErrorCode};
use crate::logging::Logger;
use crate::storage::{ObjectStorage, image_key, public_path};
use crate::store::TodoStore;
use crate::subscriptions::SnapshotEvent;
use crate::suggest::SuggestionTracker;
use crate::tree::{OrphanPolicy, TodoNode, build_forest, descendants_post_order};
use crate::types::{NewTodo, Todo, TodoPatch, parse_deadline};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Controller settings taken from configuration.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub orphan_policy: OrphanPolicy,
    pub image_prefix: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            orphan_policy: OrphanPolicy::default(),
            image_prefix: crate::storage::DEFAULT_PUBLIC_PREFIX.to_string(),
        }
    }
}

/// An image picked by the user.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Outcome of deleting a todo together with its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub requested: String,
    /// Deleted todo ids, in the order the deletes were issued.
    pub deleted: Vec<String>,
    /// `(id, reason)` for deletes the store refused.
    pub failed: Vec<(String, String)>,
    /// Ancestors of a failed todo, left in place so nothing is orphaned.
    pub skipped: Vec<String>,
    /// `(image key, reason)` for images that could not be removed.
    pub image_failures: Vec<(String, String)>,
}

impl DeletionReport {
    /// Every todo and every image is gone.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && self.image_failures.is_empty()
    }
}

/// What a closed dialog led to.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogResult {
    Dismissed,
    Declined,
    Deleted(DeletionReport),
    Added(Vec<Todo>),
    Updated(Todo),
}

pub struct TodoApp {
    store: Arc<dyn TodoStore>,
    storage: Arc<dyn ObjectStorage>,
    auth: Arc<AuthState>,
    logger: Logger,
    settings: AppSettings,
    dialog: DialogState,
    snapshot: Vec<Todo>,
    forest: Vec<TodoNode>,
    suggestions: SuggestionTracker,
}

impl TodoApp {
    pub fn new(
        store: Arc<dyn TodoStore>,
        storage: Arc<dyn ObjectStorage>,
        auth: Arc<AuthState>,
        logger: Logger,
        settings: AppSettings,
    ) -> Self {
        Self {
            store,
            storage,
            auth,
            logger,
            settings,
            dialog: DialogState::Idle,
            snapshot: Vec::new(),
            forest: Vec::new(),
            suggestions: SuggestionTracker::default(),
        }
    }

    pub fn forest(&self) -> &[TodoNode] {
        &self.forest
    }

    pub fn snapshot(&self) -> &[Todo] {
        &self.snapshot
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Replace local state with a pushed snapshot. Returns `false` on a
    /// subscription error, after which no further snapshots arrive and an
    /// alert is opened if no other dialog is showing.
    pub fn apply_event(&mut self, event: SnapshotEvent) -> bool {
        match event {
            SnapshotEvent::Snapshot(todos) => {
                self.forest = build_forest(&todos, self.settings.orphan_policy);
                self.snapshot = todos;
                debug!(
                    todos = self.snapshot.len(),
                    roots = self.forest.len(),
                    "Rebuilt task forest"
                );
                true
            }
            SnapshotEvent::Error(reason) => {
                warn!(error = %reason, "Task subscription failed; list will stop updating");
                let alert = DialogEvent::OpenAlert(format!("Tasks stopped updating: {}", reason));
                if let Ok((next, _)) = self.dialog.clone().transition(alert) {
                    self.dialog = next;
                }
                false
            }
        }
    }

    /// Pull the current snapshot directly instead of waiting for a push.
    pub async fn refresh(&mut self) -> AppResult<()> {
        let todos = self
            .store
            .list()
            .await
            .map_err(|e| self.fail(AppError::store("Failed to load tasks", e)))?;
        self.apply_event(SnapshotEvent::Snapshot(todos));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a root todo, uploading its image first when one is given.
    pub async fn add_todo(
        &mut self,
        content: &str,
        deadline: Option<DateTime<Utc>>,
        image: Option<ImageUpload>,
    ) -> AppResult<Todo> {
        let content = self.validate_content(content, "Please enter a task")?;
        self.require(Action::AddTodo)?;

        let mut fields = NewTodo::new(content);
        fields.deadline = deadline;
        if let Some(image) = image {
            fields.image_key = Some(self.upload_image(image).await?);
        }

        // An uploaded image stays in storage if this create fails.
        let todo = self
            .store
            .create(fields)
            .await
            .map_err(|e| self.fail(AppError::store("Failed to add the task", e)))?;
        info!(todo_id = %todo.id, "Task added");
        self.logger.success("Task added");
        Ok(todo)
    }

    pub async fn add_subtask(&mut self, parent_id: &str, content: &str) -> AppResult<Todo> {
        let content = self.validate_content(content, "Please enter a subtask")?;
        self.require(Action::AddSubtask)?;
        let parent_id = &self.resolve(parent_id)?;

        let todo = self
            .store
            .create(NewTodo::new(content).with_parent(parent_id))
            .await
            .map_err(|e| self.fail(AppError::store("Failed to add the subtask", e)))?;
        info!(todo_id = %todo.id, parent_id = %parent_id, "Subtask added");
        self.logger.success("Subtask added");
        Ok(todo)
    }

    pub async fn set_done(&mut self, id: &str, is_done: bool) -> AppResult<Todo> {
        self.require(Action::UpdateTodo)?;
        let id = self.resolve(id)?;
        self.store
            .update(&id, TodoPatch::done(is_done))
            .await
            .map_err(|e| self.fail(AppError::store("Failed to update the task", e)))
    }

    /// Flip the completion flag based on the latest snapshot.
    pub async fn toggle_done(&mut self, id: &str) -> AppResult<Todo> {
        let id = self.resolve(id)?;
        let current = self
            .find(&id)
            .map(|t| t.is_done)
            .ok_or_else(|| self.fail(AppError::todo_not_found(&id)))?;
        self.set_done(&id, !current).await
    }

    pub async fn set_deadline(
        &mut self,
        id: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> AppResult<Todo> {
        self.require(Action::UpdateTodo)?;
        let id = self.resolve(id)?;
        self.store
            .update(&id, TodoPatch::deadline(deadline))
            .await
            .map_err(|e| self.fail(AppError::store("Failed to update the deadline", e)))
    }

    /// Upload a new image for a todo, replacing (and removing) any previous one.
    pub async fn attach_image(&mut self, id: &str, image: ImageUpload) -> AppResult<Todo> {
        self.require(Action::AttachImage)?;
        let id = self.resolve(id)?;
        let previous = self.find(&id).and_then(|t| t.image_key.clone());

        let key = self.upload_image(image).await?;
        let todo = self
            .store
            .update(&id, TodoPatch::image_key(Some(key)))
            .await
            .map_err(|e| self.fail(AppError::store("Failed to attach the image", e)))?;

        if let Some(old) = previous {
            if let Err(e) = self.remove_image(&old).await {
                warn!(todo_id = %id, image_key = %old, error = %e, "Failed to remove replaced image");
                self.logger
                    .error("Image attached, but the previous image could not be removed");
                return Ok(todo);
            }
        }
        self.logger.success("Image attached");
        Ok(todo)
    }

    /// Download URL for a todo's image, checked to exist.
    pub async fn image_url(&self, todo: &Todo) -> Option<String> {
        let key = todo.image_key.as_deref()?;
        let path = public_path(&self.settings.image_prefix, key);
        match self.storage.download_url(&path, true).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(todo_id = %todo.id, path = %path, error = %e, "Image unavailable");
                None
            }
        }
    }

    /// Delete a todo after all of its descendants, children first.
    ///
    /// Every delete is attempted individually. When one fails, its ancestors
    /// are skipped so the failure never leaves an orphaned subtree behind.
    pub async fn delete_with_descendants(&mut self, id: &str) -> AppResult<DeletionReport> {
        self.require(Action::DeleteTodo)?;

        let records = self
            .store
            .list()
            .await
            .map_err(|e| self.fail(AppError::store("Failed to delete the task", e)))?;
        let id = match resolve_id(&records, id) {
            Ok(Some(todo)) => todo.id.clone(),
            Ok(None) => return Err(self.fail(AppError::todo_not_found(id))),
            Err(e) => return Err(self.fail(e)),
        };
        let id = id.as_str();

        let by_id: HashMap<&str, &Todo> = records.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut order = descendants_post_order(&records, id);
        order.push(id.to_string());

        let mut report = DeletionReport {
            requested: id.to_string(),
            ..Default::default()
        };
        let mut blocked: HashSet<String> = HashSet::new();

        for todo_id in order {
            if blocked.contains(&todo_id) {
                report.skipped.push(todo_id);
                continue;
            }

            match self.store.delete(&todo_id).await {
                Ok(()) => {
                    let image = by_id.get(todo_id.as_str()).and_then(|t| t.image_key.clone());
                    if let Some(key) = image {
                        if let Err(e) = self.remove_image(&key).await {
                            warn!(todo_id = %todo_id, image_key = %key, error = %e, "Failed to remove image");
                            report.image_failures.push((key, e.to_string()));
                        }
                    }
                    report.deleted.push(todo_id);
                }
                Err(e) => {
                    warn!(todo_id = %todo_id, error = %e, "Failed to delete task");
                    blocked.extend(ancestors(&by_id, &todo_id, id));
                    report.failed.push((todo_id, e.to_string()));
                }
            }
        }

        let kept = report.failed.len() + report.skipped.len();
        if kept > 0 {
            self.logger.error(&format!(
                "Could not delete {} of {} tasks",
                kept,
                kept + report.deleted.len()
            ));
        } else if !report.image_failures.is_empty() {
            self.logger.error(&format!(
                "Task deleted, but {} image(s) could not be removed",
                report.image_failures.len()
            ));
        } else {
            info!(todo_id = %id, deleted = report.deleted.len(), "Task deleted");
            self.logger.success("Task deleted");
        }
        Ok(report)
    }

    /// Create one root todo per suggestion. Each create stands alone; failures
    /// are logged and the rest still go ahead.
    pub async fn add_suggestions(&mut self, items: &[String]) -> AppResult<Vec<Todo>> {
        self.require(Action::AddSuggestions)?;

        let mut created = Vec::new();
        let mut failures = 0usize;
        for item in items {
            match self.store.create(NewTodo::new(item.clone())).await {
                Ok(todo) => created.push(todo),
                Err(e) => {
                    warn!(content = %item, error = %e, "Failed to add suggested task");
                    failures += 1;
                }
            }
        }

        if failures == 0 {
            self.logger
                .success(&format!("Added {} suggested tasks", created.len()));
        } else {
            self.logger.error(&format!(
                "Failed to add {} of {} suggested tasks",
                failures,
                items.len()
            ));
        }
        Ok(created)
    }

    /// Create a root todo named after the plan with its items as subtasks.
    pub async fn adopt_plan(&mut self, plan: &TaskPlan) -> AppResult<Vec<Todo>> {
        self.require(Action::AddSuggestions)?;

        let root = self
            .store
            .create(NewTodo::new(plan.name.trim()))
            .await
            .map_err(|e| self.fail(AppError::store("Failed to add the plan", e)))?;

        let items = plan.subtasks();
        let mut created = vec![root];
        let mut failures = 0usize;
        for item in &items {
            match self
                .store
                .create(NewTodo::new(item.clone()).with_parent(&created[0].id))
                .await
            {
                Ok(todo) => created.push(todo),
                Err(e) => {
                    warn!(content = %item, error = %e, "Failed to add plan item");
                    failures += 1;
                }
            }
        }

        if failures == 0 {
            self.logger.success(&format!(
                "Added \"{}\" with {} subtasks",
                created[0].content,
                created.len() - 1
            ));
        } else {
            self.logger.error(&format!(
                "Added \"{}\", but {} of {} subtasks failed",
                created[0].content,
                failures,
                items.len()
            ));
        }
        Ok(created)
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    fn open(&mut self, event: DialogEvent) -> AppResult<()> {
        let (next, _) = self
            .dialog
            .clone()
            .transition(event)
            .map_err(|e| self.fail(e))?;
        self.dialog = next;
        Ok(())
    }

    /// Ask for confirmation before deleting `id` and its subtasks.
    pub fn request_delete(&mut self, id: &str) -> AppResult<()> {
        self.require(Action::DeleteTodo)?;
        let todo = resolve_id(&self.snapshot, id)
            .map_err(|e| self.fail(e))?
            .cloned()
            .ok_or_else(|| self.fail(AppError::todo_not_found(id)))?;
        let subtasks = descendants_post_order(&self.snapshot, &todo.id).len();
        let message = if subtasks == 0 {
            format!("Delete \"{}\"?", todo.content)
        } else {
            format!("Delete \"{}\" and its {} subtasks?", todo.content, subtasks)
        };
        self.open(DialogEvent::OpenConfirm(
            message,
            PendingAction::DeleteTodo { id: todo.id },
        ))
    }

    /// Ask whether to add AI suggestions as tasks. Empty lists open nothing.
    pub fn stage_suggestions(&mut self, items: Vec<String>) -> AppResult<bool> {
        if items.is_empty() {
            return Ok(false);
        }
        self.require(Action::AddSuggestions)?;
        let message = format!(
            "Add {} suggested tasks?\n{}",
            items.len(),
            items
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        );
        self.open(DialogEvent::OpenConfirm(
            message,
            PendingAction::AddSuggestions { items },
        ))?;
        Ok(true)
    }

    pub fn stage_plan(&mut self, plan: TaskPlan) -> AppResult<()> {
        self.require(Action::AddSuggestions)?;
        let message = format!(
            "Add \"{}\" with {} subtasks?",
            plan.name,
            plan.subtasks().len()
        );
        self.open(DialogEvent::OpenConfirm(message, PendingAction::AdoptPlan { plan }))
    }

    pub fn request_subtask(&mut self, parent_id: &str) -> AppResult<()> {
        self.require(Action::AddSubtask)?;
        let parent_id = self.resolve(parent_id)?;
        self.open(DialogEvent::OpenPrompt(
            "Subtask".to_string(),
            PromptPurpose::AddSubtask { parent_id },
        ))
    }

    pub fn request_deadline(&mut self, id: &str) -> AppResult<()> {
        self.require(Action::UpdateTodo)?;
        let id = self.resolve(id)?;
        self.open(DialogEvent::OpenPrompt(
            "Deadline (YYYY-MM-DD or RFC 3339, empty to clear)".to_string(),
            PromptPurpose::EditDeadline { id },
        ))
    }

    /// Feed a conversation update; a completed assistant turn with list items
    /// opens the bulk-add confirmation.
    pub fn on_conversation(&mut self, view: &ConversationView) -> AppResult<bool> {
        match self.suggestions.observe(view) {
            Some(items) => self.stage_suggestions(items),
            None => Ok(false),
        }
    }

    /// Send a message as the signed-in user, then check the answer for
    /// suggestions. Returns whether a confirmation was opened.
    pub async fn chat(&mut self, session: &ConversationSession, text: &str) -> AppResult<bool> {
        let identity = self.require(Action::Chat)?;
        if session.owner() != &identity {
            return Err(self.fail(AppError::invalid_value(
                "conversation",
                "This conversation belongs to another user",
            )));
        }
        let text = self.validate_content(text, "Please enter a message")?;

        if let Err(e) = session.send(&text).await {
            return Err(self.fail(
                AppError::new(ErrorCode::AiError, "The assistant did not answer")
                    .with_details(e.to_string()),
            ));
        }
        info!(conversation = %session.id(), "Chat turn completed");
        self.on_conversation(&session.view())
    }

    /// Answer the open dialog with OK/Yes (and the prompt text, if any).
    pub async fn submit_dialog(&mut self, input: Option<String>) -> AppResult<DialogResult> {
        let outcome = self.close(DialogEvent::Submit(input))?;
        match outcome {
            DialogOutcome::Dismissed => Ok(DialogResult::Dismissed),
            DialogOutcome::Declined => Ok(DialogResult::Declined),
            DialogOutcome::Confirmed(action) => match action {
                PendingAction::DeleteTodo { id } => self
                    .delete_with_descendants(&id)
                    .await
                    .map(DialogResult::Deleted),
                PendingAction::AddSuggestions { items } => {
                    self.add_suggestions(&items).await.map(DialogResult::Added)
                }
                PendingAction::AdoptPlan { plan } => {
                    self.adopt_plan(&plan).await.map(DialogResult::Added)
                }
            },
            DialogOutcome::Prompted(purpose, text) => match purpose {
                PromptPurpose::AddSubtask { parent_id } => self
                    .add_subtask(&parent_id, &text)
                    .await
                    .map(|t| DialogResult::Added(vec![t])),
                PromptPurpose::EditDeadline { id } => {
                    let deadline = if text.trim().is_empty() {
                        None
                    } else {
                        Some(parse_deadline(&text).ok_or_else(|| {
                            self.fail(AppError::invalid_value(
                                "deadline",
                                "Deadline must be YYYY-MM-DD or RFC 3339",
                            ))
                        })?)
                    };
                    self.set_deadline(&id, deadline)
                        .await
                        .map(DialogResult::Updated)
                }
            },
        }
    }

    /// Close the open dialog without doing anything.
    pub fn cancel_dialog(&mut self) -> AppResult<DialogResult> {
        match self.close(DialogEvent::Cancel)? {
            DialogOutcome::Dismissed => Ok(DialogResult::Dismissed),
            _ => {
                debug!("Dialog declined");
                Ok(DialogResult::Declined)
            }
        }
    }

    fn close(&mut self, event: DialogEvent) -> AppResult<DialogOutcome> {
        let (next, outcome) = self
            .dialog
            .clone()
            .transition(event)
            .map_err(|e| self.fail(e))?;
        self.dialog = next;
        outcome.ok_or_else(|| AppError::internal("dialog closed without an outcome"))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn find(&self, id: &str) -> Option<&Todo> {
        self.snapshot.iter().find(|t| t.id == id)
    }

    /// Full id for `id`, which may be a short id from a listing. Ids not in
    /// the snapshot pass through unchanged for the store to judge.
    fn resolve(&self, id: &str) -> AppResult<String> {
        match resolve_id(&self.snapshot, id) {
            Ok(found) => Ok(found.map_or_else(|| id.to_string(), |t| t.id.clone())),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, err: AppError) -> AppError {
        self.logger.report(&err);
        err
    }

    fn require(&self, action: Action) -> AppResult<crate::types::Identity> {
        self.auth.require(action).map_err(|e| {
            self.logger.warning(&e.message);
            e
        })
    }

    fn validate_content(&self, content: &str, notice: &str) -> AppResult<String> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            self.logger.warning(notice);
            return Err(AppError::missing_field("content"));
        }
        Ok(trimmed.to_string())
    }

    async fn upload_image(&self, image: ImageUpload) -> AppResult<String> {
        let key = image_key(&image.filename, crate::db::now_ms());
        let path = public_path(&self.settings.image_prefix, &key);
        self.storage
            .upload(&path, image.bytes)
            .await
            .map_err(|e| self.fail(AppError::storage("Failed to upload the image", e)))?;
        debug!(path = %path, "Image uploaded");
        Ok(key)
    }

    async fn remove_image(&self, key: &str) -> Result<(), crate::storage::StorageError> {
        let path = public_path(&self.settings.image_prefix, key);
        self.storage.remove(&path).await
    }
}

/// Exact id match, else the one todo whose id ends with `id`.
fn resolve_id<'a>(records: &'a [Todo], id: &str) -> AppResult<Option<&'a Todo>> {
    if let Some(todo) = records.iter().find(|t| t.id == id) {
        return Ok(Some(todo));
    }
    if id.is_empty() {
        return Ok(None);
    }
    let mut matches = records.iter().filter(|t| t.id.ends_with(id));
    match (matches.next(), matches.next()) {
        (Some(todo), None) => Ok(Some(todo)),
        (Some(_), Some(_)) => Err(AppError::invalid_value(
            "id",
            &format!("\"{}\" matches more than one task", id),
        )),
        _ => Ok(None),
    }
}

/// Ids from `id`'s parent up to and including `stop`.
fn ancestors(by_id: &HashMap<&str, &Todo>, id: &str, stop: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = id;
    while current != stop {
        let Some(parent) = by_id
            .get(current)
            .and_then(|t| t.parent_todo_id.as_deref())
        else {
            break;
        };
        if out.iter().any(|seen: &String| seen == parent) {
            break;
        }
        out.push(parent.to_string());
        current = parent;
    }
    out
}
