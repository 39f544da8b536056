//! Integration tests for the task controller.
//!
//! Most tests run against `RecordingStore`, which keeps todos in memory,
//! records the order of deletes and can be told to refuse specific ones.
//! The rest use the SQLite store and local image storage end to end.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tasknest::ai::{
    ConversationSession, ConversationView, DEFAULT_CONVERSATION_ID, ScriptedModel, TaskPlan,
};
use tasknest::app::{AppSettings, DialogResult, ImageUpload, TodoApp};
use tasknest::auth::AuthState;
use tasknest::db::Database;
use tasknest::error::ErrorCode;
use tasknest::format::{format_forest_markdown, short_id};
use tasknest::logging::{Logger, Notice, NoticeLevel};
use tasknest::storage::{LocalObjectStorage, ObjectStorage, StorageError};
use tasknest::store::{SqliteStore, TodoStore};
use tasknest::subscriptions::{SnapshotEvent, SnapshotHub, Subscription};
use tasknest::tree::ForestStats;
use tasknest::types::{Identity, NewTodo, Todo, TodoPatch};
use tempfile::TempDir;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

/// In-memory store that records deletes and fails on request.
struct RecordingStore {
    owner: Identity,
    hub: Arc<SnapshotHub>,
    todos: Mutex<Vec<Todo>>,
    deletes: Mutex<Vec<String>>,
    refuse_delete: Mutex<HashSet<String>>,
    refuse_create: Mutex<HashSet<String>>,
    next_id: AtomicI64,
}

impl RecordingStore {
    fn new(owner: &str) -> Arc<Self> {
        Arc::new(Self {
            owner: Identity::new(owner),
            hub: SnapshotHub::new(),
            todos: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            refuse_delete: Mutex::new(HashSet::new()),
            refuse_create: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(1),
        })
    }

    fn refuse_delete(&self, id: &str) {
        self.refuse_delete.lock().unwrap().insert(id.to_string());
    }

    fn refuse_create(&self, content: &str) {
        self.refuse_create.lock().unwrap().insert(content.to_string());
    }

    fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    fn contents(&self) -> Vec<String> {
        self.todos
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.content.clone())
            .collect()
    }
}

#[async_trait]
impl TodoStore for RecordingStore {
    fn owner(&self) -> &Identity {
        &self.owner
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        Ok(self.todos.lock().unwrap().clone())
    }

    async fn create(&self, fields: NewTodo) -> Result<Todo> {
        if self.refuse_create.lock().unwrap().contains(&fields.content) {
            bail!("create refused");
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut todos = self.todos.lock().unwrap();
        let todo = Todo {
            id: format!("t{}", n),
            owner: self.owner.to_string(),
            content: fields.content,
            is_done: fields.is_done,
            deadline: fields.deadline,
            parent_todo_id: fields.parent_todo_id,
            image_key: fields.image_key,
            created_at: n,
            updated_at: n,
        };
        todos.push(todo.clone());
        Ok(todo)
    }

    async fn update(&self, id: &str, patch: TodoPatch) -> Result<Todo> {
        let mut todos = self.todos.lock().unwrap();
        let Some(todo) = todos.iter_mut().find(|t| t.id == id) else {
            bail!("no such todo");
        };
        if let Some(is_done) = patch.is_done {
            todo.is_done = is_done;
        }
        if let Some(deadline) = patch.deadline {
            todo.deadline = deadline;
        }
        if let Some(image_key) = patch.image_key {
            todo.image_key = image_key;
        }
        Ok(todo.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.refuse_delete.lock().unwrap().contains(id) {
            bail!("permission denied");
        }
        self.deletes.lock().unwrap().push(id.to_string());
        self.todos.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn observe(&self) -> Subscription {
        self.hub.subscribe(self.owner.as_str())
    }
}

/// Storage that accepts everything and keeps nothing.
struct NullStorage;

#[async_trait]
impl ObjectStorage for NullStorage {
    async fn upload(&self, _path: &str, _bytes: Vec<u8>) -> Result<(), StorageError> {
        Ok(())
    }

    async fn download_url(&self, path: &str, _validate: bool) -> Result<String, StorageError> {
        Ok(format!("mem://{}", path))
    }

    async fn remove(&self, _path: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Storage that stores uploads but refuses to remove anything.
struct StickyStorage;

#[async_trait]
impl ObjectStorage for StickyStorage {
    async fn upload(&self, _path: &str, _bytes: Vec<u8>) -> Result<(), StorageError> {
        Ok(())
    }

    async fn download_url(&self, path: &str, _validate: bool) -> Result<String, StorageError> {
        Ok(format!("mem://{}", path))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

struct Harness {
    app: TodoApp,
    store: Arc<RecordingStore>,
    notices: UnboundedReceiver<Notice>,
}

impl Harness {
    fn notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }
}

fn setup_app(auth: AuthState) -> Harness {
    setup_app_with_storage(auth, Arc::new(NullStorage))
}

fn setup_app_with_storage(auth: AuthState, storage: Arc<dyn ObjectStorage>) -> Harness {
    let store = RecordingStore::new("alice");
    let (tx, notices) = unbounded_channel();
    let app = TodoApp::new(
        store.clone(),
        storage,
        Arc::new(auth),
        Logger::new().with_sink(tx),
        AppSettings::default(),
    );
    Harness {
        app,
        store,
        notices,
    }
}

fn image(name: &str) -> ImageUpload {
    ImageUpload {
        filename: name.into(),
        bytes: b"img".to_vec(),
    }
}

fn signed_in() -> AuthState {
    AuthState::signed_in(Identity::new("alice"))
}

/// Root `t1` with children `t2` and `t3`.
async fn seed_family(h: &mut Harness) {
    let root = h.app.add_todo("Trip", None, None).await.unwrap();
    h.app.add_subtask(&root.id, "Tickets").await.unwrap();
    h.app.add_subtask(&root.id, "Hotel").await.unwrap();
    h.app.refresh().await.unwrap();
    h.notices();
}

mod deletion_tests {
    use super::*;

    #[tokio::test]
    async fn delete_removes_children_before_parent() {
        let mut h = setup_app(signed_in());
        seed_family(&mut h).await;

        let report = h.app.delete_with_descendants("t1").await.unwrap();

        assert_eq!(h.store.deletes(), vec!["t2", "t3", "t1"]);
        assert_eq!(report.deleted, vec!["t2", "t3", "t1"]);
        assert!(report.is_complete());
        assert!(h.store.contents().is_empty());
    }

    #[tokio::test]
    async fn failed_child_keeps_its_ancestors() {
        let mut h = setup_app(signed_in());
        seed_family(&mut h).await;
        h.store.refuse_delete("t2");

        let report = h.app.delete_with_descendants("t1").await.unwrap();

        assert_eq!(report.deleted, vec!["t3"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "t2");
        assert_eq!(report.skipped, vec!["t1"]);
        assert!(!report.is_complete());
        assert_eq!(h.store.contents(), vec!["Trip", "Tickets"]);

        let notices = h.notices();
        assert!(
            notices
                .iter()
                .any(|n| n.level == NoticeLevel::Error && n.message.contains("Could not delete"))
        );
    }

    #[tokio::test]
    async fn delete_of_unknown_todo_is_not_found() {
        let mut h = setup_app(signed_in());
        let err = h.app.delete_with_descendants("nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TodoNotFound);
        assert!(h.store.deletes().is_empty());
    }

    #[tokio::test]
    async fn confirmed_delete_runs_once() {
        let mut h = setup_app(signed_in());
        seed_family(&mut h).await;

        h.app.request_delete("t1").unwrap();
        assert_eq!(
            h.app.dialog().message(),
            Some("Delete \"Trip\" and its 2 subtasks?")
        );
        assert!(h.store.deletes().is_empty());

        let result = h.app.submit_dialog(None).await.unwrap();
        assert!(matches!(result, DialogResult::Deleted(ref r) if r.deleted.len() == 3));
        assert!(h.app.dialog().is_idle());
    }

    #[tokio::test]
    async fn cancelled_delete_touches_nothing() {
        let mut h = setup_app(signed_in());
        seed_family(&mut h).await;

        h.app.request_delete("t1").unwrap();
        assert_eq!(h.app.cancel_dialog().unwrap(), DialogResult::Declined);

        assert!(h.store.deletes().is_empty());
        assert_eq!(h.store.contents().len(), 3);
    }

    #[tokio::test]
    async fn image_left_behind_by_delete_is_an_error() {
        let mut h = setup_app_with_storage(signed_in(), Arc::new(StickyStorage));
        let todo = h
            .app
            .add_todo("Frame photo", None, Some(image("photo.jpg")))
            .await
            .unwrap();
        h.notices();

        let report = h.app.delete_with_descendants(&todo.id).await.unwrap();
        assert_eq!(report.deleted, vec![todo.id.clone()]);
        assert_eq!(report.image_failures.len(), 1);
        assert!(!report.is_complete());

        let notices = h.notices();
        assert!(notices.iter().all(|n| n.level != NoticeLevel::Success));
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Error
            && n.message == "Task deleted, but 1 image(s) could not be removed"));
    }

    #[tokio::test]
    async fn replaced_image_left_behind_is_an_error() {
        let mut h = setup_app_with_storage(signed_in(), Arc::new(StickyStorage));
        let todo = h
            .app
            .add_todo("Frame photo", None, Some(image("old.jpg")))
            .await
            .unwrap();
        h.app.refresh().await.unwrap();
        h.notices();

        let updated = h.app.attach_image(&todo.id, image("new.jpg")).await.unwrap();
        assert!(updated.image_key.unwrap().ends_with("-new.jpg"));

        let notices = h.notices();
        assert!(notices.iter().all(|n| n.level != NoticeLevel::Success));
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Error
            && n.message.contains("previous image could not be removed")));
    }

    #[tokio::test]
    async fn clean_image_replacement_succeeds() {
        let mut h = setup_app(signed_in());
        let todo = h
            .app
            .add_todo("Frame photo", None, Some(image("old.jpg")))
            .await
            .unwrap();
        h.app.refresh().await.unwrap();
        h.notices();

        h.app.attach_image(&todo.id, image("new.jpg")).await.unwrap();
        let notices = h.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
    }
}

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn blank_content_is_rejected_with_notice() {
        let mut h = setup_app(signed_in());

        let err = h.app.add_todo("   ", None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert!(h.store.contents().is_empty());

        let notices = h.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(notices[0].message, "Please enter a task");
    }

    #[tokio::test]
    async fn content_is_trimmed() {
        let mut h = setup_app(signed_in());
        let todo = h.app.add_todo("  Water plants ", None, None).await.unwrap();
        assert_eq!(todo.content, "Water plants");
    }

    #[tokio::test]
    async fn signed_out_mutations_are_refused() {
        let mut h = setup_app(AuthState::signed_out());

        let err = h.app.add_todo("Water plants", None, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotSignedIn);
        assert!(h.store.contents().is_empty());

        let notices = h.notices();
        assert_eq!(notices[0].message, "Sign in to add tasks");
    }

    #[tokio::test]
    async fn bad_deadline_prompt_leaves_todo_unchanged() {
        let mut h = setup_app(signed_in());
        let todo = h.app.add_todo("Taxes", None, None).await.unwrap();

        h.app.request_deadline(&todo.id).unwrap();
        let err = h
            .app
            .submit_dialog(Some("next week".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert!(h.app.dialog().is_idle());
    }

    #[tokio::test]
    async fn deadline_prompt_sets_and_clears() {
        let mut h = setup_app(signed_in());
        let todo = h.app.add_todo("Taxes", None, None).await.unwrap();

        h.app.request_deadline(&todo.id).unwrap();
        let result = h.app.submit_dialog(Some("2026-04-15".into())).await.unwrap();
        let DialogResult::Updated(updated) = result else {
            panic!("expected an update, got {:?}", result);
        };
        assert_eq!(
            updated.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2026-04-15".to_string())
        );

        h.app.request_deadline(&todo.id).unwrap();
        let result = h.app.submit_dialog(Some(String::new())).await.unwrap();
        assert!(matches!(result, DialogResult::Updated(ref t) if t.deadline.is_none()));
    }

    #[tokio::test]
    async fn subtask_prompt_creates_child() {
        let mut h = setup_app(signed_in());
        let root = h.app.add_todo("Trip", None, None).await.unwrap();

        h.app.request_subtask(&root.id).unwrap();
        let result = h.app.submit_dialog(Some("Pack".into())).await.unwrap();
        let DialogResult::Added(added) = result else {
            panic!("expected an add, got {:?}", result);
        };
        assert_eq!(added[0].parent_todo_id.as_deref(), Some(root.id.as_str()));
    }

    #[tokio::test]
    async fn toggle_done_flips_flag() {
        let mut h = setup_app(signed_in());
        let todo = h.app.add_todo("Laundry", None, None).await.unwrap();
        h.app.refresh().await.unwrap();

        assert!(h.app.toggle_done(&todo.id).await.unwrap().is_done);
        h.app.refresh().await.unwrap();
        assert!(!h.app.toggle_done(&todo.id).await.unwrap().is_done);
    }

    #[tokio::test]
    async fn id_suffix_resolves_only_when_unique() {
        let mut h = setup_app(signed_in());
        for n in 1..=11 {
            h.app.add_todo(&format!("Task {}", n), None, None).await.unwrap();
        }
        h.app.refresh().await.unwrap();
        h.notices();

        // t1 and t11 both end in "1".
        let err = h.app.set_done("1", true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert!(h.store.todos.lock().unwrap().iter().all(|t| !t.is_done));

        let todo = h.app.set_done("5", true).await.unwrap();
        assert_eq!(todo.id, "t5");
        assert_eq!(h.app.set_done("t1", true).await.unwrap().id, "t1");
    }
}

mod suggestion_tests {
    use super::*;

    const REPLY: &str = "Here is a plan:\n1. Buy milk\n- Call bank\n* Pack bag\nNot a task";

    #[tokio::test]
    async fn finished_assistant_turn_stages_suggestions() {
        let mut h = setup_app(signed_in());
        let chat = ConversationSession::new(
            DEFAULT_CONVERSATION_ID,
            Identity::new("alice"),
            "prompt",
            Arc::new(ScriptedModel::new([REPLY])),
        );

        chat.send("Help me get ready").await.unwrap();
        let view = chat.view();
        assert!(h.app.on_conversation(&view).unwrap());
        assert!(h.app.dialog().message().unwrap().starts_with("Add 3 suggested tasks?"));

        // The same turn never fires twice.
        h.app.cancel_dialog().unwrap();
        assert!(!h.app.on_conversation(&view).unwrap());
        assert!(h.store.contents().is_empty());
    }

    #[tokio::test]
    async fn in_flight_turn_is_ignored() {
        let mut h = setup_app(signed_in());
        let view = ConversationView {
            messages: vec![tasknest::ai::ChatMessage::assistant(REPLY)],
            is_loading: true,
        };
        assert!(!h.app.on_conversation(&view).unwrap());
        assert!(h.app.dialog().is_idle());
    }

    #[tokio::test]
    async fn confirmed_suggestions_become_root_todos() {
        let mut h = setup_app(signed_in());
        let items = vec!["Buy milk".to_string(), "Call bank".to_string()];

        assert!(h.app.stage_suggestions(items).unwrap());
        let result = h.app.submit_dialog(None).await.unwrap();

        assert!(matches!(result, DialogResult::Added(ref t) if t.len() == 2));
        assert_eq!(h.store.contents(), vec!["Buy milk", "Call bank"]);
        assert!(
            h.store
                .todos
                .lock()
                .unwrap()
                .iter()
                .all(|t| t.parent_todo_id.is_none())
        );
    }

    #[tokio::test]
    async fn one_failed_suggestion_does_not_stop_the_rest() {
        let mut h = setup_app(signed_in());
        h.store.refuse_create("Call bank");
        let items = vec![
            "Buy milk".to_string(),
            "Call bank".to_string(),
            "Pack bag".to_string(),
        ];

        let created = h.app.add_suggestions(&items).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(h.store.contents(), vec!["Buy milk", "Pack bag"]);

        let notices = h.notices();
        assert!(notices.iter().any(|n| n.message == "Failed to add 1 of 3 suggested tasks"));
    }

    #[tokio::test]
    async fn empty_suggestions_open_nothing() {
        let mut h = setup_app(signed_in());
        assert!(!h.app.stage_suggestions(Vec::new()).unwrap());
        assert!(h.app.dialog().is_idle());
    }

    #[tokio::test]
    async fn second_dialog_is_refused() {
        let mut h = setup_app(signed_in());
        seed_family(&mut h).await;

        h.app.request_delete("t1").unwrap();
        let err = h
            .app
            .stage_suggestions(vec!["Buy milk".to_string()])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DialogBusy);

        // The pending delete survives.
        let result = h.app.submit_dialog(None).await.unwrap();
        assert!(matches!(result, DialogResult::Deleted(_)));
    }

    #[tokio::test]
    async fn adopted_plan_nests_items() {
        let mut h = setup_app(signed_in());
        let plan = TaskPlan {
            name: "Pancakes".into(),
            ingredients: vec!["Flour".into(), "".into(), "Eggs".into()],
            instructions: "Mix and fry.".into(),
        };

        h.app.stage_plan(plan).unwrap();
        let DialogResult::Added(created) = h.app.submit_dialog(None).await.unwrap() else {
            panic!("expected todos to be added");
        };

        assert_eq!(created.len(), 3);
        assert!(created[0].parent_todo_id.is_none());
        assert!(
            created[1..]
                .iter()
                .all(|t| t.parent_todo_id.as_deref() == Some(created[0].id.as_str()))
        );
    }

    #[tokio::test]
    async fn failed_plan_item_is_an_error() {
        let mut h = setup_app(signed_in());
        h.store.refuse_create("Eggs");
        let plan = TaskPlan {
            name: "Pancakes".into(),
            ingredients: vec!["Flour".into(), "Eggs".into()],
            instructions: "Mix and fry.".into(),
        };

        let created = h.app.adopt_plan(&plan).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(h.store.contents(), vec!["Pancakes", "Flour"]);

        let notices = h.notices();
        assert!(notices.iter().all(|n| n.level != NoticeLevel::Success));
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Error
            && n.message == "Added \"Pancakes\", but 1 of 2 subtasks failed"));
    }
}

mod chat_tests {
    use super::*;

    const REPLY: &str = "Sure:\n1. Buy milk\n2. Call bank\n3. Pack bag";

    fn session(owner: &str, model: ScriptedModel) -> ConversationSession {
        ConversationSession::new(
            DEFAULT_CONVERSATION_ID,
            Identity::new(owner),
            "prompt",
            Arc::new(model),
        )
    }

    #[tokio::test]
    async fn answered_chat_stages_suggestions() {
        let mut h = setup_app(signed_in());
        let chat = session("alice", ScriptedModel::new([REPLY]));

        assert!(h.app.chat(&chat, "Help me get ready").await.unwrap());
        assert_eq!(chat.view().messages.len(), 2);
        assert!(h.app.dialog().message().unwrap().starts_with("Add 3 suggested tasks?"));
    }

    #[tokio::test]
    async fn signed_out_chat_sends_nothing() {
        let mut h = setup_app(AuthState::signed_out());
        let chat = session("alice", ScriptedModel::new([REPLY]));

        let err = h.app.chat(&chat, "Help me get ready").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotSignedIn);
        assert!(chat.view().messages.is_empty());

        let notices = h.notices();
        assert_eq!(notices[0].message, "Sign in to chat with the assistant");
    }

    #[tokio::test]
    async fn another_users_conversation_is_refused() {
        let mut h = setup_app(signed_in());
        let chat = session("bob", ScriptedModel::new([REPLY]));

        let err = h.app.chat(&chat, "Help me get ready").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
        assert!(chat.view().messages.is_empty());
    }

    #[tokio::test]
    async fn failed_answer_is_reported() {
        let mut h = setup_app(signed_in());
        let model = ScriptedModel::default();
        model.push_failure("throttled");
        let chat = session("alice", model);

        let err = h.app.chat(&chat, "Help me get ready").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AiError);
        assert!(!chat.view().is_loading);
        assert!(h.app.dialog().is_idle());
        assert!(
            h.notices()
                .iter()
                .any(|n| n.message == "The assistant did not answer")
        );
    }
}

mod end_to_end_tests {
    use super::*;

    fn sqlite_app(storage_root: &std::path::Path) -> (TodoApp, Arc<SqliteStore>) {
        let db = Database::open_in_memory().expect("Failed to create in-memory database");
        let store = Arc::new(SqliteStore::new(db, SnapshotHub::new(), Identity::new("alice")));
        let app = TodoApp::new(
            store.clone(),
            Arc::new(LocalObjectStorage::new(storage_root)),
            Arc::new(signed_in()),
            Logger::new(),
            AppSettings::default(),
        );
        (app, store)
    }

    #[tokio::test]
    async fn snapshots_drive_the_forest() {
        let dir = TempDir::new().unwrap();
        let (mut app, store) = sqlite_app(dir.path());
        let mut sub = store.observe().await;

        let root = app.add_todo("Trip", None, None).await.unwrap();
        app.add_subtask(&root.id, "Tickets").await.unwrap();

        // The controller never edits its copy; it only applies snapshots.
        assert!(app.forest().is_empty());
        while let Some(event) = sub.try_next() {
            assert!(app.apply_event(event));
        }

        assert_eq!(app.forest().len(), 1);
        assert_eq!(app.forest()[0].subtasks[0].todo.content, "Tickets");
    }

    #[tokio::test]
    async fn subscription_error_stops_updates() {
        let dir = TempDir::new().unwrap();
        let (mut app, _store) = sqlite_app(dir.path());
        assert!(!app.apply_event(SnapshotEvent::Error("connection lost".into())));
        assert_eq!(
            app.dialog().message(),
            Some("Tasks stopped updating: connection lost")
        );
        assert_eq!(app.cancel_dialog().unwrap(), DialogResult::Dismissed);
    }

    #[tokio::test]
    async fn id_shown_in_listing_marks_done() {
        let dir = TempDir::new().unwrap();
        let (mut app, _store) = sqlite_app(dir.path());
        let todo = app.add_todo("Laundry", None, None).await.unwrap();
        app.add_todo("Dishes", None, None).await.unwrap();
        app.refresh().await.unwrap();

        let stats = ForestStats::compute(app.snapshot(), app.forest());
        let listing = format_forest_markdown(app.forest(), &stats);
        let shown = short_id(&todo.id);
        assert!(listing.contains(&format!("`{}`", shown)));

        let done = app.set_done(shown, true).await.unwrap();
        assert_eq!(done.id, todo.id);
        assert!(done.is_done);
    }

    #[tokio::test]
    async fn images_live_under_public_prefix_and_go_with_their_todo() {
        let dir = TempDir::new().unwrap();
        let (mut app, _store) = sqlite_app(dir.path());

        let todo = app
            .add_todo(
                "Frame photo",
                None,
                Some(ImageUpload {
                    filename: "holiday.jpg".into(),
                    bytes: b"jpeg".to_vec(),
                }),
            )
            .await
            .unwrap();

        let key = todo.image_key.clone().unwrap();
        assert!(key.ends_with("-holiday.jpg"));
        let file = dir.path().join("public").join(&key);
        assert_eq!(std::fs::read(&file).unwrap(), b"jpeg");

        let url = app.image_url(&todo).await.unwrap();
        assert!(url.starts_with("file://"));

        app.refresh().await.unwrap();
        let report = app.delete_with_descendants(&todo.id).await.unwrap();
        assert!(report.is_complete());
        assert!(report.image_failures.is_empty());
        assert!(!file.exists());
    }
}
