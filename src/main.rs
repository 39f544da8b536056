//! tasknest command-line front end
//!
//! Every command drives the same [`TodoApp`] controller a graphical front end
//! would: mutations go through sign-in checks and confirmation dialogs, and
//! notices are printed to stderr as they would be shown as toasts.

use anyhow::{Result, bail};
use clap::Parser;
use std::sync::Arc;
use tasknest::ai::{ConversationView, ScriptedModel, TaskGenerator};
use tasknest::app::{AppSettings, DialogResult, TodoApp};
use tasknest::auth::AuthState;
use tasknest::cli::assist::{PlanArgs, SuggestArgs, describe_plan, load_transcript, read_output};
use tasknest::cli::todo::{
    AddArgs, DeadlineArgs, DeleteArgs, DoneArgs, ImageArgs, ListArgs, read_image,
};
use tasknest::cli::watch::WatchArgs;
use tasknest::cli::{Cli, Command, confirm, prompt, resolve_format};
use tasknest::config::{Config, ConfigLoader};
use tasknest::db::Database;
use tasknest::format::{OutputFormat, render_forest, short_id};
use tasknest::logging::{self, LevelFilter, Logger, Notice, NoticeLevel};
use tasknest::storage::LocalObjectStorage;
use tasknest::store::{SqliteStore, TodoStore};
use tasknest::subscriptions::SnapshotHub;
use tasknest::suggest::extract_candidates;
use tasknest::tree::ForestStats;
use tasknest::types::Identity;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, info};

/// Everything a command needs, wired from configuration.
struct Session {
    app: TodoApp,
    store: Arc<SqliteStore>,
    auth: Arc<AuthState>,
    notices: UnboundedReceiver<Notice>,
    format: OutputFormat,
    system_prompt: String,
}

impl Session {
    fn open(config: &Config, verbose: bool) -> Result<Self> {
        let db = Database::open(&config.store.db_path)?;
        info!(path = %config.store.db_path.display(), "Opened task database");

        let auth = match config.auth.user.as_deref() {
            Some(user) => AuthState::signed_in(Identity::new(user)),
            None => AuthState::signed_out(),
        };
        // A signed-out session reads an owner nobody writes to, so it sees no rows.
        let owner = auth.identity().unwrap_or_else(|| Identity::new(""));

        let store = Arc::new(SqliteStore::new(db, SnapshotHub::new(), owner));
        let storage = Arc::new(LocalObjectStorage::new(config.storage.root_dir.clone()));

        let (tx, notices) = unbounded_channel();
        let filter = Arc::new(LevelFilter::new(if verbose {
            NoticeLevel::Debug
        } else {
            NoticeLevel::Info
        }));
        let logger = Logger::new()
            .with_sink(tx)
            .with_level_filter(filter)
            .with_name("tasknest");

        let settings = AppSettings {
            orphan_policy: config.tree.orphan_policy,
            image_prefix: config.storage.public_prefix.clone(),
        };
        let auth = Arc::new(auth);
        let app = TodoApp::new(store.clone(), storage, auth.clone(), logger, settings);

        Ok(Self {
            app,
            store,
            auth,
            notices,
            format: config.output.format,
            system_prompt: config.ai.system_prompt().to_string(),
        })
    }

    /// Print queued notices to stderr.
    fn flush_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            let tag = match notice.level {
                NoticeLevel::Debug => "debug",
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            eprintln!("[{}] {}", tag, notice.message);
        }
    }

    fn print_forest(&self, format: OutputFormat) {
        let stats = ForestStats::compute(self.app.snapshot(), self.app.forest());
        println!("{}", render_forest(self.app.forest(), &stats, format));
    }

    /// Answer the open dialog from stdin (or `--yes`) and carry it out.
    async fn settle_dialog(&mut self, assume_yes: bool) -> Result<DialogResult> {
        let message = self.app.dialog().message().unwrap_or_default().to_string();
        self.flush_notices();
        let result = if confirm(&message, assume_yes) {
            self.app.submit_dialog(None).await?
        } else {
            self.app.cancel_dialog()?
        };
        Ok(result)
    }

    /// Answer the open prompt from stdin and carry it out.
    async fn settle_prompt(&mut self) -> Result<DialogResult> {
        let message = self.app.dialog().message().unwrap_or_default().to_string();
        self.flush_notices();
        let result = match prompt(&message) {
            Some(text) => self.app.submit_dialog(Some(text)).await?,
            None => self.app.cancel_dialog()?,
        };
        Ok(result)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(&cli.log, cli.verbose)?;

    // SAFETY: single-threaded runtime, set before anything reads the environment.
    if let Some(config_path) = &cli.config {
        unsafe {
            std::env::set_var("TASKNEST_CONFIG_PATH", config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "Using config file");
    }

    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.store.db_path = db_path.into();
    }
    if let Some(storage_dir) = &cli.storage_dir {
        config.storage.root_dir = storage_dir.into();
    }
    if let Some(user) = &cli.user {
        config.auth.user = Some(user.clone()).filter(|u| !u.trim().is_empty());
    }

    let mut session = Session::open(config, cli.verbose)?;

    let result = match cli.command {
        Some(Command::List(args)) => run_list(&mut session, args).await,
        Some(Command::Add(args)) => run_add(&mut session, args).await,
        Some(Command::Done(args)) => run_done(&mut session, args).await,
        Some(Command::Deadline(args)) => run_deadline(&mut session, args).await,
        Some(Command::Image(args)) => run_image(&mut session, args).await,
        Some(Command::Delete(args)) => run_delete(&mut session, args).await,
        Some(Command::Suggest(args)) => run_suggest(&mut session, args).await,
        Some(Command::Plan(args)) => run_plan(&mut session, args).await,
        Some(Command::Watch(args)) => run_watch(&mut session, args).await,
        None => run_list(&mut session, ListArgs::default()).await,
    };

    session.flush_notices();
    result
}

async fn run_list(session: &mut Session, args: ListArgs) -> Result<()> {
    let format = args.output_format(session.format)?;
    session.app.refresh().await?;
    session.print_forest(format);
    Ok(())
}

async fn run_add(session: &mut Session, args: AddArgs) -> Result<()> {
    let deadline = args.deadline()?;
    let image = args.image.as_deref().map(read_image).transpose()?;
    session.app.refresh().await?;

    let todo = match (args.parent.as_deref(), args.content.as_deref()) {
        (None, content) => {
            let content = content.unwrap_or_default();
            session.app.add_todo(content, deadline, image).await?
        }
        (Some(parent_id), content) => {
            let mut todo = match content {
                Some(content) => session.app.add_subtask(parent_id, content).await?,
                None => {
                    session.app.request_subtask(parent_id)?;
                    match session.settle_prompt().await? {
                        DialogResult::Added(mut todos) if !todos.is_empty() => todos.remove(0),
                        _ => {
                            println!("Nothing added");
                            return Ok(());
                        }
                    }
                }
            };
            if deadline.is_some() {
                todo = session.app.set_deadline(&todo.id, deadline).await?;
            }
            if let Some(image) = image {
                todo = session.app.attach_image(&todo.id, image).await?;
            }
            todo
        }
    };

    println!("{}", todo.id);
    Ok(())
}

async fn run_done(session: &mut Session, args: DoneArgs) -> Result<()> {
    session.app.refresh().await?;
    let todo = session.app.set_done(&args.id, !args.undo).await?;
    let state = if todo.is_done { "done" } else { "not done" };
    println!("{} `{}` marked {}", todo.content, short_id(&todo.id), state);
    Ok(())
}

async fn run_deadline(session: &mut Session, args: DeadlineArgs) -> Result<()> {
    session.app.refresh().await?;
    let todo = if args.needs_prompt() {
        session.app.request_deadline(&args.id)?;
        match session.settle_prompt().await? {
            DialogResult::Updated(todo) => todo,
            _ => {
                println!("Deadline unchanged");
                return Ok(());
            }
        }
    } else {
        let deadline = args.deadline()?;
        session.app.set_deadline(&args.id, deadline).await?
    };
    match todo.deadline {
        Some(d) => println!("{} due {}", todo.content, d.to_rfc3339()),
        None => println!("{} has no deadline", todo.content),
    }
    Ok(())
}

async fn run_image(session: &mut Session, args: ImageArgs) -> Result<()> {
    let image = read_image(&args.file)?;
    session.app.refresh().await?;
    let todo = session.app.attach_image(&args.id, image).await?;
    if let Some(url) = session.app.image_url(&todo).await {
        println!("{}", url);
    }
    Ok(())
}

async fn run_delete(session: &mut Session, args: DeleteArgs) -> Result<()> {
    session.app.refresh().await?;
    session.app.request_delete(&args.id)?;

    match session.settle_dialog(args.yes).await? {
        DialogResult::Deleted(report) => {
            for id in &report.deleted {
                println!("deleted {}", id);
            }
            for (id, reason) in &report.failed {
                println!("failed  {}: {}", id, reason);
            }
            for id in &report.skipped {
                println!("kept    {} (a subtask could not be deleted)", id);
            }
            if !report.is_complete() {
                session.flush_notices();
                bail!("deletion of {} was incomplete", report.requested);
            }
        }
        _ => println!("Nothing deleted"),
    }
    Ok(())
}

async fn run_suggest(session: &mut Session, args: SuggestArgs) -> Result<()> {
    let view: ConversationView = load_transcript(&args.transcript)?;

    if !args.add {
        let candidates = view
            .last()
            .map(|m| extract_candidates(m, view.is_loading))
            .unwrap_or_default();
        if candidates.is_empty() {
            println!("No suggestions");
        }
        for item in candidates {
            println!("- {}", item);
        }
        return Ok(());
    }

    session.app.refresh().await?;
    if !session.app.on_conversation(&view)? {
        println!("No suggestions");
        return Ok(());
    }
    print_added(session.settle_dialog(args.yes).await?);
    Ok(())
}

/// Replay recorded model output through the generation endpoint.
async fn run_plan(session: &mut Session, args: PlanArgs) -> Result<()> {
    let raw = read_output(&args.input)?;
    let generator = TaskGenerator::new(
        session.system_prompt.clone(),
        Arc::new(ScriptedModel::new([raw])),
    );
    let identity = session.auth.identity();
    let Some(plan) = generator.generate(identity.as_ref(), &args.request).await? else {
        bail!("{} does not contain a task plan", args.input.display());
    };
    print!("{}", describe_plan(&plan));

    if args.adopt {
        session.app.refresh().await?;
        session.app.stage_plan(plan)?;
        print_added(session.settle_dialog(args.yes).await?);
    }
    Ok(())
}

fn print_added(result: DialogResult) {
    match result {
        DialogResult::Added(todos) => {
            for todo in todos {
                println!("added {} {}", todo.id, todo.content);
            }
        }
        _ => println!("Nothing added"),
    }
}

async fn run_watch(session: &mut Session, args: WatchArgs) -> Result<()> {
    let format = resolve_format(args.format.as_deref(), session.format)?;
    let mut subscription = session.store.observe().await;
    let mut ticker = tokio::time::interval(args.interval());

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(mut event) = event else { break };
                // Only the newest snapshot is worth drawing.
                if let Some(newer) = subscription.latest() {
                    event = newer;
                }
                if !session.app.apply_event(event) {
                    session.flush_notices();
                    let alert = session.app.dialog().message().unwrap_or_default();
                    bail!("task subscription failed: {}", alert);
                }
                session.print_forest(format);
                session.flush_notices();
            }
            _ = ticker.tick() => {
                session.store.poll_changes()?;
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    subscription.release();
    Ok(())
}
