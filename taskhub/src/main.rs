//! `TaskHub` sandbox.
//!
//! Runs two device sessions against in-process backends: Ben creates and
//! updates tasks while Ana's board follows along from change notices.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskhub/config.toml`).
//!
//! ```bash
//! cargo run --bin taskhub
//!
//! # Smaller per-subscription event buffer, verbose logs
//! TASKHUB_LOG=debug cargo run --bin taskhub -- --event-buffer 8
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskhub::clock::{Clock, SystemClock};
use taskhub::config::{CliArgs, TaskhubConfig};
use taskhub::identity::InMemoryIdentity;
use taskhub::notify::Subscription;
use taskhub::realtime::InMemoryRealtime;
use taskhub::session::Sandbox;
use taskhub::store::InMemoryDocumentStore;
use taskhub::tasks::TaskBoard;
use taskhub_proto::{PresenceRecord, Priority, TaskDraft, TaskStatus};

type SandboxBoard = TaskBoard<InMemoryIdentity, InMemoryDocumentStore, InMemoryRealtime>;

const DAY_MS: u64 = 86_400_000;
const NOTICE_WAIT: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match TaskhubConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}");
            TaskhubConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("taskhub starting");

    if let Err(e) = run_sandbox(&config).await {
        tracing::error!(error = %e, "sandbox run failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    tracing::info!("taskhub exiting");
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskhub.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run_sandbox(config: &TaskhubConfig) -> Result<(), Box<dyn std::error::Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sandbox = Sandbox::new(Arc::clone(&clock));

    let ana = sandbox.open_session(config);
    let ben = sandbox.open_session(config);
    if !ana.register("ana@example.com", "secret-ana", "Ana").await
        || !ben.register("ben@example.com", "secret-ben", "Ben").await
    {
        return Err("sandbox registration failed".into());
    }
    let ana_actor = ana
        .accounts()
        .current_actor()
        .ok_or("ana is not signed in")?;

    let mut changes = ana.tasks().subscribe().await?;
    let mut board = ana.board();
    board.refresh().await?;

    let now = clock.now_ms();
    let notes = ben
        .tasks()
        .create_task(
            &TaskDraft::new("Write release notes")
                .with_description("Summarize the sync changes")
                .assigned_to(ana_actor.id.clone(), ana_actor.name())
                .with_priority(Priority::from_label("High")?)
                .due_at(now + 2 * DAY_MS),
        )
        .await?;
    let login_bug = ben
        .tasks()
        .create_task(&TaskDraft::new("Fix login bug").due_at(now.saturating_sub(DAY_MS)))
        .await?;
    // Creation is not a change; Ana picks new tasks up on her next re-list.
    board.refresh().await?;
    print_board("Ana's board after Ben created two tasks", &board, clock.now_ms());

    ben.tasks().update_status(&notes, TaskStatus::InProgress).await?;
    follow_change(&mut changes, &mut board, clock.as_ref()).await?;

    ben.tasks().update_status(&login_bug, TaskStatus::Completed).await?;
    follow_change(&mut changes, &mut board, clock.as_ref()).await?;

    ben.tasks().delete_task(&login_bug).await?;
    board.refresh().await?;
    print_board("Ana's board after Ben deleted a task", &board, clock.now_ms());

    changes.unsubscribe();

    println!("\nPresence:");
    for (user_id, value) in sandbox.hub().children(&config.presence_path) {
        let record = PresenceRecord::from_value(&value).into_value();
        println!("  {} ({user_id}): {}", record.user_name, record.status);
    }
    Ok(())
}

async fn follow_change(
    changes: &mut Subscription,
    board: &mut SandboxBoard,
    clock: &dyn Clock,
) -> Result<(), Box<dyn std::error::Error>> {
    match tokio::time::timeout(NOTICE_WAIT, changes.next()).await {
        Ok(Some(change)) => {
            println!("\n* {}", change.message);
            board.on_change(&change).await?;
            print_board("Ana's board", board, clock.now_ms());
        }
        Ok(None) => return Err("change subscription ended".into()),
        Err(_) => tracing::warn!("no change notice arrived in time"),
    }
    Ok(())
}

fn print_board(title: &str, board: &SandboxBoard, now_ms: u64) {
    println!("\n{title} ({} overdue)", board.overdue_count(now_ms));
    for task in board.tasks() {
        let marker = if task.is_overdue(now_ms) { " OVERDUE" } else { "" };
        println!(
            "  [{:<10}] {:<22} {:<6} due {}{marker}  -> {}",
            task.status.to_string(),
            task.title,
            task.priority.to_string(),
            format_date_ms(task.due_date),
            task.assigned_to_name,
        );
    }
}

fn format_date_ms(ms: u64) -> String {
    use chrono::{Local, TimeZone};
    let Ok(ms) = i64::try_from(ms) else {
        return "????-??-??".to_string();
    };
    match Local.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d").to_string(),
        _ => "????-??-??".to_string(),
    }
}
