//! Integration tests for update notices and change subscriptions.
//!
//! Covers notice overwrite semantics, which mutations notify, delivery
//! order, subscription lifecycle, best-effort publishing and a board kept
//! fresh by change notices.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use taskhub::clock::{Clock, ManualClock};
use taskhub::config::TaskhubConfig;
use taskhub::notify::{Subscription, TaskChange};
use taskhub::session::{Sandbox, SandboxSession};
use taskhub_proto::{TaskDraft, TaskId, TaskStatus, UpdateNotice};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

const START_MS: u64 = 1_750_000_000_000;
const WAIT: Duration = Duration::from_secs(1);

fn sandbox() -> (Arc<ManualClock>, Sandbox) {
    let clock = Arc::new(ManualClock::new(START_MS));
    (clock.clone(), Sandbox::new(clock))
}

async fn registered(sandbox: &Sandbox, email: &str, name: &str) -> SandboxSession {
    let session = sandbox.open_session(&TaskhubConfig::default());
    assert!(session.register(email, "secret1", name).await);
    session
}

/// Waits briefly for the next change, panicking on timeout.
async fn next_change(subscription: &mut Subscription) -> TaskChange {
    tokio::time::timeout(WAIT, subscription.next())
        .await
        .expect("timed out waiting for a change")
        .expect("subscription ended")
}

/// Asserts nothing is delivered within a short window.
async fn assert_quiet(subscription: &mut Subscription) {
    let result = tokio::time::timeout(Duration::from_millis(50), subscription.next()).await;
    assert!(result.is_err(), "unexpected change: {result:?}");
}

fn stored_notice(sandbox: &Sandbox, id: &TaskId) -> UpdateNotice {
    let value = sandbox.hub().value(&format!("task_updates/{id}")).unwrap();
    UpdateNotice::from_value(id.clone(), &value).into_value()
}

// ===========================================================================
// Notice records
// ===========================================================================

#[tokio::test]
async fn second_publish_overwrites_first() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;

    let id = ana.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    clock.advance(250);
    ben.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();

    let notices = sandbox.hub().children("task_updates");
    assert_eq!(notices.len(), 1);
    let notice = stored_notice(&sandbox, &id);
    assert_eq!(notice.updated_by, ben.accounts().current_actor().unwrap().id);
    assert_eq!(notice.updated_by_name.as_deref(), Some("Ben"));
    assert_eq!(notice.last_update, START_MS + 250);
}

#[tokio::test]
async fn one_notice_per_task() {
    let (_clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let a = ana.tasks().create_task(&TaskDraft::new("a")).await.unwrap();
    let b = ana.tasks().create_task(&TaskDraft::new("b")).await.unwrap();
    ana.tasks().update_status(&a, TaskStatus::InProgress).await.unwrap();

    let keys: Vec<String> = sandbox
        .hub()
        .children("task_updates")
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    let mut expected = vec![a.to_string(), b.to_string()];
    expected.sort();
    assert_eq!(keys, expected);
}

// ===========================================================================
// Which mutations notify
// ===========================================================================

#[tokio::test]
async fn status_update_fires_change_with_actor_name() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let mut changes = ana.tasks().subscribe().await.unwrap();

    let id = ben.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    assert_quiet(&mut changes).await;

    clock.advance(1);
    ben.tasks().update_status(&id, TaskStatus::InProgress).await.unwrap();
    let change = next_change(&mut changes).await;
    assert_eq!(change.message, "Ben updated a task");
    assert_eq!(change.notice.task_id, id);
}

#[tokio::test]
async fn delete_does_not_notify() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let id = ben.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    let mut changes = ana.tasks().subscribe().await.unwrap();

    clock.advance(1);
    ben.tasks().delete_task(&id).await.unwrap();
    assert_quiet(&mut changes).await;
}

#[tokio::test]
async fn rapid_updates_arrive_in_order() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let cleo = registered(&sandbox, "cleo@example.com", "Cleo").await;
    let id = ana.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    let mut changes = ana.tasks().subscribe().await.unwrap();

    clock.advance(1);
    ben.tasks().update_status(&id, TaskStatus::InProgress).await.unwrap();
    clock.advance(1);
    cleo.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();

    assert_eq!(next_change(&mut changes).await.message, "Ben updated a task");
    assert_eq!(next_change(&mut changes).await.message, "Cleo updated a task");
}

#[tokio::test]
async fn change_is_delivered_over_a_large_notice_backlog() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let backlog = TaskhubConfig::default().event_buffer;
    for n in 0..backlog {
        ben.tasks()
            .notices()
            .publish(&TaskId::new(format!("t-{n}")), "ben", "Ben")
            .await;
    }
    let mut changes = ana.tasks().subscribe().await.unwrap();

    clock.advance(1);
    ben.tasks().notices().publish(&TaskId::new("t-0"), "ben", "Ben").await;
    let change = next_change(&mut changes).await;
    assert_eq!(change.notice.task_id.as_str(), "t-0");
    assert_eq!(change.message, "Ben updated a task");
}

#[tokio::test]
async fn slow_subscriber_still_sees_latest_change_per_task() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let cleo = registered(&sandbox, "cleo@example.com", "Cleo").await;
    let id = ben.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    let mut changes = ana.tasks().subscribe().await.unwrap();

    let burst = TaskhubConfig::default().event_buffer + 10;
    for _ in 0..burst {
        clock.advance(1);
        ben.tasks().update_status(&id, TaskStatus::InProgress).await.unwrap();
    }
    clock.advance(1);
    cleo.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();

    let mut last = None;
    while let Ok(Some(change)) =
        tokio::time::timeout(Duration::from_millis(50), changes.next()).await
    {
        last = Some(change);
    }
    let last = last.expect("no change delivered");
    assert_eq!(last.message, "Cleo updated a task");
    assert_eq!(last.notice.last_update, clock.now_ms());
}

#[tokio::test]
async fn actor_own_changes_are_delivered_too() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let id = ana.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    let mut changes = ana.tasks().subscribe().await.unwrap();

    clock.advance(1);
    ana.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();
    assert_eq!(next_change(&mut changes).await.message, "Ana updated a task");
}

// ===========================================================================
// Subscription lifecycle
// ===========================================================================

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let id = ben.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    let mut changes = ana.tasks().subscribe().await.unwrap();

    changes.unsubscribe();
    clock.advance(1);
    ben.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();

    assert!(!changes.is_active());
    assert!(changes.next().await.is_none());
    changes.unsubscribe();
}

#[tokio::test]
async fn unsubscribe_after_session_ends_is_safe() {
    let (_clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let mut changes = ana.tasks().subscribe().await.unwrap();

    drop(ana);
    assert!(changes.next().await.is_none());
    assert!(!changes.is_active());
    changes.unsubscribe();
}

#[tokio::test]
async fn stream_and_callback_forms_agree() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let id = ben.tasks().create_task(&TaskDraft::new("x")).await.unwrap();

    let stream = ana.tasks().subscribe().await.unwrap().into_stream();
    tokio::pin!(stream);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut handle = ana
        .tasks()
        .subscribe_with(move |change| {
            let _ = tx.send(change.message);
        })
        .await
        .unwrap();

    clock.advance(1);
    ben.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();

    let from_stream = tokio::time::timeout(WAIT, stream.next()).await.unwrap().unwrap();
    let from_callback = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(from_stream.message, from_callback);

    handle.unsubscribe();
    assert!(!handle.is_active());
}

// ===========================================================================
// Best-effort publishing
// ===========================================================================

#[tokio::test]
async fn failed_publish_keeps_the_mutation() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let id = ana.tasks().create_task(&TaskDraft::new("x")).await.unwrap();
    let before = stored_notice(&sandbox, &id);

    ana.realtime().disconnect();
    clock.advance(1);
    ana.tasks().update_status(&id, TaskStatus::Completed).await.unwrap();

    let task = ana.tasks().get_task(&id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(stored_notice(&sandbox, &id), before);
}

#[tokio::test]
async fn create_succeeds_without_realtime() {
    let (_clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    ana.realtime().disconnect();

    let id = ana.tasks().create_task(&TaskDraft::new("offline notice")).await.unwrap();
    assert!(ana.tasks().get_task(&id).await.unwrap().is_some());
    assert!(sandbox.hub().value(&format!("task_updates/{id}")).is_none());
}

// ===========================================================================
// Board driven by notices
// ===========================================================================

#[tokio::test]
async fn board_follows_remote_changes() {
    let (clock, sandbox) = sandbox();
    let ana = registered(&sandbox, "ana@example.com", "Ana").await;
    let ben = registered(&sandbox, "ben@example.com", "Ben").await;
    let mut changes = ana.tasks().subscribe().await.unwrap();
    let mut board = ana.board();

    let id = ben.tasks().create_task(&TaskDraft::new("shared")).await.unwrap();
    board.refresh().await.unwrap();
    assert_eq!(board.task(&id).unwrap().status, TaskStatus::Pending);

    clock.advance(1);
    ben.tasks().update_status(&id, TaskStatus::InProgress).await.unwrap();
    let change = next_change(&mut changes).await;
    board.on_change(&change).await.unwrap();

    assert_eq!(board.task(&id).unwrap().status, TaskStatus::InProgress);
}
