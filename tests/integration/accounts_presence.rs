//! Integration tests for accounts, user profiles and session presence.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::json;
use taskhub::clock::ManualClock;
use taskhub::config::TaskhubConfig;
use taskhub::session::{Sandbox, SandboxSession};
use taskhub_proto::record::as_document;
use taskhub_proto::{PresenceRecord, PresenceStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

const START_MS: u64 = 1_750_000_000_000;

fn sandbox() -> (Arc<ManualClock>, Sandbox) {
    let clock = Arc::new(ManualClock::new(START_MS));
    (clock.clone(), Sandbox::new(clock))
}

fn open(sandbox: &Sandbox) -> SandboxSession {
    sandbox.open_session(&TaskhubConfig::default())
}

fn presence_of(sandbox: &Sandbox, user_id: &str) -> PresenceRecord {
    let value = sandbox.hub().value(&format!("presence/{user_id}")).unwrap();
    PresenceRecord::from_value(&value).into_value()
}

// ===========================================================================
// Registration and sign-in
// ===========================================================================

#[tokio::test]
async fn register_creates_profile_with_server_timestamp() {
    let (_clock, sandbox) = sandbox();
    let ana = open(&sandbox);
    assert!(ana.register("ana@example.com", "secret1", "Ana").await);

    let profile = ana.accounts().current_profile().await.unwrap().unwrap();
    assert_eq!(profile.name, "Ana");
    assert_eq!(profile.email, "ana@example.com");
    assert_eq!(profile.created_at, START_MS);
}

#[tokio::test]
async fn registration_failures_report_false() {
    let (_clock, sandbox) = sandbox();
    let ana = open(&sandbox);
    assert!(!ana.register("ana@example.com", "short", "Ana").await);
    assert!(!ana.register("not-an-email", "secret1", "Ana").await);
    assert!(ana.register("ana@example.com", "secret1", "Ana").await);

    let again = open(&sandbox);
    assert!(!again.register("ana@example.com", "secret1", "Other Ana").await);
    assert!(!again.accounts().is_logged_in());
}

#[tokio::test]
async fn login_on_second_device() {
    let (_clock, sandbox) = sandbox();
    let phone = open(&sandbox);
    assert!(phone.register("ana@example.com", "secret1", "Ana").await);

    let laptop = open(&sandbox);
    assert!(!laptop.login("ana@example.com", "wrong-password").await);
    assert!(!laptop.accounts().is_logged_in());
    assert!(laptop.login("ana@example.com", "secret1").await);
    assert_eq!(
        laptop.accounts().current_actor().unwrap().id,
        phone.accounts().current_actor().unwrap().id
    );
}

#[tokio::test]
async fn logout_clears_session_only() {
    let (_clock, sandbox) = sandbox();
    let phone = open(&sandbox);
    let laptop = open(&sandbox);
    phone.register("ana@example.com", "secret1", "Ana").await;
    laptop.login("ana@example.com", "secret1").await;

    phone.accounts().logout().await;
    assert!(!phone.accounts().is_logged_in());
    assert!(laptop.accounts().is_logged_in());
}

// ===========================================================================
// Profiles
// ===========================================================================

#[tokio::test]
async fn list_users_includes_everyone_with_fallbacks() {
    let (_clock, sandbox) = sandbox();
    let ana = open(&sandbox);
    let ben = open(&sandbox);
    ana.register("ana@example.com", "secret1", "Ana").await;
    ben.register("ben@example.com", "secret1", "Ben").await;
    sandbox
        .store()
        .put_raw("users", "imported", as_document(&json!({ "name": null })));

    let users = ana.accounts().list_users().await.unwrap();
    let names: Vec<&str> = users.iter().map(|user| user.name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Ben", "Unknown User"]);
    assert_eq!(users[2].email, "");
}

#[tokio::test]
async fn profile_with_missing_fields_uses_identity() {
    let (_clock, sandbox) = sandbox();
    let ana = open(&sandbox);
    ana.register("ana@example.com", "secret1", "Ana").await;
    let id = ana.accounts().current_actor().unwrap().id;
    sandbox
        .store()
        .put_raw("users", &id, as_document(&json!({ "createdAt": 7 })));

    let profile = ana.accounts().current_profile().await.unwrap().unwrap();
    assert_eq!(profile.name, "Ana");
    assert_eq!(profile.email, "ana@example.com");
    assert_eq!(profile.created_at, 7);
}

#[tokio::test]
async fn profile_read_failure_is_an_error() {
    let (_clock, sandbox) = sandbox();
    let ana = open(&sandbox);
    ana.register("ana@example.com", "secret1", "Ana").await;
    sandbox.store().set_unavailable(true);
    assert!(ana.accounts().current_profile().await.is_err());
    assert!(ana.accounts().list_users().await.is_err());
}

// ===========================================================================
// Presence
// ===========================================================================

#[tokio::test]
async fn login_announces_online_and_disconnect_marks_offline() {
    let (clock, sandbox) = sandbox();
    let ana = open(&sandbox);
    assert!(ana.register("ana@example.com", "secret1", "Ana").await);
    let id = ana.accounts().current_actor().unwrap().id;

    let online = presence_of(&sandbox, &id);
    assert_eq!(online.status, PresenceStatus::Online);
    assert_eq!(online.user_name, "Ana");
    assert_eq!(online.last_seen, START_MS);

    clock.advance(60_000);
    drop(ana);

    let offline = presence_of(&sandbox, &id);
    assert_eq!(offline.status, PresenceStatus::Offline);
    assert_eq!(offline.last_seen, START_MS + 60_000);
}

#[tokio::test]
async fn presence_failure_does_not_block_login() {
    let (_clock, sandbox) = sandbox();
    let phone = open(&sandbox);
    phone.register("ana@example.com", "secret1", "Ana").await;

    let laptop = open(&sandbox);
    laptop.realtime().disconnect();
    assert!(laptop.login("ana@example.com", "secret1").await);
    assert!(laptop.accounts().is_logged_in());
}
