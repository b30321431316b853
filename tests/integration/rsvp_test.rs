//! Integration tests for RSVP toggles and their preconditions.

mod helpers;

use chrono::Duration;

use volhub_core::error::ErrorKind;
use volhub_core::types::ErrorCategory;
use volhub_entity::UserRole;

#[tokio::test]
async fn test_second_rsvp_rejected_when_full() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let bob = app.create_profile(UserRole::User, "Bob").await;
    let opp = app
        .create_opportunity(manager, Duration::days(2), 2, Some(1))
        .await;

    let a = app.sign_in(alice).await;
    let b = app.sign_in(bob).await;
    let mut b_events = b.events();

    assert!(a.toggle_rsvp(opp).await.expect("rsvp"));
    a.flush().await.expect("flush");
    helpers::wait_for_opportunities(&mut b_events).await;

    let commits = app.store.commit_count().await;
    let err = b.toggle_rsvp(opp).await.expect_err("full");
    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(app.store.commit_count().await, commits);

    let snapshot = b.snapshot().await.expect("snapshot");
    assert!(snapshot.rsvps.is_empty());
    assert_eq!(
        snapshot.error(ErrorCategory::Rsvp).map(|e| e.kind),
        Some(ErrorKind::InvalidState)
    );

    let stored = app.opportunity(opp).await;
    assert_eq!(stored.attendee_ids.len(), 1);
    assert!(stored.is_attendee(alice));
    assert!(app.profile(alice).await.rsvp_ids.contains(&opp));
    assert!(app.profile(bob).await.rsvp_ids.is_empty());
}

#[tokio::test]
async fn test_rsvp_forbidden_once_started_or_ended() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let user = app.create_profile(UserRole::User, "Alice").await;
    let ongoing = app
        .create_opportunity(manager, Duration::hours(-1), 3, None)
        .await;
    let ended = app
        .create_opportunity(manager, Duration::hours(-5), 2, None)
        .await;

    let session = app.sign_in(user).await;
    let commits = app.store.commit_count().await;

    let err = session.toggle_rsvp(ongoing).await.expect_err("ongoing");
    assert_eq!(err.kind, ErrorKind::InvalidState);
    let err = session.toggle_rsvp(ended).await.expect_err("ended");
    assert_eq!(err.kind, ErrorKind::InvalidState);

    assert_eq!(app.store.commit_count().await, commits);
    assert!(app.opportunity(ongoing).await.attendee_ids.is_empty());
}

#[tokio::test]
async fn test_anonymous_can_favorite_but_not_rsvp() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;

    let guest = app.sign_in_anonymous().await;
    let err = guest.toggle_rsvp(opp).await.expect_err("anonymous rsvp");
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    assert!(guest.toggle_favorite(opp).await.expect("favorite"));
    guest.flush().await.expect("flush");

    let profile = app.profile(guest.identity_id()).await;
    assert_eq!(profile.role, UserRole::Anonymous);
    assert!(profile.favorite_ids.contains(&opp));
    assert!(app.opportunity(opp).await.attendee_ids.is_empty());
}

#[tokio::test]
async fn test_rsvp_then_cancel_updates_both_sides() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let user = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(3), 4, Some(10))
        .await;

    let session = app.sign_in(user).await;

    assert!(session.toggle_rsvp(opp).await.expect("add"));
    session.flush().await.expect("flush");
    assert!(app.opportunity(opp).await.is_attendee(user));
    assert!(app.profile(user).await.rsvp_ids.contains(&opp));

    assert!(!session.toggle_rsvp(opp).await.expect("remove"));
    session.flush().await.expect("flush");
    assert!(!app.opportunity(opp).await.is_attendee(user));
    assert!(app.profile(user).await.rsvp_ids.is_empty());
}

#[tokio::test]
async fn test_ended_session_rejects_commands() {
    let app = helpers::TestApp::new();
    let user = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(user, Duration::days(1), 1, None).await;

    let session = app.sign_in(user).await;
    session.shutdown().await;

    assert!(!session.is_active());
    let err = session.toggle_favorite(opp).await.expect_err("ended");
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}
