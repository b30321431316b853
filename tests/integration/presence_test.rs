//! Integration tests for RSVP-driven presentations.

mod helpers;

use chrono::Duration;

use volhub_core::events::SessionEvent;
use volhub_entity::{OpportunityDraft, UserRole};
use volhub_realtime::presence::HostCall;
use volhub_realtime::{PresenceState, SessionManager};
use volhub_service::Identity;

fn ended_presentation(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::PresenceChanged { state, .. } if state == "inactive")
}

#[tokio::test]
async fn test_rsvp_starts_presentation_and_clock_drives_it() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(alice, Duration::hours(2), 2, None).await;

    let session = app.sign_in(alice).await;
    session.toggle_rsvp(opp).await.expect("rsvp");
    assert_eq!(app.host.shown(opp), Some(PresenceState::Upcoming));

    app.clock.advance(Duration::minutes(100));
    session.refresh_presence().await.expect("refresh");
    assert_eq!(app.host.shown(opp), Some(PresenceState::StartingSoon));

    app.clock.advance(Duration::minutes(30));
    session.refresh_presence().await.expect("refresh");
    assert_eq!(app.host.shown(opp), Some(PresenceState::Ongoing));

    app.clock.advance(Duration::hours(3));
    session.refresh_presence().await.expect("refresh");
    assert_eq!(app.host.shown(opp), None);
    assert_eq!(
        app.host.calls().last(),
        Some(&HostCall::End(opp, PresenceState::Ended))
    );

    // An ended opportunity never comes back.
    session.refresh_presence().await.expect("refresh");
    assert_eq!(app.host.shown_count(), 0);
}

#[tokio::test]
async fn test_cancelling_rsvp_ends_presentation() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(alice, Duration::days(1), 2, None).await;

    let session = app.sign_in(alice).await;
    session.toggle_rsvp(opp).await.expect("rsvp");
    session.flush().await.expect("flush");
    assert!(app.host.shown(opp).is_some());

    session.toggle_rsvp(opp).await.expect("cancel");
    session.flush().await.expect("flush");
    assert_eq!(app.host.shown(opp), None);
    assert_eq!(
        app.host.calls().last(),
        Some(&HostCall::End(opp, PresenceState::Inactive))
    );
}

#[tokio::test]
async fn test_failed_rsvp_removes_presentation() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(alice, Duration::days(1), 2, None).await;

    let session = app.sign_in(alice).await;
    app.store
        .set_faults(volhub_store::FaultPlan::failing_commits(1))
        .await;
    session.toggle_rsvp(opp).await.expect("optimistic");
    session.flush().await.expect("flush");

    assert_eq!(app.host.shown_count(), 0);
    assert_eq!(app.host.calls().len(), 2);
}

#[tokio::test]
async fn test_edit_restarts_presentation() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;

    let admin = app.sign_in(manager).await;
    let user = app.sign_in(alice).await;
    user.toggle_rsvp(opp).await.expect("rsvp");
    user.flush().await.expect("flush");
    let mut events = user.events();

    let mut draft = OpportunityDraft::from_opportunity(&app.opportunity(opp).await);
    draft.name = "Community garden (moved)".into();
    draft.location = "Plot 12".into();
    admin.update_opportunity(opp, draft).await.expect("update");

    helpers::wait_for_event(&mut events, ended_presentation).await;
    user.snapshot().await.expect("snapshot");

    let calls = app.host.calls();
    let tail = &calls[calls.len() - 2..];
    assert_eq!(tail[0], HostCall::End(opp, PresenceState::Inactive));
    assert_eq!(
        tail[1],
        HostCall::Start(opp, "Community garden (moved)".into(), PresenceState::Upcoming)
    );
    assert_eq!(app.host.shown_count(), 1);
}

#[tokio::test]
async fn test_deleting_opportunity_ends_presentation() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;

    let admin = app.sign_in(manager).await;
    let user = app.sign_in(alice).await;
    user.toggle_rsvp(opp).await.expect("rsvp");
    user.flush().await.expect("flush");
    let mut events = user.events();

    admin.delete_opportunity(opp).await.expect("delete");
    helpers::wait_for_event(&mut events, ended_presentation).await;

    assert_eq!(app.host.shown(opp), None);
    assert!(app.store.document(&volhub_entity::Opportunity::reference(opp)).await.is_none());
    assert!(app.profile(alice).await.rsvp_ids.is_empty());
}

#[tokio::test]
async fn test_shutdown_ends_every_presentation() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let first = app.create_opportunity(alice, Duration::days(1), 2, None).await;
    let second = app.create_opportunity(alice, Duration::days(2), 2, None).await;

    let session = app.sign_in(alice).await;
    session.toggle_rsvp(first).await.expect("rsvp");
    session.toggle_rsvp(second).await.expect("rsvp");
    session.flush().await.expect("flush");
    assert_eq!(app.host.shown_count(), 2);

    session.shutdown().await;
    assert_eq!(app.host.shown_count(), 0);
}

#[tokio::test]
async fn test_identity_switch_tears_down_previous_session() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let bob = app.create_profile(UserRole::User, "Bob").await;
    let opp = app.create_opportunity(alice, Duration::days(1), 2, None).await;

    let manager = SessionManager::new(
        app.store.clone(),
        app.config.clone(),
        app.host.clone(),
        app.clock.clone(),
    );

    let first = manager
        .switch_identity(Identity::named(alice, "Alice"))
        .await
        .expect("alice");
    first.toggle_rsvp(opp).await.expect("rsvp");
    first.flush().await.expect("flush");
    assert_eq!(app.host.shown_count(), 1);

    let second = manager
        .switch_identity(Identity::named(bob, "Bob"))
        .await
        .expect("bob");
    assert!(!first.is_active());
    assert_eq!(app.host.shown_count(), 0);

    let snapshot = second.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.identity_id, bob);
    assert!(snapshot.rsvps.is_empty());

    manager.sign_out().await;
    assert!(!second.is_active());
}
