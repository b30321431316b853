//! Integration tests for optimistic toggles, atomic commits, and listeners.

mod helpers;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;

use volhub_core::error::ErrorKind;
use volhub_core::events::{ChangeCause, SessionEvent};
use volhub_core::traits::RemoteStore;
use volhub_core::types::{Document, ErrorCategory, MembershipSet, Write};
use volhub_entity::{AttendanceStatus, Profile, UserRole};
use volhub_realtime::{RecordingHost, Session};
use volhub_service::Identity;
use volhub_store::FaultPlan;

#[tokio::test]
async fn test_failed_commit_reverts_toggle() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;

    let session = app.sign_in(alice).await;
    let mut events = session.events();
    app.store.set_faults(FaultPlan::failing_commits(1)).await;

    assert!(session.toggle_rsvp(opp).await.expect("optimistic"));
    session.flush().await.expect("flush");

    let optimistic = helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::MembershipChanged { .. })
    })
    .await;
    assert!(matches!(
        optimistic,
        SessionEvent::MembershipChanged {
            is_member: true,
            cause: ChangeCause::Optimistic,
            ..
        }
    ));
    let reverted = helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::MembershipChanged { .. })
    })
    .await;
    assert!(matches!(
        reverted,
        SessionEvent::MembershipChanged {
            set: MembershipSet::Rsvp,
            is_member: false,
            cause: ChangeCause::Reverted,
            ..
        }
    ));

    let snapshot = session.snapshot().await.expect("snapshot");
    assert!(snapshot.rsvps.is_empty());
    assert_eq!(snapshot.pending_toggles, 0);
    assert_eq!(
        snapshot.error(ErrorCategory::Rsvp).map(|e| e.kind),
        Some(ErrorKind::StoreCommitFailed)
    );
    assert!(app.opportunity(opp).await.attendee_ids.is_empty());
    assert!(app.profile(alice).await.rsvp_ids.is_empty());
}

#[tokio::test]
async fn test_successful_commit_confirms_and_clears_error() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(alice, Duration::days(1), 2, None).await;

    let session = app.sign_in(alice).await;
    let mut events = session.events();

    app.store.set_faults(FaultPlan::failing_commits(1)).await;
    session.toggle_favorite(opp).await.expect("first");
    session.flush().await.expect("flush");
    assert!(session
        .snapshot()
        .await
        .expect("snapshot")
        .error(ErrorCategory::General)
        .is_some());

    assert!(session.toggle_favorite(opp).await.expect("second"));
    session.flush().await.expect("flush");
    helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::ToggleConfirmed { .. })
    })
    .await;

    let snapshot = session.snapshot().await.expect("snapshot");
    assert!(snapshot.favorites.contains(&opp));
    assert!(snapshot.error(ErrorCategory::General).is_none());
    assert!(app.profile(alice).await.favorite_ids.contains(&opp));
}

#[tokio::test]
async fn test_partial_commit_leaves_no_writes() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, Some(3))
        .await;

    let session = app.sign_in(alice).await;
    let commits = app.store.commit_count().await;
    app.store.set_faults(FaultPlan::fail_after_writes(1)).await;

    session.toggle_rsvp(opp).await.expect("optimistic");
    session.flush().await.expect("flush");

    assert_eq!(app.store.commit_count().await, commits);
    assert!(app.opportunity(opp).await.attendee_ids.is_empty());
    assert!(app.profile(alice).await.rsvp_ids.is_empty());
    assert!(session.snapshot().await.expect("snapshot").rsvps.is_empty());
}

#[tokio::test]
async fn test_concurrent_rsvps_race_for_last_spot() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let bob = app.create_profile(UserRole::User, "Bob").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, Some(1))
        .await;

    let a = app.sign_in(alice).await;
    let b = app.sign_in(bob).await;

    app.store.hold_commits();
    assert!(a.toggle_rsvp(opp).await.expect("a optimistic"));
    assert!(b.toggle_rsvp(opp).await.expect("b optimistic"));
    app.wait_for_parked(2).await;
    app.store.release_commits();

    a.flush().await.expect("flush a");
    b.flush().await.expect("flush b");

    let stored = app.opportunity(opp).await;
    assert_eq!(stored.attendee_ids.len(), 1);

    let mut rejected = 0;
    for (session, id) in [(&a, alice), (&b, bob)] {
        let snapshot = session.snapshot().await.expect("snapshot");
        let won = stored.is_attendee(id);
        assert_eq!(snapshot.rsvps.contains(&opp), won);
        assert_eq!(app.profile(id).await.rsvp_ids.contains(&opp), won);
        if let Some(err) = snapshot.error(ErrorCategory::Rsvp) {
            assert!(!won);
            assert_eq!(err.kind, ErrorKind::StoreCommitFailed);
            rejected += 1;
        }
    }
    assert_eq!(rejected, 1);
}

#[tokio::test]
async fn test_rapid_toggles_commit_in_order() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(alice, Duration::days(1), 2, None).await;

    let session = app.sign_in(alice).await;
    let commits = app.store.commit_count().await;

    app.store.hold_commits();
    assert!(session.toggle_favorite(opp).await.expect("add"));
    assert!(!session.toggle_favorite(opp).await.expect("remove"));
    assert!(session.toggle_favorite(opp).await.expect("add again"));
    app.wait_for_parked(1).await;
    assert_eq!(
        session.snapshot().await.expect("snapshot").pending_toggles,
        3
    );
    app.store.release_commits();
    session.flush().await.expect("flush");

    assert_eq!(app.store.commit_count().await, commits + 3);
    assert!(app.profile(alice).await.favorite_ids.contains(&opp));
    assert_eq!(
        session.snapshot().await.expect("snapshot").pending_toggles,
        0
    );
}

#[tokio::test]
async fn test_repeated_snapshot_changes_nothing() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app.create_opportunity(alice, Duration::days(1), 2, None).await;
    let other = app.create_opportunity(alice, Duration::days(2), 2, None).await;

    let session = app.sign_in(alice).await;
    let mut events = session.events();

    let mut profile = app.profile(alice).await;
    profile.rsvp_ids.insert(opp);
    let doc = Document::new(profile.document_ref(), profile.to_fields());
    app.store.put_documents([doc.clone()]).await;
    helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::MembershipChanged { member, .. } if *member == opp)
    })
    .await;

    app.store.put_documents([doc]).await;
    profile.favorite_ids.insert(other);
    app.store
        .put_documents([Document::new(profile.document_ref(), profile.to_fields())])
        .await;

    let next = helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::MembershipChanged { .. })
    })
    .await;
    assert!(matches!(
        next,
        SessionEvent::MembershipChanged {
            set: MembershipSet::Favorites,
            cause: ChangeCause::Authoritative,
            ..
        }
    ));

    let snapshot = session.snapshot().await.expect("snapshot");
    assert!(snapshot.rsvps.contains(&opp));
    assert!(snapshot.favorites.contains(&other));
}

#[tokio::test]
async fn test_profile_listener_failure_degrades_role() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;

    let session = app.sign_in(manager).await;
    let mut events = session.events();
    app.store.break_subscriptions("users").await;

    helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::RoleChanged { role } if role == "anonymous")
    })
    .await;

    let err = session
        .record_attendance(opp, alice, Some(AttendanceStatus::Present))
        .await
        .expect_err("degraded");
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_opportunity_listener_failure_keeps_last_list() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    app.create_opportunity(alice, Duration::days(1), 2, None).await;

    let session = app.sign_in(alice).await;
    let mut events = session.events();
    app.store.break_subscriptions("opportunities").await;

    helpers::wait_for_event(&mut events, |e| {
        matches!(
            e,
            SessionEvent::ErrorSurfaced {
                category: ErrorCategory::General,
                ..
            }
        )
    })
    .await;

    let snapshot = session.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.opportunities.len(), 1);
    assert_eq!(
        snapshot.error(ErrorCategory::General).map(|e| e.kind),
        Some(ErrorKind::Subscription)
    );
}

#[tokio::test]
async fn test_start_fails_when_subscriptions_rejected() {
    let app = helpers::TestApp::new();
    let alice = app.create_profile(UserRole::User, "Alice").await;
    app.store
        .set_faults(FaultPlan {
            reject_subscriptions: true,
            ..FaultPlan::none()
        })
        .await;

    let err = Session::start(
        app.store.clone(),
        Identity::named(alice, "Alice"),
        app.config.clone(),
        Arc::new(RecordingHost::new()),
        app.clock.clone(),
    )
    .await
    .expect_err("rejected");
    assert_eq!(err.kind, ErrorKind::Subscription);
}

#[tokio::test]
async fn test_first_sign_in_creates_profile() {
    let app = helpers::TestApp::new();
    let identity = Identity::named(volhub_core::types::IdentityId::new(), "Riley");
    let id = identity.id;

    let session = app.start(identity).await;
    let profile: Profile = app.profile(id).await;
    assert_eq!(profile.role, UserRole::User);
    assert_eq!(profile.display_name, "Riley");
    assert_eq!(session.snapshot().await.expect("snapshot").role, UserRole::User);
}

#[tokio::test(start_paused = true)]
async fn test_surfaced_error_expires_unless_superseded() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;
    assert_eq!(app.config.sync.error_display_seconds, 4);

    let guest = app.sign_in_anonymous().await;
    let mut events = guest.events();

    guest.toggle_rsvp(opp).await.expect_err("anonymous rsvp");
    tokio::time::sleep(StdDuration::from_secs(3)).await;
    guest.toggle_rsvp(opp).await.expect_err("anonymous rsvp again");

    // The first timer fires at 4s and must not clear the newer error.
    tokio::time::sleep(StdDuration::from_millis(1500)).await;
    let snapshot = guest.snapshot().await.expect("snapshot");
    assert_eq!(
        snapshot.error(ErrorCategory::Rsvp).map(|e| e.kind),
        Some(ErrorKind::PermissionDenied)
    );
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SessionEvent::ErrorCleared { .. }));
    }

    tokio::time::sleep(StdDuration::from_secs(3)).await;
    helpers::wait_for_event(&mut events, |e| {
        matches!(
            e,
            SessionEvent::ErrorCleared {
                category: ErrorCategory::Rsvp
            }
        )
    })
    .await;
    let snapshot = guest.snapshot().await.expect("snapshot");
    assert!(snapshot.error(ErrorCategory::Rsvp).is_none());
}

#[tokio::test]
async fn test_deleted_profile_deactivates_identity() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(1), 2, None)
        .await;

    let session = app.sign_in(alice).await;
    let mut events = session.events();
    app.store
        .commit_atomic(vec![Write::DeleteDocument {
            document: Profile::reference(alice),
        }])
        .await
        .expect("delete profile");
    helpers::wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::RoleChanged { role } if role == "anonymous")
    })
    .await;

    let err = session.toggle_favorite(opp).await.expect_err("inactive");
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert!(err.message.contains("No active identity"));
    assert!(session.snapshot().await.expect("snapshot").favorites.is_empty());
}
