//! Integration tests for attendance, attendee removal, and the leaderboard.

mod helpers;

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use volhub_core::error::ErrorKind;
use volhub_core::events::{ChangeCause, SessionEvent};
use volhub_core::types::{
    Document, ErrorCategory, IdentityId, MembershipSet, OpportunityId, TimeWindow,
};
use volhub_entity::{AttendanceStatus, Opportunity, Profile, UserRole};

/// A finished opportunity with the given attendees already on it.
async fn past_opportunity(
    app: &helpers::TestApp,
    creator: IdentityId,
    ago: Duration,
    hours: i64,
    attendees: &[IdentityId],
) -> OpportunityId {
    let start = app.now() - ago;
    let opportunity = Opportunity {
        id: OpportunityId::new(),
        name: "Shelter shift".into(),
        location: "Harbor Rd".into(),
        description: String::new(),
        start,
        end: start + Duration::hours(hours),
        creator_id: creator,
        capacity: None,
        attendee_ids: attendees.iter().copied().collect::<BTreeSet<_>>(),
        attendance: BTreeMap::new(),
    };
    app.put_opportunity(&opportunity).await;
    opportunity.id
}

#[tokio::test]
async fn test_present_attendance_counts_on_leaderboard() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let bob = app.create_profile(UserRole::User, "Bob").await;
    let opp = past_opportunity(&app, manager, Duration::days(3), 2, &[alice, bob]).await;

    let session = app.sign_in(manager).await;
    let mut events = session.events();

    session
        .record_attendance(opp, alice, Some(AttendanceStatus::Present))
        .await
        .expect("present");
    helpers::wait_for_opportunities(&mut events).await;
    session
        .record_attendance(opp, bob, Some(AttendanceStatus::Absent))
        .await
        .expect("absent");
    helpers::wait_for_opportunities(&mut events).await;

    let stored = app.opportunity(opp).await;
    assert_eq!(stored.attendance.get(&alice), Some(&AttendanceStatus::Present));
    assert_eq!(stored.attendance.get(&bob), Some(&AttendanceStatus::Absent));

    let board = session
        .compute_leaderboard(TimeWindow::Month)
        .await
        .expect("leaderboard");
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].identity_id, alice);
    assert_eq!(board[0].display_name, "Alice");
    assert_eq!(board[0].rank, Some(1));
    assert!((board[0].hours - 2.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_clearing_attendance_removes_entry() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = past_opportunity(&app, manager, Duration::days(1), 3, &[alice]).await;

    let session = app.sign_in(manager).await;
    let mut events = session.events();

    session
        .record_attendance(opp, alice, Some(AttendanceStatus::Present))
        .await
        .expect("present");
    helpers::wait_for_opportunities(&mut events).await;
    session
        .record_attendance(opp, alice, None)
        .await
        .expect("clear");

    assert!(app.opportunity(opp).await.attendance.is_empty());
}

#[tokio::test]
async fn test_non_manager_cannot_record_attendance() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = past_opportunity(&app, manager, Duration::days(1), 2, &[alice]).await;

    let session = app.sign_in(alice).await;
    let err = session
        .record_attendance(opp, alice, Some(AttendanceStatus::Present))
        .await
        .expect_err("not a manager");
    assert_eq!(err.kind, ErrorKind::PermissionDenied);

    let snapshot = session.snapshot().await.expect("snapshot");
    assert!(snapshot.error(ErrorCategory::Attendance).is_some());
    assert!(app.opportunity(opp).await.attendance.is_empty());
}

#[tokio::test]
async fn test_attendance_requires_rsvp() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = past_opportunity(&app, manager, Duration::days(1), 2, &[]).await;

    let session = app.sign_in(manager).await;
    let err = session
        .record_attendance(opp, alice, Some(AttendanceStatus::Present))
        .await
        .expect_err("not attending");
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_manager_removal_clears_both_sides() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let opp = app
        .create_opportunity(manager, Duration::days(2), 3, Some(5))
        .await;

    let admin = app.sign_in(manager).await;
    let mut admin_events = admin.events();
    let user = app.sign_in(alice).await;
    let mut user_events = user.events();

    assert!(user.toggle_rsvp(opp).await.expect("rsvp"));
    user.flush().await.expect("flush");
    helpers::wait_for_opportunities(&mut admin_events).await;

    admin
        .record_attendance(opp, alice, Some(AttendanceStatus::Present))
        .await
        .expect("present");
    helpers::wait_for_opportunities(&mut admin_events).await;
    admin
        .manager_remove_attendee(opp, alice)
        .await
        .expect("remove");

    let stored = app.opportunity(opp).await;
    assert!(!stored.is_attendee(alice));
    assert!(stored.attendance.is_empty());
    assert!(app.profile(alice).await.rsvp_ids.is_empty());

    helpers::wait_for_event(&mut user_events, |e| {
        matches!(
            e,
            SessionEvent::MembershipChanged {
                set: MembershipSet::Rsvp,
                is_member: false,
                cause: ChangeCause::Authoritative,
                ..
            }
        )
    })
    .await;
    assert!(user.snapshot().await.expect("snapshot").rsvps.is_empty());
}

#[tokio::test]
async fn test_leaderboard_windows() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let alice = app.create_profile(UserRole::User, "Alice").await;
    let bob = app.create_profile(UserRole::User, "").await;
    let this_month = past_opportunity(&app, manager, Duration::days(2), 2, &[alice]).await;
    let last_month = past_opportunity(&app, manager, Duration::days(40), 5, &[bob]).await;

    let session = app.sign_in(manager).await;
    let mut events = session.events();
    session
        .record_attendance(this_month, alice, Some(AttendanceStatus::Present))
        .await
        .expect("present");
    helpers::wait_for_opportunities(&mut events).await;
    session
        .record_attendance(last_month, bob, Some(AttendanceStatus::Present))
        .await
        .expect("present");
    helpers::wait_for_opportunities(&mut events).await;

    let month = session.compute_leaderboard(TimeWindow::Month).await.expect("month");
    assert_eq!(month.len(), 1);
    assert_eq!(month[0].identity_id, alice);

    let year = session.compute_leaderboard(TimeWindow::Year).await.expect("year");
    assert_eq!(year.len(), 2);
    assert_eq!(year[0].identity_id, bob);
    assert!(year[0].display_name.starts_with("Volunteer "));
    assert_eq!(year[1].rank, Some(2));

    let snapshot = session.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.leaderboard.map(|(w, _)| w), Some(TimeWindow::Year));
}

#[tokio::test]
async fn test_recomputed_leaderboard_picks_up_new_profiles() {
    let app = helpers::TestApp::new();
    let manager = app.create_profile(UserRole::Manager, "Dana").await;
    let newcomer = IdentityId::new();
    let opp = past_opportunity(&app, manager, Duration::days(2), 3, &[newcomer]).await;

    let session = app.sign_in(manager).await;
    let mut events = session.events();
    let board = session
        .compute_leaderboard(TimeWindow::Month)
        .await
        .expect("leaderboard");
    assert!(board.is_empty());

    let profile = Profile::new(newcomer, UserRole::User, "Noor");
    app.store
        .put_documents([Document::new(profile.document_ref(), profile.to_fields())])
        .await;
    session
        .record_attendance(opp, newcomer, Some(AttendanceStatus::Present))
        .await
        .expect("present");

    loop {
        helpers::wait_for_event(&mut events, |e| {
            matches!(e, SessionEvent::LeaderboardUpdated { .. })
        })
        .await;
        let snapshot = session.snapshot().await.expect("snapshot");
        let Some((_, entries)) = snapshot.leaderboard else {
            continue;
        };
        if entries.first().is_some_and(|e| e.display_name == "Noor") {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].identity_id, newcomer);
            break;
        }
    }
}
