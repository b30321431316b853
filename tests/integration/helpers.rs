//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::broadcast;

use volhub_core::config::AppConfig;
use volhub_core::events::SessionEvent;
use volhub_core::traits::{Clock, ManualClock};
use volhub_core::types::{Document, IdentityId, OpportunityId};
use volhub_entity::{Opportunity, Profile, UserRole};
use volhub_realtime::{RecordingHost, Session};
use volhub_service::Identity;
use volhub_store::MemoryStore;

/// Test application context
pub struct TestApp {
    /// The shared in-memory store
    pub store: Arc<MemoryStore>,
    /// Clock every session reads
    pub clock: Arc<ManualClock>,
    /// Presentation host shared by every session
    pub host: Arc<RecordingHost>,
    /// Application config
    pub config: Arc<AppConfig>,
}

impl TestApp {
    /// Create a new test application with the clock at mid-June 2024, noon UTC.
    pub fn new() -> Self {
        let config = AppConfig::default();
        let start = Utc
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .single()
            .expect("valid date");
        Self {
            store: Arc::new(MemoryStore::new(&config.store)),
            clock: Arc::new(ManualClock::new(start)),
            host: Arc::new(RecordingHost::new()),
            config: Arc::new(config),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Seed a profile document.
    pub async fn create_profile(&self, role: UserRole, name: &str) -> IdentityId {
        let profile = Profile::new(IdentityId::new(), role, name);
        self.store
            .put_documents([Document::new(profile.document_ref(), profile.to_fields())])
            .await;
        profile.id
    }

    /// Seed an opportunity starting `starts_in` from now and lasting `hours`.
    pub async fn create_opportunity(
        &self,
        creator: IdentityId,
        starts_in: Duration,
        hours: i64,
        capacity: Option<u32>,
    ) -> OpportunityId {
        let start = self.now() + starts_in;
        let opportunity = Opportunity {
            id: OpportunityId::new(),
            name: "Community garden".into(),
            location: "Plot 7".into(),
            description: String::new(),
            start,
            end: start + Duration::hours(hours),
            creator_id: creator,
            capacity,
            attendee_ids: BTreeSet::new(),
            attendance: BTreeMap::new(),
        };
        self.put_opportunity(&opportunity).await;
        opportunity.id
    }

    /// Write an opportunity document as-is.
    pub async fn put_opportunity(&self, opportunity: &Opportunity) {
        let fields = opportunity.to_fields().expect("encode opportunity");
        self.store
            .put_documents([Document::new(opportunity.document_ref(), fields)])
            .await;
    }

    /// Start a session for a seeded, non-anonymous identity.
    pub async fn sign_in(&self, id: IdentityId) -> Session {
        self.start(Identity {
            id,
            anonymous: false,
            display_name: None,
        })
        .await
    }

    /// Start a session for a fresh anonymous identity.
    pub async fn sign_in_anonymous(&self) -> Session {
        self.start(Identity::anonymous(IdentityId::new())).await
    }

    pub async fn start(&self, identity: Identity) -> Session {
        Session::start(
            self.store.clone(),
            identity,
            self.config.clone(),
            self.host.clone(),
            self.clock.clone(),
        )
        .await
        .expect("session start")
    }

    /// Committed opportunity, read straight from the store.
    pub async fn opportunity(&self, id: OpportunityId) -> Opportunity {
        let doc = self
            .store
            .document(&Opportunity::reference(id))
            .await
            .expect("opportunity document");
        Opportunity::from_document(&doc).expect("decode opportunity")
    }

    /// Committed profile, read straight from the store.
    pub async fn profile(&self, id: IdentityId) -> Profile {
        let doc = self
            .store
            .document(&Profile::reference(id))
            .await
            .expect("profile document");
        Profile::from_document(&doc).expect("decode profile")
    }

    /// Wait until `count` commits are parked behind a hold.
    pub async fn wait_for_parked(&self, count: usize) {
        tokio::time::timeout(StdDuration::from_secs(5), async {
            while self.store.parked_commits() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("commits parked");
    }
}

/// Receive events until one matches.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<SessionEvent>,
    matches: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("expected event")
}

/// Wait until a session has applied a new opportunities delivery.
pub async fn wait_for_opportunities(events: &mut broadcast::Receiver<SessionEvent>) {
    wait_for_event(events, |e| {
        matches!(e, SessionEvent::OpportunitiesReplaced { .. })
    })
    .await;
}
