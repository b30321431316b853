//! Session context carrying the signed-in identity and its current role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volhub_core::types::IdentityId;
use volhub_entity::UserRole;

/// An identity obtained from the external sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity id; also the profile document id.
    pub id: IdentityId,
    /// Whether the identity came from anonymous sign-in.
    pub anonymous: bool,
    /// Display name offered by the identity provider, if any.
    pub display_name: Option<String>,
}

impl Identity {
    /// A named, non-anonymous identity.
    pub fn named(id: IdentityId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            anonymous: false,
            display_name: Some(display_name.into()),
        }
    }

    /// An anonymous identity.
    pub fn anonymous(id: IdentityId) -> Self {
        Self {
            id,
            anonymous: true,
            display_name: None,
        }
    }

    /// Role assigned to a freshly created profile for this identity.
    pub fn initial_role(&self) -> UserRole {
        if self.anonymous {
            UserRole::Anonymous
        } else {
            UserRole::User
        }
    }
}

/// Context for the acting identity of a session.
///
/// Owned by the session coordinator and passed into the write builders so
/// every mutation knows *who* is acting and with which role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// The acting identity.
    pub identity: Identity,
    /// Role as last delivered by the profile listener.
    pub role: UserRole,
    /// Whether the session is still signed in.
    pub active: bool,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    /// Creates a context for a freshly started session.
    pub fn new(identity: Identity, role: UserRole, started_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            role,
            active: true,
            started_at,
        }
    }

    /// The acting identity id.
    pub fn identity_id(&self) -> IdentityId {
        self.identity.id
    }

    /// Returns whether the caller holds the manager role.
    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    /// Returns whether the caller acts anonymously.
    pub fn is_anonymous(&self) -> bool {
        self.identity.anonymous || self.role.is_anonymous()
    }
}
