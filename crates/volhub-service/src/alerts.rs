//! Transient, auto-expiring error messages per category.
//!
//! Each category holds at most one surfaced error. Surfacing bumps the
//! category's generation and hands back an [`ExpiryTicket`]; the owner
//! schedules the expiry and hands the ticket back when the delay elapses.
//! A ticket whose generation was superseded does nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use volhub_core::error::{AppError, ErrorKind};
use volhub_core::types::ErrorCategory;

/// An error currently shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacedError {
    pub kind: ErrorKind,
    pub message: String,
    pub surfaced_at: DateTime<Utc>,
}

/// Token identifying one surfaced error for later expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTicket {
    pub category: ErrorCategory,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct ErrorBoard {
    slots: BTreeMap<ErrorCategory, (u64, SurfacedError)>,
    generations: BTreeMap<ErrorCategory, u64>,
}

impl ErrorBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `error` under `category`, replacing whatever was there.
    pub fn surface(
        &mut self,
        category: ErrorCategory,
        error: &AppError,
        now: DateTime<Utc>,
    ) -> ExpiryTicket {
        let generation = self.generations.entry(category).or_insert(0);
        *generation += 1;
        let generation = *generation;

        self.slots.insert(
            category,
            (
                generation,
                SurfacedError {
                    kind: error.kind,
                    message: error.message.clone(),
                    surfaced_at: now,
                },
            ),
        );
        debug!(%category, generation, kind = %error.kind, "Error surfaced");

        ExpiryTicket {
            category,
            generation,
        }
    }

    /// Clear the error `ticket` refers to, unless a newer one replaced it.
    pub fn expire(&mut self, ticket: ExpiryTicket) -> bool {
        match self.slots.get(&ticket.category) {
            Some((generation, _)) if *generation == ticket.generation => {
                self.slots.remove(&ticket.category);
                true
            }
            _ => false,
        }
    }

    /// Clear `category` unconditionally. Returns whether anything was shown.
    pub fn clear(&mut self, category: ErrorCategory) -> bool {
        self.slots.remove(&category).is_some()
    }

    pub fn current(&self, category: ErrorCategory) -> Option<&SurfacedError> {
        self.slots.get(&category).map(|(_, error)| error)
    }

    /// Every currently surfaced error.
    pub fn all(&self) -> BTreeMap<ErrorCategory, SurfacedError> {
        self.slots
            .iter()
            .map(|(category, (_, error))| (*category, error.clone()))
            .collect()
    }

    pub fn clear_all(&mut self) {
        self.slots.clear();
    }
}
