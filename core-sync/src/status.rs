//! # Sync Status State Machine
//!
//! Observable status of the sync engine with validated transitions.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Syncing → Downloading(current, total) → Completed
//!           ↓               ↓
//!           └──────────→ Failed(reason)
//! ```
//!
//! Terminal states (`Completed`, `Failed`) only move back to `Syncing` when
//! the next pass begins. There is no cancelled state.
//!
//! [`SyncStatusCell`] holds the current value behind a `tokio::sync::watch`
//! channel so callers can either poll [`SyncStatusCell::current`] or await
//! changes on a receiver.

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

/// The current status of the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SyncStatus {
    /// No pass has run yet
    #[default]
    Idle,
    /// Fetching and diffing remote state
    Syncing,
    /// Materializing media; `current` of `total` mixes processed
    Downloading { current: u64, total: u64 },
    /// The last pass committed successfully
    Completed,
    /// The last pass aborted
    Failed { reason: String },
}

impl SyncStatus {
    /// Check if a pass is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Syncing | SyncStatus::Downloading { .. })
    }

    /// Check if this status ends a pass
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Downloading { .. } => "downloading",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed { .. } => "failed",
        }
    }

    /// Validate a transition to `to`
    pub fn validate_transition(&self, to: &SyncStatus) -> Result<()> {
        let valid = match (self, to) {
            // A new pass
            (SyncStatus::Idle, SyncStatus::Syncing) => true,
            (SyncStatus::Completed, SyncStatus::Syncing) => true,
            (SyncStatus::Failed { .. }, SyncStatus::Syncing) => true,

            // From Syncing
            (SyncStatus::Syncing, SyncStatus::Downloading { .. }) => true,
            (SyncStatus::Syncing, SyncStatus::Completed) => true,
            (SyncStatus::Syncing, SyncStatus::Failed { .. }) => true,

            // Progress never moves backwards
            (
                SyncStatus::Downloading { current, total },
                SyncStatus::Downloading {
                    current: next,
                    total: next_total,
                },
            ) => next >= current && next_total == total,
            (SyncStatus::Downloading { .. }, SyncStatus::Completed) => true,
            (SyncStatus::Downloading { .. }, SyncStatus::Failed { .. }) => true,

            // Terminal states may rest at Idle
            (SyncStatus::Completed, SyncStatus::Idle) => true,
            (SyncStatus::Failed { .. }, SyncStatus::Idle) => true,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self, to),
            });
        }

        Ok(())
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Downloading { current, total } => {
                write!(f, "downloading({}/{})", current, total)
            }
            SyncStatus::Failed { reason } => write!(f, "failed({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Current-value cell with change notification for [`SyncStatus`].
#[derive(Debug)]
pub struct SyncStatusCell {
    tx: watch::Sender<SyncStatus>,
}

impl SyncStatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::Idle);
        Self { tx }
    }

    /// Snapshot of the current status
    pub fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// Atomically move a non-active cell to `Syncing`.
    ///
    /// Returns `false` when a pass is already in progress.
    pub fn try_begin(&self) -> bool {
        self.tx.send_if_modified(|status| {
            if status.is_active() {
                return false;
            }
            *status = SyncStatus::Syncing;
            true
        })
    }

    /// Apply a validated transition. Invalid transitions leave the cell
    /// unchanged.
    pub fn advance(&self, next: SyncStatus) -> Result<()> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|status| match status.validate_transition(&next) {
            Ok(()) => {
                *status = next;
                true
            }
            Err(e) => {
                warn!(error = %e, "Rejected sync status transition");
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    /// Return a terminal cell to `Idle`.
    pub fn reset(&self) -> Result<()> {
        if self.current() == SyncStatus::Idle {
            return Ok(());
        }
        self.advance(SyncStatus::Idle)
    }
}

impl Default for SyncStatusCell {
    fn default() -> Self {
        Self::new()
    }
}
