//! Storage admission check.
//!
//! Before a pass downloads anything it estimates the bytes it may need as
//! `pending files × per-file estimate` and compares that against the file
//! store's headroom. A failed headroom query counts as zero headroom.

use crate::{Result, SyncError};
use core_cache::MediaFileStore;
use tracing::{debug, warn};

/// Estimated storage cost of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPlan {
    pub pending_files: u64,
    pub estimated_bytes: u64,
}

impl AdmissionPlan {
    pub fn new(pending_files: u64, per_file_estimate: u64) -> Self {
        Self {
            pending_files,
            estimated_bytes: pending_files.saturating_mul(per_file_estimate),
        }
    }

    /// Admit iff the estimate fits in `headroom`. Nothing to download is
    /// always admitted.
    pub fn admits(&self, headroom: u64) -> bool {
        self.estimated_bytes == 0 || self.estimated_bytes <= headroom
    }

    /// Query headroom and reject with [`SyncError::InsufficientStorage`]
    /// when the estimate does not fit.
    pub async fn check(&self, file_store: &MediaFileStore) -> Result<()> {
        if self.estimated_bytes == 0 {
            debug!("Nothing to download; admission check skipped");
            return Ok(());
        }

        let headroom = file_store.available_headroom().await;
        if !self.admits(headroom) {
            warn!(
                pending_files = self.pending_files,
                required = self.estimated_bytes,
                available = headroom,
                "Sync pass rejected by storage admission check"
            );
            return Err(SyncError::InsufficientStorage {
                required: self.estimated_bytes,
                available: headroom,
            });
        }

        debug!(
            required = self.estimated_bytes,
            available = headroom,
            "Sync pass admitted"
        );
        Ok(())
    }
}
