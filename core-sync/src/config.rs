//! Sync engine configuration

/// Default flat size assumed for every pending media file (5 MiB).
pub const DEFAULT_PER_FILE_ESTIMATE_BYTES: u64 = 5 * 1024 * 1024;

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bytes assumed per pending media file in the admission estimate
    pub per_file_estimate_bytes: u64,

    /// Whether saved views are mirrored at the end of every pass
    pub sync_saved_views: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            per_file_estimate_bytes: DEFAULT_PER_FILE_ESTIMATE_BYTES,
            sync_saved_views: true,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_per_file_estimate(mut self, bytes: u64) -> Self {
        self.per_file_estimate_bytes = bytes;
        self
    }

    pub fn with_saved_views(mut self, enabled: bool) -> Self {
        self.sync_saved_views = enabled;
        self
    }
}
