use bridge_traits::error::BridgeError;
use core_cache::FileStoreError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch remote {collection}: {source}")]
    RemoteFetch {
        collection: &'static str,
        #[source]
        source: BridgeError,
    },

    /// Admission rejection. The message is shown to users verbatim.
    #[error("Not enough storage space")]
    InsufficientStorage { required: u64, available: u64 },

    #[error("Local store error: {0}")]
    Library(#[from] LibraryError),

    #[error("Failed to persist sync results: {0}")]
    Persist(#[source] LibraryError),

    #[error("File store error: {0}")]
    FileStore(#[from] FileStoreError),

    #[error("Sync already in progress")]
    AlreadyRunning,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

impl SyncError {
    pub(crate) fn fetch(collection: &'static str) -> impl FnOnce(BridgeError) -> Self {
        move |source| SyncError::RemoteFetch { collection, source }
    }

    /// Whether this failure is the storage admission gate rather than an
    /// I/O or remote failure.
    pub fn is_storage_rejection(&self) -> bool {
        matches!(self, SyncError::InsufficientStorage { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_storage_message() {
        let err = SyncError::InsufficientStorage {
            required: 10,
            available: 0,
        };
        assert_eq!(err.to_string(), "Not enough storage space");
        assert!(err.is_storage_rejection());
    }

    #[test]
    fn test_fetch_error_names_collection() {
        let err = SyncError::fetch("mixes")(BridgeError::OperationFailed("offline".into()));
        assert_eq!(err.to_string(), "Failed to fetch remote mixes: Bridge operation failed: offline");
        assert!(!err.is_storage_rejection());
    }
}
