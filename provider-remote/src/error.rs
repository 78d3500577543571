//! Error types for the remote REST provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Remote REST provider errors
#[derive(Error, Debug)]
pub enum RemoteError {
    /// API request returned a non-retryable error status
    #[error("Remote API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// Rate limit or server errors persisted through every retry
    #[error("Remote request failed after {attempts} attempts (status {status_code})")]
    RetriesExhausted { attempts: u32, status_code: u16 },

    /// A row addressed by id does not exist
    #[error("{collection} row not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for remote provider operations
pub type Result<T> = std::result::Result<T, RemoteError>;

impl From<RemoteError> for BridgeError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::NotFound { collection, id } => {
                BridgeError::NotFound(format!("{}/{}", collection, id))
            }
            RemoteError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RemoteError::Api {
            status_code: 400,
            message: "bad filter".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Remote API error (status 400): bad filter"
        );
    }

    #[test]
    fn test_not_found_maps_to_bridge_not_found() {
        let error = RemoteError::NotFound {
            collection: "mixes",
            id: "m1".to_string(),
        };
        let bridge_error: BridgeError = error.into();

        assert!(matches!(bridge_error, BridgeError::NotFound(ref what) if what == "mixes/m1"));
    }

    #[test]
    fn test_api_error_maps_to_operation_failed() {
        let bridge_error: BridgeError = RemoteError::RetriesExhausted {
            attempts: 3,
            status_code: 503,
        }
        .into();

        assert!(matches!(bridge_error, BridgeError::OperationFailed(_)));
    }
}
