//! # File Store Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors raised while materializing or managing local media files.
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// Host filesystem, HTTP or blob-store bridge failure.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// External download answered with a non-success status.
    #[error("Download failed with HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Download timed out after {seconds}s: {target}")]
    Timeout { target: String, seconds: u64 },

    /// A remote path or URL that cannot be mapped to a local file.
    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Invalid file store configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FileStoreError>;
