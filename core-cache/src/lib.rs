//! # Local File Store
//!
//! On-device storage for media downloaded from the remote library.
//!
//! Files live under a private media root and are addressed by relative paths
//! that the local store records on each mix. See [`MediaFileStore`].

pub mod config;
pub mod error;
pub mod paths;
pub mod store;

pub use config::{FileStoreConfig, DEFAULT_SAFETY_MARGIN_BYTES};
pub use error::{FileStoreError, Result};
pub use store::MediaFileStore;
