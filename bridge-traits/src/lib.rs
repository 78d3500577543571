//! # Host Bridge Traits
//!
//! Capability contracts between the mix core and the host it runs in.
//!
//! ## Overview
//!
//! The core never touches the network, the disk or the remote backend
//! directly. Each of those capabilities is a trait here with a concrete
//! adapter supplied by the host (`bridge-desktop` for desktop builds,
//! `provider-remote` for the hosted backend).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry and streaming downloads
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O and free-space queries
//! - [`BlobStore`](storage::BlobStore) - Remote object storage for uploaded media
//!
//! ### Remote Data
//! - [`MixRepository`](remote::MixRepository) - Canonical mix rows
//! - [`TagRepository`](remote::TagRepository) - Tags and mix/tag associations
//! - [`SavedViewRepository`](remote::SavedViewRepository) - Saved tag filters
//! - [`MediaUrlResolver`](remote::MediaUrlResolver) - Social link to direct media
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters convert
//! platform errors into it and keep the failing path or URL in the message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so adapters can be shared across tasks
//! behind an `Arc`.

pub mod error;
pub mod http;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use remote::{
    EmbedMetadata, MediaUrlResolver, Mix, MixRepository, MixTag, MixType, ResolveError,
    ResolvedMedia, SavedView, SavedViewRepository, Tag, TagRepository,
};
pub use storage::{BlobStore, FileMetadata, FileSystemAccess};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
