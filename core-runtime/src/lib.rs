//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the mix core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for sync and library events
//!
//! Every other core crate depends on this one for its ambient concerns.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, RemoteEndpoint};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, LibraryEvent, SyncEvent, SyncSummary};
