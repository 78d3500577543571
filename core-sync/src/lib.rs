//! # Mix Sync
//!
//! Keeps the local mix cache in line with the remote library.
//!
//! ## Overview
//!
//! One [`SyncEngine::sync`] call runs a full reconciliation pass:
//! - Mirrors remote mixes into the local store, deleting what disappeared
//! - Downloads every applicable media file so mixes render offline
//! - Refuses passes whose estimated download size exceeds free disk space
//! - Mirrors tags, mix/tag associations and saved views
//! - Publishes progress through a watchable [`SyncStatus`]
//!
//! ## Components
//!
//! - **Engine** (`engine`): The pass itself
//! - **Status** (`status`): Status state machine and its shared cell
//! - **Admission** (`admission`): Pre-download storage estimate
//! - **Media** (`media`): Per-field download and cleanup policy
//! - **Reconcile** (`reconcile`): Tag, association and saved-view diffs

pub mod admission;
pub mod config;
pub mod engine;
pub mod error;
pub mod media;
pub mod reconcile;
pub mod status;

pub use admission::AdmissionPlan;
pub use config::{SyncConfig, DEFAULT_PER_FILE_ESTIMATE_BYTES};
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use media::MediaReport;
pub use reconcile::{MirrorPlan, TagReconciler};
pub use status::{SyncStatus, SyncStatusCell};
