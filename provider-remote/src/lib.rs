//! # Remote Provider
//!
//! REST clients for the hosted backend the mix library syncs from.
//!
//! ## Overview
//!
//! This module provides:
//! - [`RestRowStore`]: mixes, tags, mix/tag pairs and saved views over a
//!   PostgREST-style row API
//! - [`RestBlobStore`]: upload, download and public URLs for stored media
//! - [`RestClient`]: API-key headers plus retry with exponential backoff on
//!   rate limiting and server errors
//!
//! Both stores implement the `bridge_traits` remote contracts, so the sync
//! engine never depends on this crate directly.

pub mod blob_store;
pub mod client;
pub mod error;
pub mod row_store;
pub mod types;

pub use blob_store::RestBlobStore;
pub use client::{RestClient, DEFAULT_MAX_ATTEMPTS};
pub use error::{RemoteError, Result};
pub use row_store::RestRowStore;
