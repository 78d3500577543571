//! # Local Store
//!
//! Owns the on-device SQLite mirror of the remote mix library.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite schema, migrations and connection pooling
//! - Cached entities (`LocalMix`, `LocalTag`, `LocalMixTag`, `LocalSavedView`)
//! - One repository per entity
//! - [`LocalStore`], which applies a sync pass's changes in one transaction

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{LocalMix, LocalMixTag, LocalSavedView, LocalTag, MediaField, MediaPaths};
pub use store::{ChangeSet, CommitSummary, LocalStore};
