//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for the local mirror tables.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - Connection-level helpers (`*_on`) let [`crate::store::LocalStore`]
//!   compose several writes inside one transaction
//!
//! ## Available Repositories
//!
//! - `LocalMixRepository` - Cached mixes with their local media paths
//! - `LocalTagRepository` - Cached tags
//! - `LocalMixTagRepository` - Mix/tag associations
//! - `LocalSavedViewRepository` - Saved tag filters

pub mod mix;
pub mod mix_tag;
pub mod saved_view;
pub mod tag;

pub use mix::{LocalMixRepository, SqliteLocalMixRepository};
pub use mix_tag::{LocalMixTagRepository, SqliteLocalMixTagRepository};
pub use saved_view::{LocalSavedViewRepository, SqliteLocalSavedViewRepository};
pub use tag::{LocalTagRepository, SqliteLocalTagRepository};
