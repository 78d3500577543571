//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`). Host applications can depend on
//! `mix-workspace` and enable `desktop-shims` to get the sync engine wired with
//! the desktop HTTP and filesystem bridges without naming each crate.

#[cfg(feature = "desktop-shims")]
pub use core_service::{CoreService, CoreError};
