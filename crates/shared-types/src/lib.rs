//! # Shared Types Crate
//!
//! Identifiers shared across the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: transport-level peer identity lives here so the
//!   reactor and the runtime agree on it without depending on each other.
//! - **No I/O**: plain data with serde derives.

pub mod entities;

pub use entities::*;
