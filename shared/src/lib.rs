//! # Shared Module for the Status List Service
//!
//! This crate provides the common types, errors, constants and configuration
//! used by the status service and the benchmark tooling.
//!
//! ## Model
//!
//! A status list is a fixed-length bitstring published as an immutable
//! resource in a registry. Every mutation publishes a new version that
//! links back to its predecessor, so a list is a chain of versions whose
//! head is the current state:
//!
//! | Purpose | Actions | Bit set means |
//! |---------|---------|---------------|
//! | revocation | revoke | revoked, permanently |
//! | suspension | suspend, reinstate | suspended |

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use constants::*;
pub use error::*;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
