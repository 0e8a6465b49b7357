//! Shared types for the vaultlock crates.
//!
//! Holds the configuration tree, the shared [`error::Error`] type, the
//! structured [`trace::TraceEvent`] log records, and the [`clock::Clock`]
//! seam used by the in-memory store.

pub mod clock;
pub mod config;
pub mod error;
pub mod trace;
