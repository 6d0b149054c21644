//! Infrastructure layer for Recall.
//!
//! Filesystem-facing pieces that `recall-core` deliberately leaves out:
//! JSON snapshot persistence for the history store and vector index, and
//! TOML configuration loading.

pub mod config;
pub mod snapshot;
