//! Shared domain types for Recall.
//!
//! This crate contains the core domain types used across the Recall crates:
//! conversation turns and sessions, vector records and similarity metrics,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod vector;
