//! Session-scoped conversation history.
//!
//! This module defines `SessionHistoryStore`, the process-wide mapping from
//! session key to an append-only transcript with count-bounded windowing.

pub mod store;

pub use store::SessionHistoryStore;
