//! Conversation history, vector retrieval and collaborator traits for Recall.
//!
//! This crate defines the two in-memory primitives (`SessionHistoryStore`,
//! `VectorIndex`) and the "ports" through which external chat and embedding
//! models are plugged in. It depends only on `recall-types` -- never on
//! `recall-infra` or any IO crate.

pub mod chat;
pub mod history;
pub mod index;
pub mod llm;
pub mod memory;
