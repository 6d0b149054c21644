//! Embedding collaborators and text retrieval.
//!
//! This module defines the `Embedder` trait that callers implement to turn
//! text into vectors, its type-erased `BoxEmbedder` wrapper, and the
//! `Retriever` that binds an embedder to a `VectorIndex`.

pub mod box_embedder;
pub mod embedder;
pub mod retriever;
