//! Port for the external embedding model.
//!
//! Recall never computes embeddings itself. Callers wrap whatever model they
//! use and hand it to `VectorIndex::query_by_text` or a `Retriever`.

use recall_types::error::EmbedError;

/// Maps a piece of text to a fixed-length vector.
///
/// Every call on one embedder must return vectors of `dimension()` length;
/// the index rejects anything else with `DimensionMismatch`.
pub trait Embedder: Send + Sync {
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbedError>> + Send;

    /// Identifier of the underlying model, used in log fields.
    fn model_name(&self) -> &str;

    /// Length of every vector `embed` returns.
    fn dimension(&self) -> usize;
}
