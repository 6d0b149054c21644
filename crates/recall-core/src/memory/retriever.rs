//! Text retriever over a shared `VectorIndex`.
//!
//! `Retriever` binds an index, an embedder and retrieval defaults so callers
//! can go from a query string straight to ranked records, and can add
//! documents without handling embeddings themselves.

use std::sync::Arc;

use recall_types::config::RetrievalConfig;
use recall_types::error::{IndexError, RetrievalError};
use recall_types::vector::{Metadata, ScoredRecord, VectorRecord};
use tracing::{debug, info};

use crate::index::VectorIndex;

use super::box_embedder::BoxEmbedder;
use super::embedder::Embedder;

/// Callable that maps a query string to ranked records.
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: BoxEmbedder,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever over `index` using `embedder` for both documents
    /// and queries.
    pub fn new(index: Arc<VectorIndex>, embedder: BoxEmbedder, config: RetrievalConfig) -> Self {
        Self {
            index,
            embedder,
            config,
        }
    }

    /// Access the underlying index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Access the retrieval defaults.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Ranked records for `query` using the configured k, metric and threshold.
    #[tracing::instrument(
        name = "retrieve",
        skip(self, query),
        fields(
            k = self.config.default_k,
            metric = %self.config.default_metric,
            model = self.embedder.model_name(),
        )
    )]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredRecord>, RetrievalError> {
        let results = self
            .index
            .query_by_text(
                query,
                &self.embedder,
                self.config.default_k,
                self.config.default_metric,
                self.config.threshold,
            )
            .await?;
        debug!(returned = results.len(), "retrieved context");
        Ok(results)
    }

    /// Embed `content` and insert it as a new record. Returns the record id.
    pub async fn add_document(
        &self,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Result<String, RetrievalError> {
        let content = content.into();
        let embedding = self.embedder.embed(&content).await?;

        let mut record = VectorRecord::new(content, embedding);
        record.metadata = metadata;
        let id = record.id.clone();
        self.index.insert(record)?;
        Ok(id)
    }

    /// Embed and insert several documents in order.
    ///
    /// Stops at the first failure; documents inserted before it stay in the
    /// index. Returns the ids of the inserted records.
    pub async fn add_documents<I, S>(&self, contents: I) -> Result<Vec<String>, RetrievalError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = Vec::new();
        for content in contents {
            ids.push(self.add_document(content, Metadata::new()).await?);
        }
        info!(added = ids.len(), total = self.index.len(), "documents indexed");
        Ok(ids)
    }

    /// Fail fast if the embedder's declared dimension disagrees with the index.
    pub fn check_compatible(&self) -> Result<(), IndexError> {
        match self.index.dimensionality() {
            Some(expected) if expected != self.embedder.dimension() => {
                Err(IndexError::DimensionMismatch {
                    expected,
                    actual: self.embedder.dimension(),
                })
            }
            _ => Ok(()),
        }
    }
}
