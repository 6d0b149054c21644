//! In-memory vector index with exhaustive k-nearest-neighbor search.
//!
//! Records live in a `Vec` behind a reader-writer lock: inserts take the
//! write lock (exclusive with each other and with queries) while queries
//! share the read lock. A record is validated completely before it is
//! pushed, so a concurrent query never sees a partial insert.
//!
//! Ties between equal scores are broken by insertion order, which falls out
//! of scanning the `Vec` front to back and sorting stably.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use recall_types::error::{ArgumentError, IndexError, RetrievalError};
use recall_types::vector::{IndexSnapshot, Metadata, Metric, ScoredRecord, VectorRecord};
use tracing::{debug, info, warn};

use crate::memory::embedder::Embedder;

use super::metric;

#[derive(Debug, Default)]
struct IndexState {
    /// Fixed by the first insert unless preset with `with_dimensionality`.
    dimensionality: Option<usize>,
    records: Vec<VectorRecord>,
}

impl IndexState {
    /// Validate a stored embedding: non-empty and of the index dimensionality.
    fn check_record_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual == 0 {
            return Err(ArgumentError::EmptyEmbedding.into());
        }
        self.check_dimension(actual)
    }

    fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        match self.dimensionality {
            Some(expected) if expected != actual => {
                Err(IndexError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

/// Brute-force vector index over records of a single dimensionality.
#[derive(Debug, Default)]
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an empty index whose dimensionality is set by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index that only accepts `dimensionality`-length vectors.
    pub fn with_dimensionality(dimensionality: usize) -> Self {
        Self {
            state: RwLock::new(IndexState {
                dimensionality: Some(dimensionality),
                records: Vec::new(),
            }),
        }
    }

    // Every write mutates state as its last step, so a poisoned lock never
    // guards a half-applied change.
    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("vector index lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("vector index lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Add a record to the index.
    ///
    /// The first insert fixes the index dimensionality. Fails with
    /// `DimensionMismatch` if the embedding length disagrees, or
    /// `DuplicateId` if a record with the same id is already stored; in both
    /// cases the index is unchanged.
    pub fn insert(&self, record: VectorRecord) -> Result<(), IndexError> {
        let mut state = self.write();
        state.check_record_dimension(record.dimension())?;
        if state.position(&record.id).is_some() {
            return Err(IndexError::DuplicateId(record.id));
        }

        state.dimensionality.get_or_insert(record.dimension());
        debug!(id = %record.id, len = state.records.len() + 1, "inserted record");
        state.records.push(record);
        Ok(())
    }

    /// The `k` records closest to `query_embedding` under `metric`.
    ///
    /// Similarity metrics rank descending, distance metrics ascending; equal
    /// scores keep insertion order. When `threshold` is given, records on the
    /// wrong side of it are dropped before truncating to `k`.
    ///
    /// An empty index or `k == 0` yields an empty result. A query vector of
    /// the wrong length fails with `DimensionMismatch`.
    pub fn query(
        &self,
        query_embedding: &[f32],
        k: usize,
        metric: Metric,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredRecord>, IndexError> {
        self.search(query_embedding, k, metric, threshold, None)
    }

    /// Like [`query`](Self::query), restricted to records whose metadata
    /// contains every key/value pair in `filter`.
    pub fn query_filtered(
        &self,
        query_embedding: &[f32],
        k: usize,
        metric: Metric,
        threshold: Option<f32>,
        filter: &Metadata,
    ) -> Result<Vec<ScoredRecord>, IndexError> {
        self.search(query_embedding, k, metric, threshold, Some(filter))
    }

    /// Embed `query_text` with the supplied embedder, then run [`query`](Self::query).
    ///
    /// The lock is not held while the embedder runs.
    pub async fn query_by_text<E: Embedder>(
        &self,
        query_text: &str,
        embedder: &E,
        k: usize,
        metric: Metric,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredRecord>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = embedder.embed(query_text).await?;
        Ok(self.query(&embedding, k, metric, threshold)?)
    }

    fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        metric: Metric,
        threshold: Option<f32>,
        filter: Option<&Metadata>,
    ) -> Result<Vec<ScoredRecord>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let state = self.read();
        if state.records.is_empty() {
            return Ok(Vec::new());
        }
        state.check_dimension(query_embedding.len())?;

        let mut scored: Vec<(usize, f32)> = state
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| filter.is_none_or(|f| matches_filter(&record.metadata, f)))
            .map(|(i, record)| (i, metric::score(metric, query_embedding, &record.embedding)))
            .filter(|(_, score)| threshold.is_none_or(|t| metric::within_threshold(metric, *score, t)))
            .collect();

        // Stable sort: equal scores stay in insertion order.
        scored.sort_by(|a, b| metric::best_first(metric, a.1, b.1));
        scored.truncate(k);

        let results: Vec<ScoredRecord> = scored
            .into_iter()
            .map(|(i, score)| ScoredRecord {
                record: state.records[i].clone(),
                score,
            })
            .collect();

        debug!(
            %metric,
            k,
            threshold = ?threshold,
            scanned = state.records.len(),
            returned = results.len(),
            "vector query"
        );
        Ok(results)
    }

    /// Replace a record's metadata. The content and embedding are untouched.
    pub fn update_metadata(&self, id: &str, metadata: Metadata) -> Result<(), IndexError> {
        let mut state = self.write();
        let pos = state
            .position(id)
            .ok_or_else(|| IndexError::NotFound(id.to_string()))?;
        state.records[pos].metadata = metadata;
        debug!(id, "updated record metadata");
        Ok(())
    }

    /// A copy of the record with the given id.
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        let state = self.read();
        state.position(id).map(|pos| state.records[pos].clone())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Dimensionality accepted by the index, once known.
    pub fn dimensionality(&self) -> Option<usize> {
        self.read().dimensionality
    }

    /// Point-in-time copy of every record in insertion order.
    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.read();
        IndexSnapshot {
            dimensionality: state.dimensionality,
            records: state.records.clone(),
        }
    }

    /// Replace the index contents with a snapshot.
    ///
    /// Every record is validated against the snapshot's dimensionality (or
    /// the first record's) and for unique ids before anything is swapped in;
    /// on error the index is unchanged.
    pub fn restore(&self, snapshot: IndexSnapshot) -> Result<(), IndexError> {
        let mut candidate = IndexState {
            dimensionality: snapshot.dimensionality,
            records: Vec::with_capacity(snapshot.records.len()),
        };
        for record in snapshot.records {
            candidate.check_record_dimension(record.dimension())?;
            if candidate.position(&record.id).is_some() {
                return Err(IndexError::DuplicateId(record.id));
            }
            candidate.dimensionality.get_or_insert(record.dimension());
            candidate.records.push(record);
        }

        let count = candidate.records.len();
        *self.write() = candidate;
        info!(records = count, "index restored");
        Ok(())
    }
}

fn matches_filter(metadata: &Metadata, filter: &Metadata) -> bool {
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}
