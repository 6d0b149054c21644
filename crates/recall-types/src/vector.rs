//! Vector record types for Recall.
//!
//! These types model the contents of an in-memory vector index: records
//! carrying text, scalar metadata and an embedding, the similarity metrics
//! used to rank them, and ranked query results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ArgumentError;

/// A scalar metadata value attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// String-keyed scalar metadata. Ordered so serialized snapshots are stable.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A piece of content with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    /// Create a record with a fresh time-sortable id and no metadata.
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding,
        }
    }

    /// Replace the generated id with a caller-chosen one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Dimensionality of the embedding.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// How query vectors are compared against stored embeddings.
///
/// Deserializes through [`FromStr`], so config files accept the same names
/// and aliases as `str::parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Metric {
    /// Cosine similarity; higher is closer.
    #[default]
    Cosine,
    /// Raw inner product; higher is closer.
    #[serde(rename = "dot")]
    DotProduct,
    /// L2 distance; lower is closer.
    Euclidean,
}

impl Metric {
    /// Whether scores under this metric are similarities (descending order)
    /// rather than distances (ascending order).
    pub fn is_similarity(&self) -> bool {
        match self {
            Metric::Cosine | Metric::DotProduct => true,
            Metric::Euclidean => false,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::DotProduct => write!(f, "dot"),
            Metric::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl FromStr for Metric {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "dot" | "dot_product" | "inner_product" => Ok(Metric::DotProduct),
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            other => Err(ArgumentError::InvalidMetric(other.to_string())),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = ArgumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Convert a signed result count from an untyped boundary into `usize`.
pub fn parse_k(k: i64) -> Result<usize, ArgumentError> {
    usize::try_from(k).map_err(|_| ArgumentError::NegativeK(k))
}

/// Point-in-time copy of an index's contents, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensionality: Option<usize>,
    #[serde(default)]
    pub records: Vec<VectorRecord>,
}

/// A record returned by a query together with its raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    /// Similarity (cosine, dot) or distance (euclidean), per the query metric.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_roundtrip() {
        for metric in [Metric::Cosine, Metric::DotProduct, Metric::Euclidean] {
            let s = metric.to_string();
            let parsed: Metric = s.parse().unwrap();
            assert_eq!(metric, parsed);
        }
    }

    #[test]
    fn test_metric_aliases() {
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!("dot_product".parse::<Metric>().unwrap(), Metric::DotProduct);
    }

    #[test]
    fn test_metric_invalid() {
        let err = "manhattan".parse::<Metric>().unwrap_err();
        assert_eq!(err, ArgumentError::InvalidMetric("manhattan".to_string()));
    }

    #[test]
    fn test_metric_serde() {
        let json = serde_json::to_string(&Metric::DotProduct).unwrap();
        assert_eq!(json, "\"dot\"");
        let parsed: Metric = serde_json::from_str("\"l2\"").unwrap();
        assert_eq!(parsed, Metric::Euclidean);
    }

    #[test]
    fn test_metric_serde_accepts_parse_aliases() {
        for (raw, expected) in [
            ("\" Cosine \"", Metric::Cosine),
            ("\"DOT\"", Metric::DotProduct),
            ("\"inner_product\"", Metric::DotProduct),
            ("\"dot_product\"", Metric::DotProduct),
            ("\"L2\"", Metric::Euclidean),
        ] {
            assert_eq!(serde_json::from_str::<Metric>(raw).unwrap(), expected);
        }
        let err = serde_json::from_str::<Metric>("\"manhattan\"").unwrap_err();
        assert!(err.to_string().contains("invalid metric: 'manhattan'"));
    }

    #[test]
    fn test_metric_direction() {
        assert!(Metric::Cosine.is_similarity());
        assert!(Metric::DotProduct.is_similarity());
        assert!(!Metric::Euclidean.is_similarity());
    }

    #[test]
    fn test_parse_k() {
        assert_eq!(parse_k(0).unwrap(), 0);
        assert_eq!(parse_k(5).unwrap(), 5);
        assert_eq!(parse_k(-1).unwrap_err(), ArgumentError::NegativeK(-1));
    }

    #[test]
    fn test_record_builder() {
        let record = VectorRecord::new("rust is fast", vec![0.1, 0.2, 0.3])
            .with_id("doc-1")
            .with_metadata("source", "faq")
            .with_metadata("page", 3_i64);
        assert_eq!(record.id, "doc-1");
        assert_eq!(record.dimension(), 3);
        assert_eq!(
            record.metadata.get("source"),
            Some(&MetadataValue::String("faq".to_string()))
        );
        assert_eq!(record.metadata.get("page"), Some(&MetadataValue::Integer(3)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = VectorRecord::new("a", vec![1.0]);
        let b = VectorRecord::new("b", vec![1.0]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_metadata_untagged_serde() {
        let json = r#"{"flag":true,"count":2,"ratio":0.5,"name":"x"}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.get("flag"), Some(&MetadataValue::Bool(true)));
        assert_eq!(metadata.get("count"), Some(&MetadataValue::Integer(2)));
        assert_eq!(metadata.get("ratio"), Some(&MetadataValue::Float(0.5)));
        assert_eq!(
            metadata.get("name"),
            Some(&MetadataValue::String("x".to_string()))
        );
    }
}
