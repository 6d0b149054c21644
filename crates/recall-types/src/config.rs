//! Configuration types for Recall.
//!
//! `RecallConfig` represents the top-level `config.toml` controlling the
//! history window, retrieval defaults, chat-model options and logging.

use serde::{Deserialize, Deserializer, Serialize};

use crate::chat::ChatConfig;
use crate::vector::{Metric, parse_k};

/// Top-level configuration. All fields have defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session history settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of most recent turns handed to the chat model.
    #[serde(default = "default_window")]
    pub default_window: usize,
}

fn default_window() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_window: default_window(),
        }
    }
}

/// Retrieval settings used by `Retriever`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_k", deserialize_with = "deserialize_k")]
    pub default_k: usize,
    #[serde(default)]
    pub default_metric: Metric,
    /// Raw-score cutoff in the metric's natural direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

fn default_k() -> usize {
    4
}

fn deserialize_k<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let k = i64::deserialize(deserializer)?;
    parse_k(k).map_err(serde::de::Error::custom)
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            default_metric: Metric::default(),
            threshold: None,
        }
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            otel: false,
        }
    }
}
