use thiserror::Error;

/// Malformed caller input detected at a parsing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("invalid metric: '{0}'")]
    InvalidMetric(String),

    #[error("invalid role: '{0}'")]
    InvalidRole(String),

    #[error("k must be non-negative, got {0}")]
    NegativeK(i64),

    #[error("embedding must have at least one dimension")]
    EmptyEmbedding,
}

/// Errors from vector index operations.
///
/// All variants are local to the failing call: the index is never left
/// with a partially inserted record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error("record '{0}' not found")]
    NotFound(String),

    #[error("record '{0}' already exists")]
    DuplicateId(String),
}

/// Errors from an external embedding function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("embedding provider error: {0}")]
    Provider(String),
}

/// Errors from a text query: either embedding the text or searching the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Errors from an external chat model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("request timed out")]
    Timeout,
}

impl ModelError {
    /// Whether the caller may reasonably retry the same request.
    ///
    /// Recall never retries on its own; this only classifies the failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited { .. } | ModelError::Timeout | ModelError::Stream(_)
        )
    }
}

/// Errors from prompt assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("missing template variable: '{0}'")]
    MissingVariable(String),
}

/// Errors from a conversation turn, wrapping whichever collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}
