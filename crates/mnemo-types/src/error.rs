use thiserror::Error;

/// Errors from indexing, retrieval, and filtering operations.
///
/// `Validation` is never retried. `Backend` and `Embedding` are transient
/// I/O failures, retryable by the caller at whole-operation granularity --
/// the engine does not auto-retry, since idempotency depends on
/// caller-controlled batching. Missing memories are returned as `Ok(None)`
/// values, not errors; `NotFound` exists for the few paths where an id was
/// explicitly required. Unresolvable chunk parents during search are
/// swallowed locally and logged, never surfaced here.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("memory not found")]
    NotFound,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("embedding error: {0}")]
    Embedding(String),
}

/// Batch indexing failure carrying the partial-success count.
///
/// Memories committed before the failure stay indexed; the caller can
/// resume from `committed`.
#[derive(Debug, Error)]
#[error("batch indexing failed after committing {committed} memories: {source}")]
pub struct BatchIndexError {
    pub committed: usize,
    #[source]
    pub source: IndexError,
}

/// Errors from generation provider operations.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },
}
