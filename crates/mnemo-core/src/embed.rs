//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding text into vectors for semantic
//! search. Implementations (e.g., fastembed local models) live in
//! mnemo-infra.

use mnemo_types::error::IndexError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// `dimension` and `model_name` are stable for the lifetime of an instance.
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector of `dimension()` floats.
    fn embed_text(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, IndexError>> + Send;

    /// The model name used for embeddings (e.g., "bge-small-en-v1.5").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
