//! Generation provider trait definition.
//!
//! Implementations (e.g., an OpenAI-compatible HTTP client) live in
//! mnemo-infra.

use std::pin::Pin;

use futures_util::Stream;

use mnemo_types::error::GenerationError;
use mnemo_types::generation::{GenerationDelta, GenerationRequest};

/// Stream of incremental deltas from a generation provider.
///
/// Boxed so providers stay object-safe behind the coalescer.
pub type DeltaStream =
    Pin<Box<dyn Stream<Item = Result<GenerationDelta, GenerationError>> + Send + 'static>>;

/// Trait for streaming text generation.
///
/// The stream carries no end-of-answer marker; completion is signalled by
/// the stream ending. Errors terminate the stream.
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai-compat").
    fn name(&self) -> &str;

    /// Start a generation and stream its deltas.
    fn generate(&self, request: GenerationRequest) -> DeltaStream;
}
