//! Retrieval-augmented answering: threshold filtering, delta coalescing,
//! the generation provider port, and the answering pipeline on top.

pub mod answerer;
pub mod coalesce;
pub mod provider;
pub mod threshold;

pub use answerer::RecallAnswerer;
pub use coalesce::{AnswerStream, GenerationCoalescer, MIN_COALESCE_WIDTH};
pub use provider::{DeltaStream, GenerationProvider};
pub use threshold::ThresholdFilter;
