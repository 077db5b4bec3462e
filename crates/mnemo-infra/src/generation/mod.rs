//! Streaming generation providers.

pub mod openai;
pub mod types;

pub use openai::OpenAiCompatProvider;
