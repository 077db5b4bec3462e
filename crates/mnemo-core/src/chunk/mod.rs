//! Text chunking strategies.
//!
//! A chunker splits memory text into independently searchable spans. Two
//! strategies are provided: fixed-width character windows snapped to
//! sentence boundaries, and one-chunk-per-sentence with a token guardrail
//! for over-long sentences.

pub mod character;
pub mod sentence;

pub use character::CharacterChunker;
pub use sentence::SentenceChunker;

use mnemo_types::config::{ChunkStrategy, ChunkingConfig};

/// Splits text into an ordered sequence of searchable spans.
///
/// Chunking never errors: empty input yields an empty sequence.
pub trait TextChunker: Send + Sync {
    fn chunk_text(&self, text: &str) -> Vec<String>;
}

/// A chunker selected at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredChunker {
    Character(CharacterChunker),
    Sentence(SentenceChunker),
}

impl From<&ChunkingConfig> for ConfiguredChunker {
    fn from(config: &ChunkingConfig) -> Self {
        match config.strategy {
            ChunkStrategy::Character => ConfiguredChunker::Character(CharacterChunker::new(
                config.chunk_size,
                config.chunk_overlap,
            )),
            ChunkStrategy::Sentence => ConfiguredChunker::Sentence(SentenceChunker::new(Some(
                config.sentence_token_limit,
            ))),
        }
    }
}

impl TextChunker for ConfiguredChunker {
    fn chunk_text(&self, text: &str) -> Vec<String> {
        match self {
            ConfiguredChunker::Character(chunker) => chunker.chunk_text(text),
            ConfiguredChunker::Sentence(chunker) => chunker.chunk_text(text),
        }
    }
}
