//! Configuration types for the Mnemo engine.
//!
//! Loaded from a `config.toml` by the embedding process. All fields have
//! sensible defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Which chunking strategy the index uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed-width windows snapped to sentence boundaries.
    Character,
    /// One chunk per natural sentence, sub-windowed over a token guardrail.
    Sentence,
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_strategy")]
    pub strategy: ChunkStrategy,

    /// Window width in characters (character strategy).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive windows in characters. Clamped below
    /// `chunk_size` at construction to guarantee forward progress.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Token guardrail for the sentence strategy; sentences above it are
    /// sub-windowed with ~25% overlap.
    #[serde(default = "default_sentence_token_limit")]
    pub sentence_token_limit: usize,
}

fn default_strategy() -> ChunkStrategy {
    ChunkStrategy::Character
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    64
}

fn default_sentence_token_limit() -> usize {
    256
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            sentence_token_limit: default_sentence_token_limit(),
        }
    }
}

/// Retrieval-augmented answering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Nearest-neighbor limit for the retrieval step.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Post-retrieval relevance cutoff, in `[0.0, 1.0]`.
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Whether chunk units participate in search.
    #[serde(default = "default_search_chunks")]
    pub search_chunks: bool,

    /// Per-snippet truncation bound for the evidence block.
    #[serde(default = "default_snippet_max_chars")]
    pub snippet_max_chars: usize,

    /// Coalescing width: deltas buffered per emitted answer chunk.
    #[serde(default = "default_coalesce_width")]
    pub coalesce_width: usize,

    /// Token budget handed to the generation provider.
    #[serde(default = "default_max_answer_tokens")]
    pub max_answer_tokens: u32,
}

fn default_search_limit() -> usize {
    8
}

fn default_min_score() -> f32 {
    0.35
}

fn default_search_chunks() -> bool {
    true
}

fn default_snippet_max_chars() -> usize {
    1200
}

fn default_coalesce_width() -> usize {
    16
}

fn default_max_answer_tokens() -> u32 {
    1024
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            min_score: default_min_score(),
            search_chunks: default_search_chunks(),
            snippet_max_chars: default_snippet_max_chars(),
            coalesce_width: default_coalesce_width(),
            max_answer_tokens: default_max_answer_tokens(),
        }
    }
}
