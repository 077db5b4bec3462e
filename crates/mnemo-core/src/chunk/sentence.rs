//! Sentence-based chunking with a token guardrail for over-long sentences.

use text_splitter::{ChunkConfig, TextSplitter};

use super::TextChunker;

/// Rough token estimation: ~4 chars per token (average English text).
const APPROX_CHARS_PER_TOKEN: usize = 4;

/// One chunk per natural sentence.
///
/// Sentences are split on `. ! ?` followed by whitespace (abbreviation-naive
/// on purpose; the guardrail below bounds the damage of a missed boundary).
/// A sentence exceeding `max_sentence_tokens` is sub-windowed with ~25%
/// overlap via `text-splitter`. There is no cross-sentence overlap.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    max_sentence_tokens: Option<usize>,
}

impl SentenceChunker {
    pub fn new(max_sentence_tokens: Option<usize>) -> Self {
        Self {
            max_sentence_tokens: max_sentence_tokens.filter(|&limit| limit > 0),
        }
    }

    fn estimate_tokens(text: &str) -> usize {
        text.chars().count().div_ceil(APPROX_CHARS_PER_TOKEN)
    }

    /// Split into natural sentences, keeping terminators with their sentence.
    fn split_sentences(text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            if matches!(c, '.' | '!' | '?') {
                // A terminator ends the sentence when followed by
                // whitespace or end of input.
                match chars.peek() {
                    Some(next) if !next.is_whitespace() => continue,
                    _ => {
                        let trimmed = current.trim();
                        if !trimmed.is_empty() {
                            sentences.push(trimmed.to_string());
                        }
                        current.clear();
                    }
                }
            }
        }

        let trimmed = current.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        sentences
    }

    /// Sub-window an over-long sentence with ~25% token overlap.
    fn sub_window(sentence: &str, token_limit: usize) -> Vec<String> {
        let max_chars = token_limit * APPROX_CHARS_PER_TOKEN;
        let overlap_chars = max_chars / 4;

        let config = match ChunkConfig::new(max_chars).with_overlap(overlap_chars) {
            Ok(config) => config,
            Err(_) => ChunkConfig::new(max_chars),
        };
        let splitter = TextSplitter::new(config);
        splitter.chunks(sentence).map(str::to_string).collect()
    }
}

impl TextChunker for SentenceChunker {
    fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for sentence in Self::split_sentences(text) {
            match self.max_sentence_tokens {
                Some(limit) if Self::estimate_tokens(&sentence) > limit => {
                    chunks.extend(Self::sub_window(&sentence, limit));
                }
                _ => chunks.push(sentence),
            }
        }
        chunks
    }
}
