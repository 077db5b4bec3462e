//! Retrieval-augmented answering.
//!
//! `RecallAnswerer` is the query-to-answer-stream pipeline: search the
//! memory index, cut off weak hits, render the survivors into an evidence
//! block, and stream the provider's answer back in coalesced chunks.

use tracing::debug;

use mnemo_types::config::RecallConfig;
use mnemo_types::error::IndexError;
use mnemo_types::generation::GenerationRequest;
use mnemo_types::memory::{MemoryContext, MemoryRecord};

use crate::chunk::TextChunker;
use crate::embed::Embedder;
use crate::index::{MemoryIndex, SearchBackend};
use crate::recall::coalesce::{AnswerStream, GenerationCoalescer};
use crate::recall::provider::GenerationProvider;
use crate::recall::threshold::ThresholdFilter;

/// Marker placed in the prompt when no memory clears the threshold, so the
/// model is steered toward an honest non-answer instead of inventing one.
const NO_EVIDENCE_MARKER: &str = "No relevant memories were found.";

const SYSTEM_PROMPT: &str = "You answer questions using only the provided memories. \
If the memories do not contain the answer, say so plainly instead of guessing.";

/// Answers questions against an indexed memory store.
pub struct RecallAnswerer<B, E, C, P> {
    index: MemoryIndex<B, E, C>,
    provider: P,
    config: RecallConfig,
    threshold: ThresholdFilter,
    coalescer: GenerationCoalescer,
}

impl<B, E, C, P> RecallAnswerer<B, E, C, P>
where
    B: SearchBackend,
    E: Embedder,
    C: TextChunker,
    P: GenerationProvider,
{
    /// Validates `min_score` and `coalesce_width` from the config up front.
    pub fn new(
        index: MemoryIndex<B, E, C>,
        provider: P,
        config: RecallConfig,
    ) -> Result<Self, IndexError> {
        let threshold = ThresholdFilter::new(config.min_score)?;
        let coalescer = GenerationCoalescer::new(config.coalesce_width)?;
        Ok(Self {
            index,
            provider,
            config,
            threshold,
            coalescer,
        })
    }

    /// The underlying index, for callers that also record memories.
    pub fn index(&self) -> &MemoryIndex<B, E, C> {
        &self.index
    }

    /// Answer a question record with a coalesced answer stream.
    ///
    /// Retrieval errors surface here; generation errors arrive in-stream.
    pub async fn answer(&self, question: &MemoryRecord) -> Result<AnswerStream, IndexError> {
        let question_text = question.joined_text();
        let retrieved = self
            .index
            .search(
                &question_text,
                self.config.search_limit,
                None,
                self.config.search_chunks,
            )
            .await?;
        let relevant = self.threshold.filter(&retrieved);
        debug!(
            provider = self.provider.name(),
            retrieved = retrieved.len(),
            kept = relevant.len(),
            "recall evidence assembled"
        );

        let evidence = self.render_evidence(&relevant);
        let request = GenerationRequest {
            system: Some(SYSTEM_PROMPT.to_string()),
            prompt: format!("{evidence}\n\nQuestion: {question_text}"),
            max_tokens: self.config.max_answer_tokens,
        };

        Ok(self.coalescer.coalesce(self.provider.generate(request)))
    }

    /// Render the surviving memories as an evidence block, best match
    /// first, each snippet bounded at `snippet_max_chars`.
    fn render_evidence(&self, context: &MemoryContext) -> String {
        if context.is_empty() {
            return NO_EVIDENCE_MARKER.to_string();
        }
        let mut block = String::from("Memories:\n");
        for (record, score, matched) in context.ranked() {
            let snippet = truncate_chars(matched, self.config.snippet_max_chars);
            block.push_str(&format!("- [{score:.2}] ({}) {snippet}\n", record.kind));
        }
        block
    }
}

/// Truncate to at most `max_chars` characters, on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
