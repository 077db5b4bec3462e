//! Relevance cutoff over retrieved memory contexts.

use mnemo_types::error::IndexError;
use mnemo_types::memory::MemoryContext;

/// Drops retrieved memories scoring below a configured minimum.
///
/// Pure: `filter` builds a new context and never mutates its input. The
/// threshold is inclusive, so `score == min_score` survives.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdFilter {
    min_score: f32,
}

impl ThresholdFilter {
    pub fn new(min_score: f32) -> Result<Self, IndexError> {
        Self::validate(min_score)?;
        Ok(Self { min_score })
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    pub fn set_threshold(&mut self, min_score: f32) -> Result<(), IndexError> {
        Self::validate(min_score)?;
        self.min_score = min_score;
        Ok(())
    }

    fn validate(min_score: f32) -> Result<(), IndexError> {
        if !(0.0..=1.0).contains(&min_score) {
            return Err(IndexError::Validation(format!(
                "min_score must be within [0.0, 1.0], got {min_score}"
            )));
        }
        Ok(())
    }

    /// Keep entries whose score is at or above the threshold.
    pub fn filter(&self, context: &MemoryContext) -> MemoryContext {
        let mut kept = MemoryContext::new();
        for (record, score, matched) in context.ranked() {
            if score >= self.min_score {
                kept.insert(record.clone(), score, matched.to_string());
            }
        }
        kept
    }
}
