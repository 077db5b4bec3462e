//! Generation types for Mnemo.
//!
//! These types model the data shapes at the generation seam: the prompt
//! request sent to a provider, the raw token deltas streamed back, and the
//! coalesced answer chunks delivered to callers.

use serde::{Deserialize, Serialize};

/// Request to a generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Token usage reported by a generation provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One incremental text delta from a generation provider.
///
/// Providers give no "this is the last token" signal; the stream simply
/// ends. Usage stats, when present, typically arrive on a trailing delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationDelta {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
}

impl GenerationDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// A coalesced answer chunk delivered to the caller.
///
/// Exactly one chunk per answer stream carries `is_final == true` -- the
/// last one, which also carries any trailing usage metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerChunk {
    pub text: String,
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
}
