//! Wire types for the OpenAI-compatible chat completions API.

use serde::{Deserialize, Serialize};

use mnemo_types::generation::{GenerationDelta, UsageStats};

/// Request body for `POST /chat/completions` with `stream: true`.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
    pub stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct StreamOptions {
    pub include_usage: bool,
}

/// One SSE data payload from the streaming endpoint.
///
/// Content arrives in `choices[0].delta.content`; with `include_usage` set,
/// a trailing chunk carries `usage` and an empty choices list.
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatChunk {
    /// Convert a wire chunk into a delta, `None` for chunks that carry
    /// neither text nor usage (role-only deltas, keepalives).
    pub fn into_delta(self) -> Option<GenerationDelta> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .unwrap_or_default();
        let usage = self.usage.map(|u| UsageStats {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        if text.is_empty() && usage.is_none() {
            return None;
        }
        Some(GenerationDelta { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_chunk() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let chunk: ChatChunk = serde_json::from_str(data).unwrap();
        let delta = chunk.into_delta().unwrap();
        assert_eq!(delta.text, "Hel");
        assert!(delta.usage.is_none());
    }

    #[test]
    fn test_parse_trailing_usage_chunk() {
        let data = r#"{"id":"c1","choices":[],"usage":{"prompt_tokens":42,"completion_tokens":7}}"#;
        let chunk: ChatChunk = serde_json::from_str(data).unwrap();
        let delta = chunk.into_delta().unwrap();
        assert!(delta.text.is_empty());
        let usage = delta.usage.unwrap();
        assert_eq!(usage.input_tokens, 42);
        assert_eq!(usage.output_tokens, 7);
    }

    #[test]
    fn test_role_only_chunk_yields_nothing() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        let chunk: ChatChunk = serde_json::from_str(data).unwrap();
        assert!(chunk.into_delta().is_none());
    }

    #[test]
    fn test_finish_chunk_with_empty_delta_yields_nothing() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        let chunk: ChatChunk = serde_json::from_str(data).unwrap();
        assert!(chunk.into_delta().is_none());
    }
}
