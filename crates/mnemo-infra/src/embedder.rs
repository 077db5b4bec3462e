//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `mnemo-core` using fastembed's
//! BGESmallENV15 model (384 dimensions) with ONNX runtime inference. The
//! model is loaded once at construction; the first run downloads the model
//! files to fastembed's cache directory.

use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use mnemo_core::embed::Embedder;
use mnemo_types::error::IndexError;

const MODEL_NAME: &str = "bge-small-en-v1.5";
const DIMENSION: usize = 384;

/// Local ONNX embedder over BGESmallENV15.
///
/// Inference is CPU-bound and runs on the blocking thread pool; the mutex
/// serializes access to the ONNX session across concurrent embeds.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    pub fn new() -> Result<Self, IndexError> {
        let options =
            InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| IndexError::Embedding(format!("failed to load embedding model: {e}")))?;
        info!(model = MODEL_NAME, dimension = DIMENSION, "embedding model loaded");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        let mut vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| IndexError::Embedding("embedding model lock poisoned".to_string()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| IndexError::Embedding(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| IndexError::Embedding(format!("embedding task failed: {e}")))??;

        vectors
            .pop()
            .ok_or_else(|| IndexError::Embedding("model returned no vectors".to_string()))
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}
