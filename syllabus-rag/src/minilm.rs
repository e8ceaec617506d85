//! Local sentence-embedding provider backed by `fastembed`.
//!
//! This module is only available when the `fastembed` feature is enabled.
//! The model (AllMiniLML6V2, 384 dimensions) runs on the CPU through ONNX
//! Runtime; the weights are downloaded once on first use and cached.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// An [`EmbeddingProvider`] running `all-MiniLM-L6-v2` locally.
///
/// `TextEmbedding::embed` needs `&mut self`, so the model sits behind a
/// `Mutex` and inference runs on the blocking thread pool.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedProvider {
    /// Embedding dimensions for AllMiniLML6V2.
    pub const DIMENSIONS: usize = 384;

    /// Load the AllMiniLML6V2 model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the model cannot be loaded.
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|e| RagError::EmbeddingError {
            provider: "FastEmbed".into(),
            message: format!("failed to load AllMiniLML6V2: {e}"),
        })?;
        info!(provider = "FastEmbed", "AllMiniLML6V2 loaded");
        Ok(Self { model: Arc::new(Mutex::new(model)) })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|_| RagError::EmbeddingError {
                provider: "FastEmbed".into(),
                message: "model lock poisoned".into(),
            })?;
            model.embed(texts, None).map_err(|e| RagError::EmbeddingError {
                provider: "FastEmbed".into(),
                message: format!("{e}"),
            })
        })
        .await
        .map_err(|e| {
            error!(provider = "FastEmbed", error = %e, "embedding task failed");
            RagError::EmbeddingError { provider: "FastEmbed".into(), message: format!("{e}") }
        })?
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "FastEmbed", text_len = text.len(), "embedding single text");
        self.run(vec![text.to_string()]).await?.pop().ok_or_else(|| RagError::EmbeddingError {
            provider: "FastEmbed".into(),
            message: "model returned no embedding".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = "FastEmbed", batch_size = texts.len(), "embedding batch");
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }
}
