//! The read-only retrieval index.
//!
//! An [`Index`] is produced once by [`Index::build`], which embeds every chunk
//! and loads the vector store. Afterwards only [`Index::query`] is available;
//! nothing can add to or remove from a built index.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Embedded chunks plus the provider used to embed queries against them.
pub struct Index {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunk_count: usize,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index").field("chunk_count", &self.chunk_count).finish_non_exhaustive()
    }
}

impl Index {
    /// Embed `chunks` in one batch and upsert them into `vector_store`.
    ///
    /// Zero chunks is allowed and produces an index that answers every query
    /// with an empty result set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or storage fails.
    pub async fn build(
        mut chunks: Vec<Chunk>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        if !chunks.is_empty() {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let embeddings = embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(error = %e, "embedding failed while building index");
                RagError::PipelineError(format!("embedding failed while building index: {e}"))
            })?;
            if embeddings.len() != chunks.len() {
                return Err(RagError::PipelineError(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    chunks.len()
                )));
            }
            for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            vector_store.upsert(&chunks).await.map_err(|e| {
                error!(error = %e, "upsert failed while building index");
                RagError::PipelineError(format!("upsert failed while building index: {e}"))
            })?;
        }

        let chunk_count = chunks.len();
        info!(chunk_count, dimensions = embedding_provider.dimensions(), "index built");

        Ok(Self { embedding_provider, vector_store, chunk_count })
    }

    /// Number of chunks the index was built from.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Return up to `top_k` chunks most similar to `text`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.chunk_count == 0 || top_k == 0 {
            debug!(chunk_count = self.chunk_count, top_k, "query against empty index");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(text).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        let results = self.vector_store.search(&query_embedding, top_k).await.map_err(|e| {
            error!(error = %e, "vector store search failed");
            RagError::PipelineError(format!("search failed: {e}"))
        })?;

        debug!(result_count = results.len(), "retrieved chunks");
        Ok(results)
    }
}
