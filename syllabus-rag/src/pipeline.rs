//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates index construction (chunk → embed → store)
//! and question answering (retrieve → assemble prompt → generate) by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`], and
//! a [`Generator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use syllabus_rag::{RagPipeline, RagConfig, InMemoryVectorStore, RecursiveChunker};
//!
//! let config = RagConfig::default();
//! let pipeline = RagPipeline::builder()
//!     .chunker(Arc::new(RecursiveChunker::from_config(&config)))
//!     .config(config)
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! let answer = pipeline.answer("When is the midterm?").await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::index::Index;
use crate::prompt::PromptTemplate;
use crate::vectorstore::VectorStore;

/// Number of characters of the top chunk quoted in a citation.
pub const CITATION_SNIPPET_CHARS: usize = 80;

/// A generated answer and the chunks it was grounded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The generator's reply, trimmed.
    pub text: String,
    /// The retrieved chunks used to build the prompt, best first.
    pub sources: Vec<SearchResult>,
    /// Short label quoting the top source, if any source was retrieved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Build `"{label} — {first 80 chars}…"` with newlines flattened to spaces.
pub fn citation_label(source_label: &str, chunk_text: &str) -> String {
    let snippet: String = chunk_text.chars().take(CITATION_SNIPPET_CHARS).collect();
    format!("{source_label} — {}…", snippet.replace('\n', " ").trim())
}

/// The RAG pipeline orchestrator.
///
/// The index is built at most once per pipeline by [`ingest`](Self::ingest)
/// and is read-only afterwards. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    index: OnceCell<Index>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return the prompt template in use.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Name of the configured generator.
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// The built index, if [`ingest`](Self::ingest) has completed.
    pub fn index(&self) -> Option<&Index> {
        self.index.get()
    }

    /// Chunk, embed and store `document`, building the index.
    ///
    /// Returns the number of chunks indexed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexAlreadyBuilt`] if the index already exists and
    /// [`RagError::PipelineError`] if embedding or storage fails.
    pub async fn ingest(&self, document: &Document) -> Result<usize> {
        let built = AtomicBool::new(false);
        let flag = &built;
        let chunker = &self.chunker;
        let embedding_provider = &self.embedding_provider;
        let vector_store = &self.vector_store;

        // Concurrent callers wait here; only the first one runs the build.
        let index = self
            .index
            .get_or_try_init(move || async move {
                flag.store(true, Ordering::SeqCst);
                let chunks = chunker.chunk(document);
                if chunks.is_empty() {
                    warn!(document.id = %document.id, "document produced no chunks");
                }
                Index::build(chunks, Arc::clone(embedding_provider), Arc::clone(vector_store))
                    .await
                    .inspect_err(|e| {
                        error!(document.id = %document.id, error = %e, "index build failed");
                    })
            })
            .await?;

        if !built.load(Ordering::SeqCst) {
            warn!(document.id = %document.id, "ignoring ingest: index already built");
            return Err(RagError::IndexAlreadyBuilt);
        }

        let chunk_count = index.chunk_count();
        info!(document.id = %document.id, chunk_count, "ingested document");

        Ok(chunk_count)
    }

    /// Retrieve the top-k chunks for `question`, filtered by the similarity
    /// threshold when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the index has not been built or
    /// retrieval fails.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let index = self.index.get().ok_or_else(|| {
            RagError::PipelineError("index has not been built; call ingest first".to_string())
        })?;

        let results = index.query(question, self.config.top_k).await?;
        Ok(match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        })
    }

    /// Answer `question` from the indexed syllabus.
    ///
    /// Retrieval runs once; the same result set feeds the prompt and the
    /// returned [`Answer::sources`], so the citation always matches the
    /// context the generator saw.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuestion`] for blank input without calling any
    /// collaborator. Any retrieval or generation failure is returned as a
    /// single [`RagError::PipelineError`]; nothing is retried.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let sources = self.retrieve(question).await?;
        let prompt = self.template.assemble(&sources, question);

        let reply = self.generator.generate(&prompt).await.map_err(|e| {
            error!(generator = self.generator.name(), error = %e, "generation failed");
            RagError::PipelineError(format!("generation failed: {e}"))
        })?;

        let citation = sources
            .first()
            .map(|top| citation_label(&self.template.profile().source_label(), &top.chunk.text));

        info!(source_count = sources.len(), answer_len = reply.len(), "answered question");

        Ok(Answer { text: reply.trim().to_string(), sources, citation })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `template` defaults to the ITEC 3310 profile; every other field is
/// required. Call [`build()`](RagPipelineBuilder::build) to validate and
/// produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    generator: Option<Arc<dyn Generator>>,
    template: Option<PromptTemplate>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the prompt template.
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            generator,
            template: self.template.unwrap_or_default(),
            index: OnceCell::new(),
        })
    }
}
