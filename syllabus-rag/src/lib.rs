//! # syllabus-rag
//!
//! Retrieval-augmented question answering over a single course syllabus.
//!
//! ## Overview
//!
//! The syllabus is loaded once, split into overlapping chunks, embedded and
//! stored in a read-only [`Index`]. Each question retrieves the top-k chunks,
//! formats them into a grounded prompt, and asks a [`Generator`] for the
//! answer.
//!
//! - [`load_document`] – read the syllabus file, failing fast when it is missing
//! - [`RecursiveChunker`] – paragraph → line → sentence → word splitting
//! - [`EmbeddingProvider`] – embedding capability; [`HashingEmbeddingProvider`]
//!   works offline, `FastEmbedProvider` runs all-MiniLM-L6-v2 (feature `fastembed`)
//! - [`VectorStore`] / [`InMemoryVectorStore`] – cosine-similarity search
//! - [`PromptTemplate`] – the grounded instruction template
//! - [`Generator`] – generation capability; `GeminiGenerator` (feature `gemini`)
//! - [`RagPipeline`] – the orchestrator; [`PipelineCache`] keeps one per process
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use syllabus_rag::*;
//!
//! let config = RagConfig::default();
//! let pipeline = RagPipeline::builder()
//!     .chunker(Arc::new(RecursiveChunker::from_config(&config)))
//!     .config(config)
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(gemini::GeminiGenerator::new(api_key)?))
//!     .build()?;
//!
//! pipeline.ingest(&load_document("itec3310_syllabus.txt")?).await?;
//! let answer = pipeline.answer("When is the midterm exam?").await?;
//! println!("{}", answer.text);
//! ```

pub mod cache;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "fastembed")]
pub mod minilm;

pub use cache::PipelineCache;
pub use chunking::{Chunker, RecursiveChunker, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult, load_document};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::Generator;
pub use index::Index;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{Answer, RagPipeline, RagPipelineBuilder, citation_label};
pub use prompt::{CourseProfile, EMPTY_CONTEXT_MARKER, PromptTemplate};
pub use vectorstore::VectorStore;

#[cfg(feature = "gemini")]
pub use gemini::GeminiGenerator;
#[cfg(feature = "fastembed")]
pub use minilm::FastEmbedProvider;
