//! Error types for the `syllabus-rag` crate.

use thiserror::Error;

/// Errors that can occur while building or querying the syllabus pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document is missing, unreadable, or empty.
    #[error("Syllabus not found at: {path}. Files in parent: [{}]", available.join(", "))]
    DocumentNotFound {
        /// The path that was expected to hold the document.
        path: String,
        /// Entries actually present in the parent directory.
        available: Vec<String>,
    },

    /// The question was empty or whitespace only.
    #[error("Question must not be empty")]
    EmptyQuestion,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The generative model failed to produce an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A credential required by a remote collaborator is missing.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The index was already built for this pipeline.
    #[error("Index already built; rebuilding requires a restart")]
    IndexAlreadyBuilt,

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
