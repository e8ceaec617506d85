//! Builds the knowledge base the server answers from.

use std::sync::Arc;

use syllabus_rag::{
    EmbeddingProvider, GeminiGenerator, Generator, InMemoryVectorStore, PromptTemplate, RagConfig,
    RagError, RagPipeline, RecursiveChunker, Result, load_document,
};
use tracing::info;

use crate::config::ServerConfig;

/// Load the syllabus and build a Gemini-backed pipeline.
///
/// The syllabus is checked before the API key so a missing file is reported
/// with its directory listing even when no key is configured.
pub async fn build_pipeline(config: &ServerConfig) -> Result<RagPipeline> {
    let document = load_document(&config.syllabus_path)?;

    let api_key = config
        .google_api_key
        .as_deref()
        .ok_or_else(|| RagError::MissingCredential("GOOGLE_API_KEY is not set".to_string()))?;
    let generator = GeminiGenerator::new(api_key)?.with_model(&config.gemini_model);

    let pipeline = assemble(config, Arc::new(generator))?;
    let chunk_count = pipeline.ingest(&document).await?;
    info!(
        path = %config.syllabus_path.display(),
        chunk_count,
        model = %config.gemini_model,
        "knowledge base ready"
    );
    Ok(pipeline)
}

/// Load the syllabus and build a pipeline around an existing generator.
pub async fn build_pipeline_with(
    config: &ServerConfig,
    generator: Arc<dyn Generator>,
) -> Result<RagPipeline> {
    let document = load_document(&config.syllabus_path)?;
    let pipeline = assemble(config, generator)?;
    pipeline.ingest(&document).await?;
    Ok(pipeline)
}

fn assemble(config: &ServerConfig, generator: Arc<dyn Generator>) -> Result<RagPipeline> {
    let rag_config = RagConfig::builder().build()?;
    RagPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::from_config(&rag_config)))
        .config(rag_config)
        .embedding_provider(embedder()?)
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(generator)
        .template(PromptTemplate::new(config.course.clone()))
        .build()
}

#[cfg(feature = "fastembed")]
fn embedder() -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(syllabus_rag::FastEmbedProvider::new()?))
}

#[cfg(not(feature = "fastembed"))]
fn embedder() -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(syllabus_rag::HashingEmbeddingProvider::default()))
}
