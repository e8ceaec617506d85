//! Generator trait for producing answers from an assembled prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A text generation backend.
///
/// The pipeline hands over one fully assembled prompt and expects the
/// model's reply verbatim; trimming is done by the caller.
///
/// # Example
///
/// ```rust,ignore
/// use syllabus_rag::Generator;
///
/// let generator = GeminiGenerator::new(api_key)?;
/// let reply = generator.generate("Say hello").await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a reply for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model or backend name, used in logs.
    fn name(&self) -> &str;
}
