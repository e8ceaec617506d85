//! Build-once cache for the process's pipeline.
//!
//! Building the index embeds every chunk, so it happens exactly once:
//!
//! - **Init**: the first successful [`PipelineCache::get_or_try_init`] call
//!   runs its factory. Concurrent callers wait for that one build.
//! - **Failure**: a factory error is returned to its caller and nothing is
//!   stored; the next call runs a factory again.
//! - **Lifetime**: a stored pipeline lives until the cache is dropped. For
//!   [`PipelineCache::global`] that is the end of the process.
//! - **Invalidation**: none. There is no document-changed signal; picking up
//!   a new syllabus requires a restart.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::sync::OnceCell;
use tracing::info;

use crate::error::Result;
use crate::pipeline::RagPipeline;

/// Holds at most one fully built [`RagPipeline`].
#[derive(Default)]
pub struct PipelineCache {
    cell: OnceCell<Arc<RagPipeline>>,
}

impl PipelineCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> &'static PipelineCache {
        static GLOBAL: OnceLock<PipelineCache> = OnceLock::new();
        GLOBAL.get_or_init(PipelineCache::new)
    }

    /// Return the cached pipeline, building it with `factory` on first use.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error; the cache stays empty in that case.
    pub async fn get_or_try_init<F, Fut>(&self, factory: F) -> Result<Arc<RagPipeline>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RagPipeline>>,
    {
        let pipeline = self
            .cell
            .get_or_try_init(|| async {
                let pipeline = factory().await?;
                info!("pipeline built and cached");
                Ok::<_, crate::error::RagError>(Arc::new(pipeline))
            })
            .await?;
        Ok(Arc::clone(pipeline))
    }

    /// The cached pipeline, if one has been built.
    pub fn get(&self) -> Option<Arc<RagPipeline>> {
        self.cell.get().cloned()
    }
}
