// The two pipelines: vault -> vector store, and question -> answer

pub mod indexing;
pub mod query;

pub use indexing::{IndexingPipeline, IndexingReport};
pub use query::{Answer, QueryPipeline};

use crate::VaultError;

/// Run blocking HTTP work off the async runtime
async fn run_blocking<T, F>(work: F) -> crate::Result<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| VaultError::Other(anyhow::anyhow!("Blocking task failed: {}", e)))?
}
