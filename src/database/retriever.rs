use tracing::debug;

use super::VectorStore;
use crate::Result;
use crate::config::VectorStoreConfig;
use crate::document::Document;

/// Looks up the stored documents nearest to a query embedding
#[derive(Clone)]
pub struct EmbeddingRetriever {
    store: VectorStore,
    top_k: usize,
    return_embedding: bool,
}

impl EmbeddingRetriever {
    #[inline]
    pub fn new(store: VectorStore, config: &VectorStoreConfig) -> Self {
        Self {
            store,
            top_k: config.top_k,
            return_embedding: config.return_embedding,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Up to `top_k` documents, best first, each with its score set
    #[inline]
    pub async fn run(&self, query_embedding: &[f32]) -> Result<Vec<Document>> {
        let documents = self
            .store
            .search(query_embedding, self.top_k, self.return_embedding)
            .await?;
        debug!("Retrieved {} documents", documents.len());
        Ok(documents)
    }
}
