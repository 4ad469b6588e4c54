use serde::{Deserialize, Serialize};
use tracing::debug;

use super::VectorStore;
use crate::Result;
use crate::document::Document;

/// What to do when a written id is already stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Replace the stored record
    #[default]
    Overwrite,
    /// Keep the stored record and drop the new one
    Skip,
    /// Abort the write
    Fail,
}

/// Final stage of indexing: persists embedded documents
#[derive(Clone)]
pub struct DocumentWriter {
    store: VectorStore,
    policy: DuplicatePolicy,
}

impl DocumentWriter {
    #[inline]
    pub fn new(store: VectorStore, policy: DuplicatePolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the number of records written
    #[inline]
    pub async fn run(&self, documents: Vec<Document>) -> Result<usize> {
        debug!(
            "Writing {} documents with policy {:?}",
            documents.len(),
            self.policy
        );
        self.store.upsert_documents(documents, self.policy).await
    }
}
