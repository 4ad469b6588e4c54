// Document model shared by both pipelines


use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Arbitrary key-value metadata carried by a document
pub type Meta = Map<String, Value>;

/// Path of the file a document was converted from
pub const META_FILE_PATH: &str = "file_path";
/// First heading of the source note, when it has one
pub const META_TITLE: &str = "title";
/// Id of the document a chunk was split from
pub const META_SOURCE_ID: &str = "source_id";
/// Position of a chunk within its parent document
pub const META_SPLIT_ID: &str = "split_id";
/// Character offset of a chunk within its parent's content
pub const META_SPLIT_IDX_START: &str = "split_idx_start";

/// A unit of ingested content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier derived from content and metadata
    pub id: String,
    /// The text content
    pub content: String,
    /// Arbitrary metadata, e.g. the source file path
    #[serde(default)]
    pub meta: Meta,
    /// Embedding vector, once computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Similarity score assigned by retrieval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    /// Create a document whose id is derived from its content and metadata
    #[inline]
    pub fn new(content: impl Into<String>, meta: Meta) -> Self {
        let content = content.into();
        let id = derive_id(&content, &meta);
        Self {
            id,
            content,
            meta,
            embedding: None,
            score: None,
        }
    }

    /// Recompute the id after content or metadata changed
    #[inline]
    pub fn regenerate_id(&mut self) {
        self.id = derive_id(&self.content, &self.meta);
    }

    #[inline]
    pub fn file_path(&self) -> Option<&str> {
        self.meta.get(META_FILE_PATH).and_then(Value::as_str)
    }

    #[inline]
    pub fn split_id(&self) -> Option<u64> {
        self.meta.get(META_SPLIT_ID).and_then(Value::as_u64)
    }

    #[inline]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Derive a stable document id (UUID v5) from content and metadata.
///
/// Identical content and metadata always produce the same id, so re-indexing an
/// unchanged vault upserts onto the same records.
#[inline]
pub fn derive_id(content: &str, meta: &Meta) -> String {
    // Map keys are sorted, so the serialized form is stable
    let meta_json = serde_json::to_string(meta).unwrap_or_default();

    let mut name = Vec::with_capacity(content.len() + meta_json.len() + 1);
    name.extend_from_slice(content.as_bytes());
    name.push(0);
    name.extend_from_slice(meta_json.as_bytes());

    Uuid::new_v5(&Uuid::NAMESPACE_OID, &name).to_string()
}
