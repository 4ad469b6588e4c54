// Vector storage: the LanceDB table plus the writer and retriever components

pub mod lancedb;
pub mod retriever;
pub mod writer;

pub use self::lancedb::vector_store::{Similarity, VectorStore, rank_documents};
pub use retriever::EmbeddingRetriever;
pub use writer::{DocumentWriter, DuplicatePolicy};
