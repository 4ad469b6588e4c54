// Embeddings module
// Ollama client plus the document and text embedders built on it

pub mod embedder;
pub mod ollama;

pub use embedder::{DocumentEmbedder, EmbedderConfig, TextEmbedder, l2_normalize};
pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};
