
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::document::Document;
use crate::embeddings::ollama::OllamaClient;
use crate::{Result, VaultError};

/// How text is prepared before it is sent to the embedding model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Prepended to every text
    pub prefix: String,
    /// Appended to every text
    pub suffix: String,
    /// Metadata fields embedded together with the document content
    pub meta_fields_to_embed: Vec<String>,
    /// Separator between embedded metadata fields and content
    pub embedding_separator: String,
    /// Scale vectors to unit length
    pub normalize_embeddings: bool,
    /// Show a progress bar while embedding documents
    pub progress_bar: bool,
}

impl Default for EmbedderConfig {
    #[inline]
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            meta_fields_to_embed: Vec::new(),
            embedding_separator: "\n".to_string(),
            normalize_embeddings: false,
            progress_bar: true,
        }
    }
}

/// Embeds document batches for indexing
#[derive(Debug, Clone)]
pub struct DocumentEmbedder {
    client: OllamaClient,
    dimension: usize,
    config: EmbedderConfig,
}

impl DocumentEmbedder {
    #[inline]
    pub fn new(client: OllamaClient, dimension: usize, config: EmbedderConfig) -> Self {
        Self {
            client,
            dimension,
            config,
        }
    }

    /// Attach an embedding to every document. Any failure aborts the whole batch.
    #[inline]
    pub fn run(&self, mut documents: Vec<Document>) -> Result<Vec<Document>> {
        if documents.is_empty() {
            return Ok(documents);
        }

        let texts: Vec<String> = documents.iter().map(|d| self.prepare_text(d)).collect();

        let bar = if self.config.progress_bar && console::user_attended_stderr() {
            ProgressBar::new(texts.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding with {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(self.client.model().to_string());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.client.batch_size().max(1)) {
            let vectors = self
                .client
                .embed_batch(batch)
                .map_err(|e| VaultError::Embedding(format!("{:#}", e)))?;
            embeddings.extend(vectors);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        for (document, mut embedding) in documents.iter_mut().zip(embeddings) {
            check_dimension(&embedding, self.dimension)?;
            if self.config.normalize_embeddings {
                l2_normalize(&mut embedding);
            }
            document.embedding = Some(embedding);
        }

        info!(
            "Embedded {} documents with {}",
            documents.len(),
            self.client.model()
        );
        Ok(documents)
    }

    fn prepare_text(&self, document: &Document) -> String {
        let mut parts: Vec<String> = self
            .config
            .meta_fields_to_embed
            .iter()
            .filter_map(|key| document.meta.get(key))
            .filter_map(|value| match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect();
        parts.push(document.content.clone());

        format!(
            "{}{}{}",
            self.config.prefix,
            parts.join(&self.config.embedding_separator),
            self.config.suffix
        )
    }
}

/// Embeds query strings with the same model used for documents
#[derive(Debug, Clone)]
pub struct TextEmbedder {
    client: OllamaClient,
    dimension: usize,
    prefix: String,
    suffix: String,
    normalize: bool,
}

impl TextEmbedder {
    #[inline]
    pub fn new(client: OllamaClient, dimension: usize, config: &EmbedderConfig) -> Self {
        Self {
            client,
            dimension,
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
            normalize: config.normalize_embeddings,
        }
    }

    #[inline]
    pub fn run(&self, text: &str) -> Result<Vec<f32>> {
        let input = format!("{}{}{}", self.prefix, text, self.suffix);
        let mut embedding = self
            .client
            .embed(&input)
            .map_err(|e| VaultError::Embedding(format!("{:#}", e)))?;

        check_dimension(&embedding, self.dimension)?;
        if self.normalize {
            l2_normalize(&mut embedding);
        }

        debug!("Embedded query text ({} chars)", text.len());
        Ok(embedding)
    }
}

fn check_dimension(embedding: &[f32], expected: usize) -> Result<()> {
    if embedding.len() == expected {
        Ok(())
    } else {
        Err(VaultError::Embedding(format!(
            "Model returned {} dimensions, expected {}",
            embedding.len(),
            expected
        )))
    }
}

/// Scale a vector to unit length. Zero vectors are left untouched.
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
