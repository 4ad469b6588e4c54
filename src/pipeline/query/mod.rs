#[cfg(test)]
mod tests;

use tracing::{debug, info};

use super::run_blocking;
use crate::config::Config;
use crate::database::{EmbeddingRetriever, VectorStore};
use crate::document::Document;
use crate::embeddings::{OllamaClient, TextEmbedder};
use crate::generation::{ApiKey, ChatMessage, ChatPromptBuilder, OpenAiChatGenerator};
use crate::{Result, VaultError};

/// Result of answering one question
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Text of the first LLM reply
    pub reply: String,
    /// Retrieved context, best first
    pub documents: Vec<Document>,
    /// Messages sent to the LLM
    pub prompt: Vec<ChatMessage>,
}

/// embed question -> retrieve -> build prompt -> generate
#[derive(Clone)]
pub struct QueryPipeline {
    embedder: TextEmbedder,
    retriever: EmbeddingRetriever,
    prompt_builder: ChatPromptBuilder,
    generator: OpenAiChatGenerator,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        config: &Config,
        client: OllamaClient,
        store: VectorStore,
        api_key: ApiKey,
    ) -> Result<Self> {
        Ok(Self {
            embedder: TextEmbedder::new(client, config.embedding_dimension(), &config.embedder),
            retriever: EmbeddingRetriever::new(store, &config.vector_store),
            prompt_builder: ChatPromptBuilder::from_config(&config.prompt)?,
            generator: OpenAiChatGenerator::new(&config.llm, api_key)?,
        })
    }

    #[inline]
    pub async fn run(&self, question: &str) -> Result<Answer> {
        info!("Answering: {}", question);

        let embedder = self.embedder.clone();
        let text = question.to_string();
        let query_embedding = run_blocking(move || embedder.run(&text)).await?;

        let documents = self.retriever.run(&query_embedding).await?;
        debug!("Using {} documents as context", documents.len());

        let prompt = self.prompt_builder.run(question, &documents)?;

        let generator = self.generator.clone();
        let messages = prompt.clone();
        let output = run_blocking(move || generator.run(&messages)).await?;

        let reply = output
            .first_text()
            .ok_or_else(|| VaultError::Llm("No reply returned".to_string()))?
            .to_string();

        Ok(Answer {
            reply,
            documents,
            prompt,
        })
    }
}
