#[cfg(test)]
mod tests;

use std::path::PathBuf;
use tracing::{debug, info};

use super::run_blocking;
use crate::Result;
use crate::config::Config;
use crate::database::{DocumentWriter, VectorStore};
use crate::embeddings::{DocumentEmbedder, OllamaClient};
use crate::ingest::{FileTypeRouter, MARKDOWN_MIME, MarkdownToDocument, discover_files};
use crate::preprocess::{DocumentCleaner, DocumentJoiner, DocumentSplitter};

/// Counts collected over one indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexingReport {
    pub files_discovered: usize,
    pub files_routed: usize,
    pub files_skipped: usize,
    pub documents: usize,
    pub chunks: usize,
    /// Chunks with no text, from empty or whitespace-only notes
    pub empty_chunks: usize,
    pub written: usize,
}

/// discover -> route -> convert -> join -> clean -> split -> embed -> write
#[derive(Clone)]
pub struct IndexingPipeline {
    vault_root: PathBuf,
    follow_links: bool,
    router: FileTypeRouter,
    converter: MarkdownToDocument,
    joiner: DocumentJoiner,
    cleaner: DocumentCleaner,
    splitter: DocumentSplitter,
    embedder: DocumentEmbedder,
    writer: DocumentWriter,
}

impl IndexingPipeline {
    #[inline]
    pub fn new(config: &Config, client: OllamaClient, store: VectorStore) -> Result<Self> {
        Ok(Self {
            vault_root: config.vault.resolved_path(),
            follow_links: config.vault.follow_links,
            router: FileTypeRouter::markdown(),
            converter: MarkdownToDocument,
            joiner: DocumentJoiner::new(),
            cleaner: DocumentCleaner::new(config.cleaner.clone())?,
            splitter: DocumentSplitter::new(&config.splitter)?,
            embedder: DocumentEmbedder::new(
                client,
                config.embedding_dimension(),
                config.embedder.clone(),
            ),
            writer: DocumentWriter::new(store, config.vector_store.duplicate_policy),
        })
    }

    #[inline]
    pub fn vault_root(&self) -> &std::path::Path {
        &self.vault_root
    }

    /// Index every markdown file under the vault root
    #[inline]
    pub async fn run(&self) -> Result<IndexingReport> {
        info!("Indexing vault at {}", self.vault_root.display());
        let mut report = IndexingReport::default();

        let files = discover_files(&self.vault_root, self.follow_links);
        report.files_discovered = files.len();

        let mut routed = self.router.route(files);
        let markdown_files = routed.take(MARKDOWN_MIME);
        report.files_routed = markdown_files.len();
        debug!(
            "Routed {} markdown files, {} unclassified",
            markdown_files.len(),
            routed.unclassified.len()
        );

        let conversion = self.converter.run(&markdown_files);
        report.files_skipped = conversion.skipped.len();

        let documents = self.joiner.run([conversion.documents]);
        let documents = self.cleaner.run(documents)?;
        report.documents = documents.len();

        let chunks = self.splitter.run(&documents);
        report.chunks = chunks.len();
        report.empty_chunks = chunks
            .iter()
            .filter(|chunk| chunk.content.trim().is_empty())
            .count();
        if report.empty_chunks > 0 {
            debug!(
                "{} chunks are empty and will be stored without text",
                report.empty_chunks
            );
        }
        debug!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        let embedder = self.embedder.clone();
        let embedded = run_blocking(move || embedder.run(chunks)).await?;

        report.written = self.writer.run(embedded).await?;

        info!(
            "Indexed {} files into {} chunks ({} written, {} skipped)",
            report.files_routed, report.chunks, report.written, report.files_skipped
        );
        Ok(report)
    }
}
