use anyhow::{Context, Result, bail};
use console::style;
use tracing::info;

use crate::config::{Config, prompt_api_key};
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::generation::ApiKey;
use crate::pipeline::{Answer, IndexingPipeline, IndexingReport, QueryPipeline};

/// Question asked when the binary runs without a subcommand
pub const EXAMPLE_QUESTION: &str = "Summarize my notes about business.";

/// Use the key from the environment when it is set, otherwise ask for one
#[inline]
pub fn resolve_api_key<F>(env_value: Option<String>, prompt: F) -> Result<ApiKey>
where
    F: FnOnce() -> Result<String>,
{
    let key = match env_value.filter(|value| !value.trim().is_empty()) {
        Some(value) => value,
        None => prompt()?,
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("No API key provided");
    }
    Ok(ApiKey::new(key))
}

/// Read the chat API key from the configured variable or a hidden prompt
#[inline]
pub fn acquire_api_key(config: &Config) -> Result<ApiKey> {
    let variable = &config.llm.api_key_env;
    resolve_api_key(std::env::var(variable).ok(), || prompt_api_key(variable))
}

async fn connected_ollama(config: &Config) -> Result<OllamaClient> {
    let client = OllamaClient::new(&config.ollama)?;
    let probe = client.clone();
    tokio::task::spawn_blocking(move || probe.health_check())
        .await
        .context("Ollama health check task failed")?
        .with_context(|| {
            format!(
                "Ollama is not ready at {}:{} with model {}",
                config.ollama.host, config.ollama.port, config.ollama.model
            )
        })?;
    Ok(client)
}

/// Build the vector index from the vault.
///
/// With `recreate_index` set the old table is dropped before embedding starts,
/// so a failed run leaves the index empty until the next successful one.
#[inline]
pub async fn index_vault(config: &Config) -> Result<IndexingReport> {
    let client = connected_ollama(config).await?;
    let store = VectorStore::open(config)
        .await
        .context("Failed to open vector store")?;

    let pipeline = IndexingPipeline::new(config, client, store)?;
    let report = pipeline.run().await.context("Indexing failed")?;

    println!(
        "Indexed {} notes from {} into {} chunks",
        report.documents,
        pipeline.vault_root().display(),
        report.chunks
    );
    if report.files_skipped > 0 {
        println!("  Skipped {} unreadable files", report.files_skipped);
    }
    if report.empty_chunks > 0 {
        println!("  {} notes had no text", report.empty_chunks);
    }

    Ok(report)
}

/// Answer `question` from the existing index
#[inline]
pub async fn ask(config: &Config, question: &str, api_key: ApiKey) -> Result<Answer> {
    let client = OllamaClient::new(&config.ollama)?;
    let store = VectorStore::connect(config)
        .await
        .context("Failed to open vector store")?;

    let pipeline = QueryPipeline::new(config, client, store, api_key)?;
    let answer = pipeline.run(question).await.context("Query failed")?;

    print_answer(&answer);
    Ok(answer)
}

/// Acquire credentials, rebuild the index, then ask the example question
#[inline]
pub async fn run_default(config: &Config) -> Result<()> {
    let api_key = acquire_api_key(config)?;
    index_vault(config).await?;
    info!("Running example query");
    ask(config, EXAMPLE_QUESTION, api_key).await?;
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.reply);

    if answer.documents.is_empty() {
        eprintln!("{}", style("(no matching notes)").dim());
        return;
    }

    eprintln!();
    eprintln!("{}", style("Sources:").bold());
    for document in &answer.documents {
        eprintln!(
            "  {} {}",
            style(format!("{:.3}", document.score.unwrap_or_default())).cyan(),
            document.file_path().unwrap_or("<unknown>")
        );
    }
}
