use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vault_rag::commands::{acquire_api_key, ask, index_vault, run_default};
use vault_rag::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "vault-rag")]
#[command(about = "Index a markdown note vault and ask questions about it")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector index (default: ~/.vault-rag)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,
    /// Vault directory to index, overriding the configured path
    #[arg(long, global = true, value_name = "DIR")]
    vault: Option<PathBuf>,
    /// Without a subcommand: index the vault, then ask an example question
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the vault, Ollama and the chat model
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Rebuild the vector index from the vault
    Index,
    /// Ask a question against the existing index
    Ask {
        /// The question, e.g. "What did I write about pricing?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    if let Some(Commands::Config { show: false }) = cli.command {
        return run_interactive_config(&config_dir);
    }

    let mut config = Config::load(&config_dir)?;
    if let Some(vault) = cli.vault {
        config.vault.set_path(vault)?;
    }

    match cli.command {
        None => run_default(&config).await?,
        Some(Commands::Config { .. }) => show_config(&config)?,
        Some(Commands::Index) => {
            index_vault(&config).await?;
        }
        Some(Commands::Ask { question }) => {
            let api_key = acquire_api_key(&config)?;
            ask(&config, &question.join(" "), api_key).await?;
        }
    }

    Ok(())
}
