
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::{Path, PathBuf};

use super::settings::CONFIG_FILE_NAME;
use super::{Config, ConfigError, LlmConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Vault RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Vault").bold().yellow());
    configure_vault(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama)? {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    eprintln!();
    eprintln!("{}", style("Chat Model").bold().yellow());
    configure_llm(&mut config.llm)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Vault:").bold().yellow());
    eprintln!(
        "  Path: {}",
        style(config.vault.resolved_path().display()).cyan()
    );
    eprintln!("  Follow Links: {}", style(config.vault.follow_links).cyan());

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Splitting:").bold().yellow());
    eprintln!(
        "  Window: {} words, overlap {}",
        style(config.splitter.split_length).cyan(),
        style(config.splitter.split_overlap).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Vector Store:").bold().yellow());
    eprintln!(
        "  Location: {}",
        style(config.vector_database_path().display()).cyan()
    );
    eprintln!("  Table: {}", style(&config.vector_store.table_name).cyan());
    eprintln!("  Top K: {}", style(config.vector_store.top_k).cyan());
    eprintln!(
        "  Recreate On Index: {}",
        style(config.vector_store.recreate_index).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Chat Model:").bold().yellow());
    eprintln!("  API Base: {}", style(&config.llm.api_base).cyan());
    eprintln!("  Model: {}", style(&config.llm.model).cyan());
    eprintln!("  API Key Variable: {}", style(&config.llm.api_key_env).cyan());
    eprintln!(
        "  Prompt Template: {}",
        style(if config.prompt.template.is_some() {
            "custom"
        } else {
            "built-in"
        })
        .cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Ask for the chat API key without echoing it
#[inline]
pub fn prompt_api_key(api_key_env: &str) -> Result<String> {
    let key = Password::new()
        .with_prompt(format!("{api_key_env} is not set. Enter your API key"))
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("API key cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact()
        .context("Failed to read API key")?;
    Ok(key.trim().to_string())
}

/// A missing file starts from defaults. A file that fails to parse or validate
/// is an error, so saving never overwrites settings the user wrote by hand.
fn load_existing_config(config_dir: &Path) -> Result<Config> {
    let config_path = config_dir.join(CONFIG_FILE_NAME);
    let existed = config_path.exists();

    let config = Config::load(config_dir).with_context(|| {
        format!(
            "Fix or remove {} before running the configuration wizard",
            config_path.display()
        )
    })?;

    if existed {
        eprintln!("{}", style("Found existing configuration.").green());
    } else {
        eprintln!(
            "{}",
            style("No configuration found. Starting from defaults.").yellow()
        );
    }
    Ok(config)
}

fn configure_vault(config: &mut Config) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Vault directory")
        .default(config.vault.path.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Vault path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.vault.set_path(PathBuf::from(path.trim()))?;

    config.vault.follow_links = Confirm::new()
        .with_prompt("Follow symbolic links inside the vault?")
        .default(config.vault.follow_links)
        .interact()?;

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension produced by the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_batch_size(batch_size)?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let api_base: String = Input::new()
        .with_prompt("Chat API base URL")
        .default(llm.api_base.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            LlmConfig {
                api_base: input.clone(),
                ..llm.clone()
            }
            .validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(llm.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    llm.set_api_base(api_base)?;
    llm.set_model(model)?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> Result<bool> {
    let url = format!("{}api/version", ollama.ollama_url()?);

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
