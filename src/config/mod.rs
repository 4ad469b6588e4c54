// TOML configuration and the interactive setup flow

pub mod interactive;
pub mod settings;


pub use interactive::{prompt_api_key, run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, LlmConfig, OllamaConfig, PromptConfig, VaultConfig, VectorStoreConfig,
};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_config_dir()
}
