
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::{Result, VaultError};

/// Options for [`DocumentCleaner`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Drop lines that are empty after cleaning
    pub remove_empty_lines: bool,
    /// Collapse runs of spaces and tabs and trim every line
    pub remove_extra_whitespaces: bool,
    /// Strip control characters other than newline and tab
    pub remove_control_characters: bool,
    /// Literal substrings removed from the content
    pub remove_substrings: Vec<String>,
    /// Pattern whose matches are removed from the content
    pub remove_regex: Option<String>,
    /// Keep the original document id instead of deriving one from the cleaned content
    pub keep_id: bool,
}

impl Default for CleanerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            remove_empty_lines: true,
            remove_extra_whitespaces: true,
            remove_control_characters: true,
            remove_substrings: Vec::new(),
            remove_regex: None,
            keep_id: false,
        }
    }
}

/// Normalizes document text. Never changes the number of documents.
#[derive(Debug, Clone)]
pub struct DocumentCleaner {
    config: CleanerConfig,
    regex: Option<Regex>,
}

impl DocumentCleaner {
    #[inline]
    pub fn new(config: CleanerConfig) -> Result<Self> {
        let regex = config
            .remove_regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| VaultError::Config(format!("Invalid cleaner regex: {}", e)))?;

        Ok(Self { config, regex })
    }

    #[inline]
    pub fn run(&self, documents: Vec<Document>) -> Result<Vec<Document>> {
        let count = documents.len();
        let cleaned = documents
            .into_iter()
            .map(|mut document| {
                document.content = self.clean_text(&document.content)?;
                if !self.config.keep_id {
                    document.regenerate_id();
                }
                Ok(document)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Cleaned {} documents", count);
        Ok(cleaned)
    }

    #[inline]
    pub fn clean_text(&self, text: &str) -> Result<String> {
        let mut cleaned = if self.config.remove_control_characters {
            text.chars()
                .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
                .collect()
        } else {
            text.to_string()
        };

        for substring in self.config.remove_substrings.iter().filter(|s| !s.is_empty()) {
            cleaned = cleaned.replace(substring.as_str(), "");
        }

        if let Some(regex) = &self.regex {
            cleaned = regex
                .try_replacen(&cleaned, 0, "")
                .map_err(|e| VaultError::Config(format!("Cleaner regex failed: {}", e)))?
                .into_owned();
        }

        if self.config.remove_extra_whitespaces {
            cleaned = cleaned
                .lines()
                .map(|line| {
                    line.split([' ', '\t'])
                        .filter(|word| !word.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n");
        }

        if self.config.remove_empty_lines {
            cleaned = cleaned
                .lines()
                .filter(|line| !line.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
        }

        Ok(cleaned)
    }
}
