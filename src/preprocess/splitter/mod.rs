
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::document::{Document, META_SOURCE_ID, META_SPLIT_ID, META_SPLIT_IDX_START};
use crate::{Result, VaultError};

/// Configuration for word-window splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Number of words per chunk
    pub split_length: usize,
    /// Number of words shared by adjacent chunks
    pub split_overlap: usize,
}

impl Default for SplitterConfig {
    #[inline]
    fn default() -> Self {
        Self {
            split_length: 150,
            split_overlap: 50,
        }
    }
}

impl SplitterConfig {
    /// Words between the starts of two adjacent windows
    #[inline]
    pub fn stride(&self) -> usize {
        self.split_length.saturating_sub(self.split_overlap)
    }
}

/// Splits documents into overlapping windows of words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSplitter {
    split_length: usize,
    split_overlap: usize,
}

impl DocumentSplitter {
    #[inline]
    pub fn new(config: &SplitterConfig) -> Result<Self> {
        if config.split_length == 0 {
            return Err(VaultError::Config(
                "split_length must be greater than 0".to_string(),
            ));
        }
        if config.split_overlap >= config.split_length {
            return Err(VaultError::Config(format!(
                "split_overlap ({}) must be smaller than split_length ({})",
                config.split_overlap, config.split_length
            )));
        }

        Ok(Self {
            split_length: config.split_length,
            split_overlap: config.split_overlap,
        })
    }

    /// Split every document, keeping document order
    #[inline]
    pub fn run(&self, documents: &[Document]) -> Vec<Document> {
        let chunks: Vec<Document> = documents.iter().flat_map(|d| self.split(d)).collect();
        debug!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        chunks
    }

    /// Split one document into windows of `split_length` words.
    ///
    /// Always returns at least one chunk. Each chunk is an exact substring of
    /// the parent and inherits its metadata plus the split position. An empty
    /// document yields one empty chunk, which is still embedded and stored.
    #[inline]
    pub fn split(&self, document: &Document) -> Vec<Document> {
        let units = split_words(&document.content);

        if units.len() <= self.split_length {
            // Already fits one window: split metadata the document carries wins,
            // so re-splitting a chunk gives the same chunk back.
            let mut meta = document.meta.clone();
            meta.entry(META_SOURCE_ID)
                .or_insert_with(|| Value::String(document.id.clone()));
            meta.entry(META_SPLIT_ID).or_insert(Value::from(0_u64));
            meta.entry(META_SPLIT_IDX_START)
                .or_insert(Value::from(0_u64));
            return vec![Document::new(document.content.clone(), meta)];
        }

        let stride = self.split_length - self.split_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut char_offset = 0;
        let mut offset_unit = 0;

        loop {
            let end = (start + self.split_length).min(units.len());

            char_offset += units[offset_unit..start]
                .iter()
                .map(|unit| unit.chars().count())
                .sum::<usize>();
            offset_unit = start;

            let content: String = units[start..end].concat();
            let mut meta = document.meta.clone();
            meta.insert(
                META_SOURCE_ID.to_string(),
                Value::String(document.id.clone()),
            );
            meta.insert(META_SPLIT_ID.to_string(), Value::from(chunks.len()));
            meta.insert(META_SPLIT_IDX_START.to_string(), Value::from(char_offset));
            chunks.push(Document::new(content, meta));

            if end == units.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}

/// Split text into word units: each unit is a word followed by the whitespace
/// after it. Concatenating the units gives back the original text; leading
/// whitespace belongs to the first unit.
#[inline]
pub fn split_words(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let word_start = rest
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(rest.len());
        let (_, from_word) = rest.split_at(word_start);
        let word_len = from_word
            .find(char::is_whitespace)
            .unwrap_or(from_word.len());
        let (_, from_gap) = from_word.split_at(word_len);
        let gap_len = from_gap
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(from_gap.len());

        let (unit, tail) = rest.split_at(word_start + word_len + gap_len);
        units.push(unit);
        rest = tail;
    }

    units
}
