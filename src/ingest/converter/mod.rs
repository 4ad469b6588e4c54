#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, META_FILE_PATH, META_TITLE, Meta};
use crate::{Result, VaultError};

/// Plain text rendered from a markdown source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownText {
    pub text: String,
    /// First H1, or the first heading of any level
    pub title: Option<String>,
}

/// A file that could not be converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of converting a batch of files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOutput {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Converts markdown files into one document each
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownToDocument;

impl MarkdownToDocument {
    /// Convert every file in `sources`. Unreadable files are skipped, never fatal.
    #[inline]
    pub fn run(&self, sources: &[PathBuf]) -> ConversionOutput {
        let mut output = ConversionOutput::default();

        for path in sources {
            match self.convert_file(path) {
                Ok(document) => output.documents.push(document),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    output.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Converted {} markdown files ({} skipped)",
            output.documents.len(),
            output.skipped.len()
        );
        output
    }

    #[inline]
    pub fn convert_file(&self, path: &Path) -> Result<Document> {
        let bytes = fs::read(path)?;
        let markdown = String::from_utf8(bytes).map_err(|_| {
            VaultError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "file is not valid UTF-8",
            ))
        })?;

        let rendered = markdown_to_text(&markdown);

        let mut meta = Meta::new();
        meta.insert(
            META_FILE_PATH.to_string(),
            Value::String(path.display().to_string()),
        );
        if let Some(title) = rendered.title {
            meta.insert(META_TITLE.to_string(), Value::String(title));
        }

        Ok(Document::new(rendered.text, meta))
    }
}

/// Render markdown to plain text, keeping block structure as line breaks.
///
/// Emphasis markers, links and inline HTML are dropped; code is kept verbatim.
/// YAML front matter is not part of the output.
#[inline]
pub fn markdown_to_text(markdown: &str) -> MarkdownText {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
    let parser = Parser::new_ext(markdown, options);

    let mut text = String::new();
    let mut heading_text = String::new();
    let mut first_heading: Option<String> = None;
    let mut first_h1: Option<String> = None;
    let mut in_heading = false;
    let mut in_metadata = false;
    let mut list_depth = 0_usize;

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } => {
                    block_break(&mut text);
                    in_heading = true;
                    heading_text.clear();
                }
                Tag::Paragraph | Tag::CodeBlock(_) | Tag::BlockQuote(_) | Tag::Table(_) => {
                    block_break(&mut text);
                }
                Tag::List(_) => {
                    if list_depth == 0 {
                        block_break(&mut text);
                    } else {
                        line_break(&mut text);
                    }
                    list_depth += 1;
                }
                Tag::Item => {
                    line_break(&mut text);
                    text.push_str("- ");
                }
                Tag::MetadataBlock(_) => in_metadata = true,
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(level) => {
                    in_heading = false;
                    let heading = heading_text.trim().to_string();
                    if !heading.is_empty() {
                        if level == HeadingLevel::H1 && first_h1.is_none() {
                            first_h1 = Some(heading.clone());
                        }
                        first_heading.get_or_insert(heading);
                    }
                    text.push('\n');
                }
                TagEnd::Paragraph | TagEnd::CodeBlock | TagEnd::Item | TagEnd::TableRow
                | TagEnd::TableHead => line_break(&mut text),
                TagEnd::List(_) => list_depth = list_depth.saturating_sub(1),
                TagEnd::TableCell => text.push('\t'),
                TagEnd::MetadataBlock(_) => in_metadata = false,
                _ => {}
            },
            Event::Text(content) | Event::Code(content) => {
                if in_metadata {
                    continue;
                }
                if in_heading {
                    heading_text.push_str(&content);
                }
                text.push_str(&content);
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_heading {
                    heading_text.push(' ');
                }
                text.push('\n');
            }
            Event::TaskListMarker(checked) => {
                text.push_str(if checked { "[x] " } else { "[ ] " });
            }
            Event::Rule => block_break(&mut text),
            _ => {}
        }
    }

    MarkdownText {
        text: text.trim().to_string(),
        title: first_h1.or(first_heading),
    }
}

/// Ensure the text ends with a blank line (unless empty)
fn block_break(text: &mut String) {
    if text.is_empty() {
        return;
    }
    while !text.ends_with("\n\n") {
        text.push('\n');
    }
}

/// Ensure the text ends with a newline (unless empty)
fn line_break(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}
