
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{Result, VaultError};

pub const MARKDOWN_MIME: &str = "text/markdown";

/// Recursively list the regular files below `root`, sorted by path.
///
/// A missing root yields an empty list rather than an error.
#[inline]
pub fn discover_files(root: &Path, follow_links: bool) -> Vec<PathBuf> {
    if !root.exists() {
        warn!("Vault directory {} does not exist", root.display());
        return Vec::new();
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(follow_links)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable vault entry: {}", e),
        }
    }

    files.sort();
    debug!("Discovered {} files under {}", files.len(), root.display());
    files
}

/// Guess the MIME type of a file from its extension
#[inline]
pub fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "md" | "markdown" => Some(MARKDOWN_MIME),
        "txt" | "text" => Some("text/plain"),
        "html" | "htm" => Some("text/html"),
        "pdf" => Some("application/pdf"),
        "json" => Some("application/json"),
        _ => None,
    }
}

/// Files grouped by MIME type after routing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedFiles {
    pub by_mime: BTreeMap<String, Vec<PathBuf>>,
    /// Files whose type is unknown or not accepted by the router
    pub unclassified: Vec<PathBuf>,
}

impl RoutedFiles {
    /// Files routed to `mime_type`
    #[inline]
    pub fn get(&self, mime_type: &str) -> &[PathBuf] {
        self.by_mime.get(mime_type).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn take(&mut self, mime_type: &str) -> Vec<PathBuf> {
        self.by_mime.remove(mime_type).unwrap_or_default()
    }

    #[inline]
    pub fn routed_count(&self) -> usize {
        self.by_mime.values().map(Vec::len).sum()
    }
}

/// Routes file paths to outputs keyed by MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeRouter {
    mime_types: Vec<String>,
}

impl FileTypeRouter {
    #[inline]
    pub fn new(mime_types: Vec<String>) -> Result<Self> {
        if mime_types.is_empty() {
            return Err(VaultError::Config(
                "FileTypeRouter needs at least one MIME type".to_string(),
            ));
        }
        Ok(Self { mime_types })
    }

    /// Router that only accepts markdown
    #[inline]
    pub fn markdown() -> Self {
        Self {
            mime_types: vec![MARKDOWN_MIME.to_string()],
        }
    }

    #[inline]
    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    /// Split `paths` by MIME type. Every accepted type gets an entry, even when empty.
    #[inline]
    pub fn route(&self, paths: Vec<PathBuf>) -> RoutedFiles {
        let mut routed = RoutedFiles {
            by_mime: self
                .mime_types
                .iter()
                .map(|mime| (mime.clone(), Vec::new()))
                .collect(),
            unclassified: Vec::new(),
        };

        for path in paths {
            match guess_mime_type(&path).and_then(|mime| routed.by_mime.get_mut(mime)) {
                Some(bucket) => bucket.push(path),
                None => {
                    debug!("Dropping unclassified file {}", path.display());
                    routed.unclassified.push(path);
                }
            }
        }

        routed
    }
}
