// Ingestion front end
// File discovery, MIME routing and markdown conversion

pub mod converter;
pub mod router;

pub use converter::{ConversionOutput, MarkdownText, MarkdownToDocument, SkippedFile};
pub use router::{FileTypeRouter, MARKDOWN_MIME, RoutedFiles, discover_files, guess_mime_type};
