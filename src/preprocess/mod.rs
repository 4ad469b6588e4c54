// Document preprocessing
// Joining, cleaning and splitting between conversion and embedding

pub mod cleaner;
pub mod joiner;
pub mod splitter;

pub use cleaner::{CleanerConfig, DocumentCleaner};
pub use joiner::DocumentJoiner;
pub use splitter::{DocumentSplitter, SplitterConfig, split_words};
