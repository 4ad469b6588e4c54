use std::collections::HashMap;

use tracing::debug;

use crate::document::Document;

/// Merges document batches from several upstream sources into one sequence.
///
/// Order is preserved. When the same id shows up more than once, the copy with
/// the highest score is kept at the position of the first occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentJoiner {
    top_k: Option<usize>,
}

impl DocumentJoiner {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `top_k` documents after joining
    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[inline]
    pub fn run<I>(&self, batches: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Vec<Document>>,
    {
        let mut joined: Vec<Document> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut duplicates = 0_usize;

        for document in batches.into_iter().flatten() {
            if let Some(&position) = positions.get(&document.id) {
                duplicates += 1;
                let kept = &mut joined[position];
                if document.score.unwrap_or(f32::NEG_INFINITY)
                    > kept.score.unwrap_or(f32::NEG_INFINITY)
                {
                    *kept = document;
                }
                continue;
            }

            positions.insert(document.id.clone(), joined.len());
            joined.push(document);
        }

        if let Some(top_k) = self.top_k {
            joined.truncate(top_k);
        }

        debug!(
            "Joined {} documents ({} duplicates dropped)",
            joined.len(),
            duplicates
        );
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Meta;

    fn doc(content: &str) -> Document {
        Document::new(content, Meta::new())
    }

    #[test]
    fn single_source_is_pass_through() {
        let docs = vec![doc("a"), doc("b"), doc("c")];
        let joined = DocumentJoiner::new().run([docs.clone()]);
        assert_eq!(joined, docs);
    }

    #[test]
    fn concatenates_in_order() {
        let joined = DocumentJoiner::new().run([vec![doc("a"), doc("b")], vec![doc("c")]]);
        let contents: Vec<&str> = joined.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[test]
    fn drops_duplicate_ids_keeping_best_score() {
        let mut low = doc("same");
        low.score = Some(0.2);
        let mut high = doc("same");
        high.score = Some(0.9);

        let joined = DocumentJoiner::new().run([vec![low, doc("other")], vec![high]]);

        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].content, "same");
        assert_eq!(joined[0].score, Some(0.9));
        assert_eq!(joined[1].content, "other");
    }

    #[test]
    fn top_k_truncates() {
        let joined = DocumentJoiner::new()
            .with_top_k(1)
            .run([vec![doc("a"), doc("b")]]);
        assert_eq!(joined.len(), 1);
    }

    #[test]
    fn no_batches() {
        let joined = DocumentJoiner::new().run(Vec::<Vec<Document>>::new());
        assert!(joined.is_empty());
    }
}
