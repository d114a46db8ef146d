//! Dense nearest-neighbour scorer.
//!
//! Chunks and queries are embedded through an [`Embedder`]; chunks are
//! ranked by ascending L2 distance to the query in a [`FlatL2Index`].
//!
//! The corpus only grows between resets, so a rebuild reuses the vectors
//! already held by the current structure for the unchanged prefix and only
//! embeds the new tail. The structure itself is always rebuilt whole.

use std::sync::Arc;

use super::{FlatL2Index, Scorer};
use crate::embedding::Embedder;
use crate::error::{Result, RetrievalError};
use crate::models::Ranked;

pub struct DenseScorer {
    embedder: Arc<dyn Embedder>,
    index: Option<FlatL2Index>,
    max_distance: Option<f32>,
}

impl DenseScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            index: None,
            max_distance: None,
        }
    }

    /// Only count neighbours within `max_distance` as topic mentions.
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Number of chunks covered by the current search structure.
    pub fn indexed_len(&self) -> usize {
        self.index.as_ref().map(FlatL2Index::len).unwrap_or(0)
    }
}

impl Scorer for DenseScorer {
    fn name(&self) -> &str {
        "dense"
    }

    fn rebuild(&mut self, corpus: &[&str]) -> Result<()> {
        let mut vectors: Vec<Vec<f32>> = match &self.index {
            Some(index) if index.len() <= corpus.len() => index.vectors().to_vec(),
            _ => Vec::new(),
        };

        let fresh: Vec<String> = corpus[vectors.len()..]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if !fresh.is_empty() {
            let embedded = self
                .embedder
                .embed(&fresh)
                .map_err(RetrievalError::Embedding)?;
            if embedded.len() != fresh.len() {
                return Err(RetrievalError::Embedding(anyhow::anyhow!(
                    "provider returned {} vectors for {} texts",
                    embedded.len(),
                    fresh.len()
                )));
            }
            vectors.extend(embedded);
        }

        tracing::debug!(
            chunks = vectors.len(),
            embedded = fresh.len(),
            model = self.embedder.model_name(),
            "rebuilding flat L2 index"
        );

        let index = FlatL2Index::build(vectors)?;
        self.index = Some(index);
        Ok(())
    }

    fn reset(&mut self) {
        self.index = None;
    }

    fn rank(&self, query: &str, corpus: &[(usize, &str)], k: usize) -> Result<Vec<Ranked>> {
        if corpus.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let index = match &self.index {
            Some(index) if index.len() == corpus.len() => index,
            _ => {
                return Err(RetrievalError::StaleIndex {
                    indexed: self.indexed_len(),
                    corpus: corpus.len(),
                })
            }
        };

        let query_vec = self
            .embedder
            .embed_one(query)
            .map_err(RetrievalError::Embedding)?;

        let hits = index.search(&query_vec, k.min(corpus.len()))?;

        Ok(hits
            .into_iter()
            .map(|(slot, distance)| Ranked {
                position: corpus[slot].0,
                score: -(distance as f64),
            })
            .collect())
    }

    fn counts_as_mention(&self, score: f64) -> bool {
        match self.max_distance {
            Some(max) => -score <= max as f64,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds each text as (count of 'a', count of 'b').
    struct LetterCounts {
        calls: AtomicUsize,
        embedded: AtomicUsize,
        fail: bool,
    }

    impl LetterCounts {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                embedded: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    impl Embedder for LetterCounts {
        fn model_name(&self) -> &str {
            "letter-counts"
        }
        fn dims(&self) -> usize {
            2
        }
        fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            if self.fail {
                anyhow::bail!("provider offline");
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    vec![
                        t.matches('a').count() as f32,
                        t.matches('b').count() as f32,
                    ]
                })
                .collect())
        }
    }

    fn corpus<'a>(texts: &[&'a str]) -> Vec<(usize, &'a str)> {
        texts.iter().copied().enumerate().collect()
    }

    #[test]
    fn test_nearest_chunk_ranks_first() {
        let texts = ["aaaa", "bbbb", "ab"];
        let mut scorer = DenseScorer::new(Arc::new(LetterCounts::new()));
        scorer.rebuild(&texts).unwrap();

        let ranked = scorer.rank("bbb", &corpus(&texts), 3).unwrap();
        assert_eq!(ranked[0].position, 1);
        assert!((ranked[0].score + 1.0).abs() < 1e-6);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_k_clamped_to_corpus() {
        let texts = ["a", "b"];
        let mut scorer = DenseScorer::new(Arc::new(LetterCounts::new()));
        scorer.rebuild(&texts).unwrap();
        assert_eq!(scorer.rank("a", &corpus(&texts), 10).unwrap().len(), 2);
    }

    #[test]
    fn test_rebuild_only_embeds_new_tail() {
        let embedder = Arc::new(LetterCounts::new());
        let mut scorer = DenseScorer::new(embedder.clone());

        scorer.rebuild(&["a", "b"]).unwrap();
        scorer.rebuild(&["a", "b", "ab"]).unwrap();

        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);
        assert_eq!(scorer.indexed_len(), 3);
    }

    #[test]
    fn test_reset_forces_full_embed() {
        let embedder = Arc::new(LetterCounts::new());
        let mut scorer = DenseScorer::new(embedder.clone());

        scorer.rebuild(&["a", "b"]).unwrap();
        scorer.reset();
        assert_eq!(scorer.indexed_len(), 0);
        scorer.rebuild(&["aa"]).unwrap();

        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);
        assert_eq!(scorer.indexed_len(), 1);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_structure() {
        let mut scorer = DenseScorer::new(Arc::new(LetterCounts::new()));
        scorer.rebuild(&["a"]).unwrap();

        scorer.embedder = Arc::new(LetterCounts::failing());
        let err = scorer.rebuild(&["a", "b"]).unwrap_err();

        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert_eq!(scorer.indexed_len(), 1);
    }

    #[test]
    fn test_stale_structure_is_an_error() {
        let mut scorer = DenseScorer::new(Arc::new(LetterCounts::new()));
        scorer.rebuild(&["a"]).unwrap();

        let err = scorer.rank("a", &corpus(&["a", "b"]), 2).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::StaleIndex {
                indexed: 1,
                corpus: 2
            }
        ));
    }

    #[test]
    fn test_mention_rule_without_cutoff_counts_everything() {
        let scorer = DenseScorer::new(Arc::new(LetterCounts::new()));
        assert!(scorer.counts_as_mention(-1_000.0));
    }

    #[test]
    fn test_mention_rule_with_cutoff() {
        let scorer =
            DenseScorer::new(Arc::new(LetterCounts::new())).with_max_distance(Some(1.5));
        assert!(scorer.counts_as_mention(-1.5));
        assert!(!scorer.counts_as_mention(-1.6));
    }
}
