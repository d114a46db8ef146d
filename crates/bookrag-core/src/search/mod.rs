//! Similarity scoring with interchangeable strategies.
//!
//! The [`Scorer`] trait is the single seam between the document index and
//! the ranking algorithm. Two implementations exist:
//!
//! | Scorer | Ranking | Derived structure | Mention rule |
//! |--------|---------|-------------------|--------------|
//! | [`LexicalScorer`] | query-token overlap fraction | none | `score > 0` |
//! | [`DenseScorer`] | ascending L2 distance between embeddings | [`FlatL2Index`] | all, or `distance <= max_distance` |
//!
//! Scores are always "higher is better". The dense scorer reports the
//! negative distance.

pub mod dense;
pub mod flat;
pub mod lexical;

pub use dense::DenseScorer;
pub use flat::FlatL2Index;
pub use lexical::{overlap_score, tokenize, LexicalScorer};

use std::cmp::Ordering;

use crate::error::Result;
use crate::models::Ranked;

/// A ranking strategy over the flat chunk corpus.
///
/// `corpus` is always the complete current corpus as `(position, text)`
/// pairs in position order. Strategies with a derived structure must have
/// been rebuilt over exactly these texts via [`Scorer::rebuild`].
pub trait Scorer: Send + Sync {
    /// Strategy name, e.g. `"lexical"`.
    fn name(&self) -> &str;

    /// Rebuild any derived structure for `corpus`.
    ///
    /// On error the previous structure must be left untouched, so the
    /// caller can abandon the insertion that triggered the rebuild.
    fn rebuild(&mut self, corpus: &[&str]) -> Result<()>;

    /// Drop any derived structure.
    fn reset(&mut self);

    /// Rank `corpus` against `query`, returning at most `k` entries ordered
    /// by score descending.
    fn rank(&self, query: &str, corpus: &[(usize, &str)], k: usize) -> Result<Vec<Ranked>>;

    /// Whether a ranked chunk with this score counts as a mention of the
    /// topic when grouping results by book.
    fn counts_as_mention(&self, score: f64) -> bool;
}

/// Stable sort by score descending; equal scores keep their input order.
pub fn sort_ranked(ranked: &mut [Ranked]) {
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
