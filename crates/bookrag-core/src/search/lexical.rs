//! Lexical set-overlap scorer.
//!
//! `score = |tokens(query) ∩ tokens(chunk)| / |tokens(query)|`, with both
//! sides treated as sets. Tokens are lowercased maximal runs of word
//! characters (alphanumerics and `_`). Nothing is precomputed: token sets
//! are rebuilt per query, which is linear in corpus text size.

use std::collections::HashSet;

use super::{sort_ranked, Scorer};
use crate::error::Result;
use crate::models::Ranked;

/// Lowercase `text` and collect its distinct word tokens.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Fraction of `query` tokens present in `candidate`, in `[0.0, 1.0]`.
///
/// Returns `0.0` when either set is empty.
pub fn overlap_score(query: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let shared = query.intersection(candidate).count();
    shared as f64 / query.len() as f64
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Scorer for LexicalScorer {
    fn name(&self) -> &str {
        "lexical"
    }

    fn rebuild(&mut self, _corpus: &[&str]) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) {}

    fn rank(&self, query: &str, corpus: &[(usize, &str)], k: usize) -> Result<Vec<Ranked>> {
        let query_tokens = tokenize(query);

        let mut ranked: Vec<Ranked> = corpus
            .iter()
            .map(|(position, text)| Ranked {
                position: *position,
                score: overlap_score(&query_tokens, &tokenize(text)),
            })
            .collect();

        sort_ranked(&mut ranked);
        ranked.truncate(k);
        Ok(ranked)
    }

    fn counts_as_mention(&self, score: f64) -> bool {
        score > 0.0
    }
}
