//! Embedding provider trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that the dense scorer consumes, plus the
//! pure distance helpers used by the flat search structure.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `bookrag`
//! app crate.

use anyhow::Result;

/// Trait for embedding providers.
///
/// Calls are blocking. Implementations must return exactly one vector per
/// input text, in input order, each of length [`dims`](Embedder::dims).
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }
}

/// Squared Euclidean distance between two vectors.
///
/// Returns `f32::INFINITY` for vectors of different lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean (L2) distance between two vectors.
///
/// ```rust
/// use bookrag_core::embedding::l2_distance;
///
/// assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
/// ```
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_l2(a, b).sqrt()
}
