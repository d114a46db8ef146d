//! Flat exact nearest-neighbour structure over L2 distance.
//!
//! Brute-force search over every stored vector. There is no delete or
//! update primitive: when the corpus changes the structure is built again.
//! Slot `i` holds the embedding of corpus position `i`.

use std::cmp::Ordering;

use crate::embedding::squared_l2;
use crate::error::{Result, RetrievalError};

#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dims: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// Build from `vectors`. All vectors must share one non-zero dimension.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dims = vectors.first().map(Vec::len).unwrap_or(0);
        if !vectors.is_empty() && dims == 0 {
            return Err(RetrievalError::Dimension {
                expected: 1,
                found: 0,
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(RetrievalError::Dimension {
                expected: dims,
                found: bad.len(),
            });
        }
        Ok(Self { dims, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Return up to `k` `(slot, distance)` pairs, nearest first.
    ///
    /// `k` is clamped to the number of stored vectors. Equal distances keep
    /// slot order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(RetrievalError::Dimension {
                expected: self.dims,
                found: query.len(),
            });
        }

        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, v)| (slot, squared_l2(query, v)))
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        hits.truncate(k.min(self.vectors.len()));

        Ok(hits.into_iter().map(|(slot, d)| (slot, d.sqrt())).collect())
    }
}
