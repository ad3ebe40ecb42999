//! Flat inner-product similarity index over L2-normalized vectors.
//!
//! Vectors are normalized at insert and query time, so the inner product
//! equals cosine similarity. Position `i` of the index corresponds to
//! position `i` of the chunk list it was built from.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use tenderlens_shared::{Result, TenderlensError};

/// A flat similarity index, persistable as `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index from raw embedding vectors, normalizing each.
    ///
    /// All vectors must share one dimension; an empty input is rejected.
    pub fn from_embeddings(embeddings: Vec<Vec<f32>>) -> Result<Self> {
        let dim = embeddings.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(TenderlensError::validation(
                "cannot build an index from zero vectors",
            ));
        }
        for (i, v) in embeddings.iter().enumerate() {
            if v.len() != dim {
                return Err(TenderlensError::validation(format!(
                    "vector {i} has dimension {}, expected {dim}",
                    v.len()
                )));
            }
        }

        let vectors = embeddings
            .into_iter()
            .map(|mut v| {
                l2_normalize(&mut v);
                v
            })
            .collect();

        Ok(Self { dim, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Top-`top_k` positions by inner product against the (normalized) query.
    ///
    /// Scores are returned in descending order; exact ties keep insertion
    /// order. Callers must not rely on any ordering within a tie.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(TenderlensError::validation(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            )));
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&q, v)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Scale a vector to unit length. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_similarity_is_one() {
        let index =
            FlatIndex::from_embeddings(vec![vec![3.0, 4.0], vec![1.0, 0.0]]).unwrap();
        let hits = index.search(&[3.0, 4.0], 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert!(hits[1].1 < hits[0].1);
    }

    #[test]
    fn scores_descend_and_truncate() {
        let index = FlatIndex::from_embeddings(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
        ])
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn exact_ties_keep_insertion_order() {
        let index = FlatIndex::from_embeddings(vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![0.5, 0.0],
        ])
        .unwrap();
        // All normalize to the same unit vector.
        let positions: Vec<usize> = index
            .search(&[1.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let err = FlatIndex::from_embeddings(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("dimension"));

        let index = FlatIndex::from_embeddings(vec![vec![1.0, 0.0]]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn empty_build_rejected() {
        assert!(FlatIndex::from_embeddings(Vec::new()).is_err());
    }

    #[test]
    fn zero_vector_does_not_panic() {
        let index = FlatIndex::from_embeddings(vec![vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn serde_roundtrip() {
        let index = FlatIndex::from_embeddings(vec![vec![3.0, 4.0]]).unwrap();
        let json = serde_json::to_string(&index).unwrap();
        let parsed: FlatIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.dim(), 2);
        let hits = parsed.search(&[3.0, 4.0], 1).unwrap();
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }
}
