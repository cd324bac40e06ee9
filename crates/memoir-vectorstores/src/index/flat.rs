use memoir_core::StoreError;
use serde::{Deserialize, Serialize};

use super::Metric;

/// Exact linear-scan index. Every search measures the query against all
/// stored vectors, so results are always exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append vectors, assigning positions `len..len + n`. The whole batch
    /// is rejected on the first wrong-dimension vector; nothing is
    /// partially appended.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<Vec<usize>, StoreError> {
        check_dimensions(&vectors, self.dimension)?;
        let base = self.vectors.len();
        let positions = (base..base + vectors.len()).collect();
        self.vectors.extend(vectors);
        Ok(positions)
    }

    /// Scan all vectors and return up to `k` `(position, raw value)`
    /// pairs, best first. Ties rank by ascending position so results are
    /// deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, self.metric.measure(query, vector)))
            .collect();
        candidates.sort_by(|a, b| self.metric.compare(a.1, b.1).then(a.0.cmp(&b.0)));
        candidates.truncate(k);
        Ok(candidates)
    }

    pub fn reset(&mut self) {
        self.vectors.clear();
    }
}

/// Reject a batch containing any vector of the wrong dimension.
pub(super) fn check_dimensions(vectors: &[Vec<f32>], dimension: usize) -> Result<(), StoreError> {
    for vector in vectors {
        if vector.len() != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}
