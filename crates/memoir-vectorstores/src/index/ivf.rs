use memoir_core::StoreError;
use serde::{Deserialize, Serialize};

use super::flat::check_dimensions;
use super::kmeans::{fit_centroids, nearest_centroid};
use super::Metric;

/// Clustered (inverted-file) index: vectors are bucketed under trained
/// centroids and searches only scan the `nprobe` most promising buckets,
/// trading exactness for pruning.
///
/// The quantizer state is unset until [`IvfIndex::train`] has run with a
/// representative sample; adding vectors before that is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvfIndex {
    dimension: usize,
    metric: Metric,
    nlist: usize,
    nprobe: usize,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<(usize, Vec<f32>)>>,
    size: usize,
}

impl IvfIndex {
    pub fn new(
        dimension: usize,
        metric: Metric,
        nlist: usize,
        nprobe: usize,
    ) -> Result<Self, StoreError> {
        if nlist == 0 {
            return Err(StoreError::Config("nlist must be non-zero".into()));
        }
        if nprobe == 0 {
            return Err(StoreError::Config("nprobe must be non-zero".into()));
        }
        Ok(Self {
            dimension,
            metric,
            nlist,
            nprobe,
            centroids: Vec::new(),
            lists: Vec::new(),
            size: 0,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn nlist(&self) -> usize {
        self.nlist
    }

    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Fit centroids from `sample` and re-initialize the inverted lists,
    /// dropping any previously added vectors. The effective cluster count
    /// is capped at the sample size when the sample is smaller than
    /// `nlist`.
    pub fn train(&mut self, sample: &[Vec<f32>]) -> Result<(), StoreError> {
        check_dimensions(sample, self.dimension)?;
        let k = self.nlist.min(sample.len().max(1));
        if k < self.nlist {
            tracing::warn!(
                nlist = self.nlist,
                sample = sample.len(),
                "training sample smaller than nlist; capping cluster count"
            );
        }
        self.centroids = fit_centroids(sample, k, self.metric)?;
        self.lists = vec![Vec::new(); self.centroids.len()];
        self.size = 0;
        Ok(())
    }

    /// Append vectors, assigning positions `len..len + n` and bucketing
    /// each under its nearest centroid. Fails if the index is untrained or
    /// any vector has the wrong dimension (nothing partially appended).
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<Vec<usize>, StoreError> {
        if !self.is_trained() {
            return Err(StoreError::Config(
                "clustered index must be trained before vectors are added".into(),
            ));
        }
        check_dimensions(&vectors, self.dimension)?;

        let base = self.size;
        let mut positions = Vec::with_capacity(vectors.len());
        for (offset, vector) in vectors.into_iter().enumerate() {
            let position = base + offset;
            let list = nearest_centroid(&vector, &self.centroids, self.metric);
            self.lists[list].push((position, vector));
            positions.push(position);
        }
        self.size = base + positions.len();
        Ok(positions)
    }

    /// Probe the `nprobe` best-ranked buckets and return up to `k`
    /// `(position, raw value)` pairs, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.size == 0 {
            return Ok(Vec::new());
        }

        // Rank centroids by the metric, then scan the top nprobe lists.
        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, centroid)| (i, self.metric.measure(query, centroid)))
            .collect();
        ranked.sort_by(|a, b| self.metric.compare(a.1, b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.nprobe);

        let mut candidates: Vec<(usize, f32)> = ranked
            .iter()
            .flat_map(|(list, _)| self.lists[*list].iter())
            .map(|(position, vector)| (*position, self.metric.measure(query, vector)))
            .collect();
        candidates.sort_by(|a, b| self.metric.compare(a.1, b.1).then(a.0.cmp(&b.0)));
        candidates.truncate(k);
        Ok(candidates)
    }

    /// Back to an empty, untrained index of the same shape.
    pub fn reset(&mut self) {
        self.centroids.clear();
        self.lists.clear();
        self.size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.1, 0.9, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.1, 0.9],
        ]
    }

    #[test]
    fn add_before_train_is_rejected() {
        let mut index = IvfIndex::new(3, Metric::L2, 2, 1).unwrap();
        let err = index.add(vec![vec![1.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn train_then_add_then_search() {
        let mut index = IvfIndex::new(3, Metric::L2, 3, 3).unwrap();
        let vectors = sample();
        index.train(&vectors).unwrap();
        assert!(index.is_trained());

        let positions = index.add(vectors).unwrap();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(index.len(), 6);

        // Probing every list makes the search exhaustive, so the exact
        // match must come back first with distance zero.
        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0, 0);
        assert!(results[0].1.abs() < 1e-6);
    }

    #[test]
    fn search_probes_subset_of_lists() {
        let mut index = IvfIndex::new(3, Metric::L2, 3, 1).unwrap();
        let vectors = sample();
        index.train(&vectors).unwrap();
        index.add(vectors).unwrap();

        // With one probe only the query's own cluster is scanned; all
        // returned candidates must then be near the query axis.
        let results = index.search(&[1.0, 0.0, 0.0], 6).unwrap();
        assert!(!results.is_empty());
        assert!(results.len() < 6);
        for (_, distance) in &results {
            assert!(*distance < 1.0);
        }
    }

    #[test]
    fn train_caps_nlist_to_sample_size() {
        let mut index = IvfIndex::new(2, Metric::L2, 100, 10).unwrap();
        index.train(&[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        assert!(index.is_trained());
        index.add(vec![vec![0.1, 0.1]]).unwrap();
        let results = index.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn retrain_drops_existing_vectors() {
        let mut index = IvfIndex::new(2, Metric::L2, 2, 2).unwrap();
        let vectors = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        index.train(&vectors).unwrap();
        index.add(vectors.clone()).unwrap();
        assert_eq!(index.len(), 2);

        index.train(&vectors).unwrap();
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn reset_returns_to_untrained() {
        let mut index = IvfIndex::new(2, Metric::L2, 2, 2).unwrap();
        let vectors = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        index.train(&vectors).unwrap();
        index.add(vectors).unwrap();

        index.reset();
        assert!(!index.is_trained());
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 2);
    }

    #[test]
    fn zero_nlist_or_nprobe_rejected() {
        assert!(IvfIndex::new(2, Metric::L2, 0, 1).is_err());
        assert!(IvfIndex::new(2, Metric::L2, 4, 0).is_err());
    }

    #[test]
    fn untrained_search_is_empty() {
        let index = IvfIndex::new(2, Metric::L2, 2, 1).unwrap();
        assert!(index.search(&[0.0, 0.0], 3).unwrap().is_empty());
    }
}
