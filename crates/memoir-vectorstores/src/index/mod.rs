mod flat;
mod ivf;
mod kmeans;

pub use flat::FlatIndex;
pub use ivf::IvfIndex;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use memoir_core::StoreError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// Distance metric used by an index. Determines both the raw comparison
/// value and the direction in which candidates are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Euclidean distance; 0 means identical, lower is better.
    L2,
    /// Inner product; higher is better.
    InnerProduct,
}

impl Metric {
    /// Raw comparison value between two vectors of equal dimension.
    pub fn measure(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            Metric::InnerProduct => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        }
    }

    /// Rank two raw values so that the better candidate sorts first.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        match self {
            Metric::L2 => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            Metric::InnerProduct => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        }
    }
}

// ---------------------------------------------------------------------------
// IndexType
// ---------------------------------------------------------------------------

/// Index-type tag carried by every store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    /// Exact linear scan, Euclidean distance.
    FlatL2,
    /// Exact linear scan, inner-product similarity.
    FlatIp,
    /// Approximate search over trained clusters.
    Clustered,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            IndexType::FlatL2 => "flat-l2",
            IndexType::FlatIp => "flat-ip",
            IndexType::Clustered => "clustered",
        };
        f.write_str(tag)
    }
}

impl FromStr for IndexType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "flat-l2" => Ok(IndexType::FlatL2),
            "ip" | "flat-ip" | "flat-inner-product" => Ok(IndexType::FlatIp),
            "clustered" | "ivf" => Ok(IndexType::Clustered),
            other => Err(StoreError::Config(format!(
                "unknown index type {other:?}; expected \"L2\", \"IP\", or \"clustered\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// VectorIndex
// ---------------------------------------------------------------------------

/// A set of vectors supporting nearest-neighbor search, either exact
/// (flat scan) or approximate (clustered, trained).
///
/// Positions are assigned at insertion as `current size + offset` and are
/// never reused; the only way to drop vectors is a full [`VectorIndex::reset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VectorIndex {
    Flat(FlatIndex),
    Clustered(IvfIndex),
}

impl VectorIndex {
    /// Create an empty index. `nlist`/`nprobe` only apply to the clustered
    /// variant; a clustered index starts untrained.
    pub fn new(
        index_type: IndexType,
        dimension: usize,
        nlist: usize,
        nprobe: usize,
    ) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::Config("dimension must be non-zero".into()));
        }
        match index_type {
            IndexType::FlatL2 => Ok(VectorIndex::Flat(FlatIndex::new(dimension, Metric::L2))),
            IndexType::FlatIp => Ok(VectorIndex::Flat(FlatIndex::new(
                dimension,
                Metric::InnerProduct,
            ))),
            IndexType::Clustered => Ok(VectorIndex::Clustered(IvfIndex::new(
                dimension,
                Metric::L2,
                nlist,
                nprobe,
            )?)),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            VectorIndex::Flat(index) => index.dimension(),
            VectorIndex::Clustered(index) => index.dimension(),
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            VectorIndex::Flat(index) => index.metric(),
            VectorIndex::Clustered(index) => index.metric(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(index) => index.len(),
            VectorIndex::Clustered(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            VectorIndex::Flat(index) => match index.metric() {
                Metric::L2 => IndexType::FlatL2,
                Metric::InnerProduct => IndexType::FlatIp,
            },
            VectorIndex::Clustered(_) => IndexType::Clustered,
        }
    }

    /// Whether the index is ready to accept vectors. Flat indexes always
    /// are; a clustered index only after [`VectorIndex::train`].
    pub fn is_trained(&self) -> bool {
        match self {
            VectorIndex::Flat(_) => true,
            VectorIndex::Clustered(index) => index.is_trained(),
        }
    }

    /// Append vectors, assigning each the next free position. Rejects the
    /// whole batch if any vector has the wrong dimension.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<Vec<usize>, StoreError> {
        match self {
            VectorIndex::Flat(index) => index.add(vectors),
            VectorIndex::Clustered(index) => index.add(vectors),
        }
    }

    /// Return up to `k` `(position, raw value)` pairs, best match first
    /// (ascending distance for L2, descending similarity for inner
    /// product). An empty index yields an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, StoreError> {
        match self {
            VectorIndex::Flat(index) => index.search(query, k),
            VectorIndex::Clustered(index) => index.search(query, k),
        }
    }

    /// Fit the quantizer from a representative sample. A no-op for flat
    /// indexes. There is no automatic retraining; callers rebuild the
    /// index explicitly if the data distribution drifts.
    pub fn train(&mut self, sample: &[Vec<f32>]) -> Result<(), StoreError> {
        match self {
            VectorIndex::Flat(_) => Ok(()),
            VectorIndex::Clustered(index) => index.train(sample),
        }
    }

    /// Re-initialize to an empty index of the same type, metric, and
    /// dimension, dropping all vectors (and trained state).
    pub fn reset(&mut self) {
        match self {
            VectorIndex::Flat(index) => index.reset(),
            VectorIndex::Clustered(index) => index.reset(),
        }
    }
}
