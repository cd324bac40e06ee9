mod index;
mod local;
mod registry;
mod scoring;

pub use index::{FlatIndex, IndexType, IvfIndex, Metric, VectorIndex};
pub use local::{LocalStoreConfig, LocalVectorStore};
pub use registry::DocumentRegistry;
pub use scoring::normalize_score;

// Re-export core traits/types for backward compatibility
pub use memoir_core::{
    Embeddings, StoreError, StoreStats, VectorStore, DEFAULT_SCORE_THRESHOLD, DEFAULT_SEARCH_LIMIT,
};
