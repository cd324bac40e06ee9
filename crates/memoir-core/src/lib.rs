use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default number of results returned by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 3;

/// Default minimum normalized similarity score for a result to be kept.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for the Memoir retrieval layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A precondition on the store's configuration failed: no embedding
    /// provider for a save/search call, an invalid index-type selector,
    /// or an operation the backend does not support. Not retried; the
    /// caller must fix the configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// A vector does not match the store's configured dimension. Implies
    /// a misconfigured embedding provider; fatal to the call.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// A registry lookup beyond the current length. Indicates an
    /// index/registry desync and is surfaced, never silently recovered.
    #[error("position {position} out of range (registry length {len})")]
    OutOfRange { position: usize, len: usize },
    /// The chosen backend cannot be reached or constructed. Raised at
    /// construction time so callers fail fast.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The embedding provider failed or returned malformed output.
    #[error("embedding error: {0}")]
    Embedding(String),
    /// A remote backend operation failed at runtime.
    #[error("backend error: {0}")]
    Backend(String),
    /// Reading or writing a store snapshot failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

// ---------------------------------------------------------------------------
// Embeddings trait (implementations in memoir-embeddings and downstream)
// ---------------------------------------------------------------------------

/// Converts text to fixed-dimension vectors. Providers are injected into
/// stores at construction; the store never fixes which one is used.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a batch of texts in a single provider call. Batch operations
    /// on stores call this exactly once, which is what amortizes the
    /// provider round-trip.
    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut vectors = self.embed_texts(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| StoreError::Embedding("provider returned no vector for query".into()))
    }
}

// ---------------------------------------------------------------------------
// StoreStats
// ---------------------------------------------------------------------------

/// Read-only statistics surface exposed by every store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub index_size: usize,
    pub dimension: usize,
    pub index_type: String,
}

// ---------------------------------------------------------------------------
// VectorStore trait (implementations in memoir-vectorstores, memoir-qdrant,
// memoir-mongodb)
// ---------------------------------------------------------------------------

/// The store facade: embedding provider + vector index + document registry
/// composed into one unit, implemented equivalently by the in-process,
/// Qdrant, and MongoDB backends.
///
/// The default methods encode the degraded single-collection behaviors of
/// the in-process backend (`has_collection` is always true,
/// `create_collection` resets). Backends with real multi-collection
/// semantics override them. Callers are written against this lowest common
/// denominator, so the trivial behaviors are contractual.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Save a single text. Equivalent to a one-element `save_batch`.
    async fn save(&self, text: &str) -> Result<(), StoreError> {
        self.save_batch(&[text.to_string()]).await
    }

    /// Embed all texts in one provider call and append them to the index
    /// and registry in input order. A no-op on empty input.
    ///
    /// Not atomic: if the insert fails after embedding succeeded, nothing
    /// is rolled back.
    async fn save_batch(&self, texts: &[String]) -> Result<(), StoreError>;

    /// Search and return matching texts, best first. Scores are discarded;
    /// see [`VectorStore::search_with_scores`] for the score-carrying
    /// variant.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<String>, StoreError> {
        let scored = self.search_with_scores(query, limit, score_threshold).await?;
        Ok(scored.into_iter().map(|(text, _)| text).collect())
    }

    /// Search and return `(text, score)` pairs, best first. Only results
    /// with `score >= score_threshold` are kept, truncated to `limit`;
    /// fewer than `limit` results may be returned, never padded.
    async fn search_with_scores(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<(String, f32)>, StoreError>;

    /// Search several queries at once, embedding them in a single provider
    /// call. Returns one inner result list per query, in input order, each
    /// filtered independently.
    async fn search_batch(
        &self,
        queries: &[String],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<Vec<String>>, StoreError>;

    /// Clear all stored data. The in-process backend re-initializes itself
    /// and is immediately writable again; remote backends drop the
    /// collection and require an explicit `create_collection` before
    /// further writes.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Search against a named collection instead of the default one. For
    /// single-index backends this is identical to `search`.
    async fn search_in(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
        collection: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let _ = collection;
        self.search(query, limit, score_threshold).await
    }

    /// Whether the named collection exists. Always true for single-index
    /// backends. Remote backends answer `Ok(false)` on a backend error
    /// instead of raising; this is the one boolean-fallback point in the
    /// error policy.
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError> {
        let _ = name;
        Ok(true)
    }

    /// Create the named collection. For single-index backends this resets
    /// the current index.
    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        let _ = name;
        self.reset().await
    }

    /// Read-only statistics for observability.
    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Write a snapshot of the store to `<path>.index` + `<path>.json`.
    /// Only the in-process backend supports this; remote backends persist
    /// server-side.
    async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let _ = path;
        Err(StoreError::Config(
            "persistence is only supported by the in-process backend".into(),
        ))
    }

    /// Load a snapshot previously written by [`VectorStore::persist`].
    /// Both artifacts must exist and agree on element count.
    async fn load(&self, path: &Path) -> Result<(), StoreError> {
        let _ = path;
        Err(StoreError::Config(
            "persistence is only supported by the in-process backend".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
