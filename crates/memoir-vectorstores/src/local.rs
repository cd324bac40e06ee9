use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use memoir_core::{Embeddings, StoreError, StoreStats, VectorStore};
use tokio::sync::RwLock;

use crate::index::{IndexType, IvfIndex, VectorIndex};
use crate::registry::DocumentRegistry;
use crate::scoring::normalize_score;

// ---------------------------------------------------------------------------
// LocalStoreConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`LocalVectorStore`].
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    /// Dimensionality of the embedding vectors.
    pub dimension: usize,
    /// Index variant (default: flat L2).
    pub index_type: IndexType,
    /// Cluster count for the clustered variant (default: 100).
    pub nlist: usize,
    /// Number of clusters probed per approximate search (default: 10).
    pub nprobe: usize,
}

impl LocalStoreConfig {
    /// Create a new config with the given embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            index_type: IndexType::FlatL2,
            nlist: 100,
            nprobe: 10,
        }
    }

    /// Set the index variant (default: flat L2).
    pub fn with_index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Set the cluster count used when building a clustered index.
    pub fn with_nlist(mut self, nlist: usize) -> Self {
        self.nlist = nlist;
        self
    }

    /// Set how many clusters an approximate search probes.
    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self::new(768)
    }
}

// ---------------------------------------------------------------------------
// IndexState
// ---------------------------------------------------------------------------

/// The vector index and document registry as one owned aggregate. Inserts
/// and resets only exist as paired operations here, so
/// `index.len() == registry.len()` holds structurally rather than by
/// caller discipline.
#[derive(Debug)]
struct IndexState {
    index: VectorIndex,
    registry: DocumentRegistry,
}

impl IndexState {
    fn insert(&mut self, vectors: Vec<Vec<f32>>, texts: Vec<String>) -> Result<(), StoreError> {
        debug_assert_eq!(vectors.len(), texts.len());
        self.index.add(vectors)?;
        self.registry.append(texts);
        Ok(())
    }

    fn reset(&mut self) {
        self.index.reset();
        self.registry.clear();
    }
}

// ---------------------------------------------------------------------------
// LocalVectorStore
// ---------------------------------------------------------------------------

/// In-process vector store: an owned vector index (flat or clustered)
/// paired with a positional document registry, plus an injected embedding
/// provider.
///
/// Mutation is serialized through one lock around the index/registry
/// aggregate. Concurrent reads are safe with each other; the documented
/// policy is still one writer at a time, externally serialized.
pub struct LocalVectorStore {
    config: LocalStoreConfig,
    embeddings: Option<Arc<dyn Embeddings>>,
    state: RwLock<IndexState>,
}

impl LocalVectorStore {
    /// Create an empty store. Fails with a `Config` error on an invalid
    /// dimension or clustering parameters.
    pub fn new(config: LocalStoreConfig) -> Result<Self, StoreError> {
        let index = VectorIndex::new(
            config.index_type,
            config.dimension,
            config.nlist,
            config.nprobe,
        )?;
        Ok(Self {
            config,
            embeddings: None,
            state: RwLock::new(IndexState {
                index,
                registry: DocumentRegistry::new(),
            }),
        })
    }

    /// Inject the embedding provider. Required before any save or search.
    pub fn with_embeddings(mut self, embeddings: Arc<dyn Embeddings>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Return a reference to the config.
    pub fn config(&self) -> &LocalStoreConfig {
        &self.config
    }

    /// Train the index from a raw vector sample. A no-op for flat
    /// variants; for the clustered variant this fits the quantizer and
    /// must happen before any save.
    ///
    /// Retraining drops every vector from a clustered index while the
    /// registry keeps its texts, so training a populated clustered store
    /// is rejected; use [`LocalVectorStore::build_ivf_index`] to rebuild
    /// over the documents already saved.
    pub async fn train(&self, sample: &[Vec<f32>]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.index.index_type() == IndexType::Clustered && !state.registry.is_empty() {
            return Err(StoreError::Config(
                "store already contains documents; rebuild with build_ivf_index instead".into(),
            ));
        }
        state.index.train(sample)
    }

    /// Rebuild the store's index as a clustered index over the documents
    /// already saved: re-embeds every stored text in one provider call,
    /// trains `nlist` centroids on those vectors, and re-adds them all.
    /// The registry is untouched. A no-op on an empty store.
    pub async fn build_ivf_index(&self, nlist: usize) -> Result<(), StoreError> {
        let provider = self.require_embeddings()?.clone();

        let mut state = self.state.write().await;
        if state.registry.is_empty() {
            return Ok(());
        }

        let vectors = {
            let texts: Vec<&str> = state.registry.texts().iter().map(String::as_str).collect();
            provider.embed_texts(&texts).await?
        };
        if vectors.len() != state.registry.len() {
            return Err(StoreError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                state.registry.len()
            )));
        }

        let mut index = IvfIndex::new(
            self.config.dimension,
            state.index.metric(),
            nlist,
            self.config.nprobe,
        )?;
        index.train(&vectors)?;
        index.add(vectors)?;

        tracing::debug!(
            documents = state.registry.len(),
            nlist,
            "rebuilt clustered index"
        );
        state.index = VectorIndex::Clustered(index);
        Ok(())
    }

    fn require_embeddings(&self) -> Result<&Arc<dyn Embeddings>, StoreError> {
        self.embeddings.as_ref().ok_or_else(|| {
            StoreError::Config("no embedding provider configured for this store".into())
        })
    }
}

/// Search one query vector against the state, applying the score policy:
/// normalize, keep `score >= score_threshold`, stop at `limit`.
fn search_state(
    state: &IndexState,
    query_vec: &[f32],
    limit: usize,
    score_threshold: f32,
) -> Result<Vec<(String, f32)>, StoreError> {
    if limit == 0 || state.registry.is_empty() {
        return Ok(Vec::new());
    }

    let metric = state.index.metric();
    // Ask for extra candidates so threshold filtering does not starve the
    // result set.
    let candidates = limit.saturating_mul(2).min(state.index.len());
    let raw = state.index.search(query_vec, candidates)?;

    let mut results = Vec::new();
    for (position, value) in raw {
        let score = normalize_score(metric, value);
        if score >= score_threshold {
            results.push((state.registry.get(position)?.to_string(), score));
            if results.len() >= limit {
                break;
            }
        }
    }
    Ok(results)
}

fn artifact_path(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn save_batch(&self, texts: &[String]) -> Result<(), StoreError> {
        if texts.is_empty() {
            return Ok(());
        }
        let provider = self.require_embeddings()?;

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = provider.embed_texts(&refs).await?;
        if vectors.len() != texts.len() {
            return Err(StoreError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        let mut state = self.state.write().await;
        state.insert(vectors, texts.to_vec())?;
        tracing::debug!(count = texts.len(), size = state.registry.len(), "saved batch");
        Ok(())
    }

    async fn search_with_scores(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<(String, f32)>, StoreError> {
        let provider = self.require_embeddings()?;
        let query_vec = provider.embed_query(query).await?;

        let state = self.state.read().await;
        search_state(&state, &query_vec, limit, score_threshold)
    }

    async fn search_batch(
        &self,
        queries: &[String],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let provider = self.require_embeddings()?;

        let refs: Vec<&str> = queries.iter().map(String::as_str).collect();
        let query_vecs = provider.embed_texts(&refs).await?;

        // One read guard for the whole batch: the candidate count depends
        // on the index size, which must not change mid-batch.
        let state = self.state.read().await;
        let mut all_results = Vec::with_capacity(query_vecs.len());
        for query_vec in &query_vecs {
            let results = search_state(&state, query_vec, limit, score_threshold)?;
            all_results.push(results.into_iter().map(|(text, _)| text).collect());
        }
        Ok(all_results)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.reset();
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let state = self.state.read().await;
        Ok(StoreStats {
            total_documents: state.registry.len(),
            index_size: state.index.len(),
            dimension: self.config.dimension,
            index_type: state.index.index_type().to_string(),
        })
    }

    async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let (index_bytes, registry_bytes) = {
            let state = self.state.read().await;
            let index = serde_json::to_vec(&state.index)
                .map_err(|e| StoreError::Persistence(format!("failed to encode index: {e}")))?;
            let registry = serde_json::to_vec(state.registry.texts())
                .map_err(|e| StoreError::Persistence(format!("failed to encode registry: {e}")))?;
            (index, registry)
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::Persistence(format!("failed to create snapshot directory: {e}"))
                })?;
            }
        }

        tokio::fs::write(artifact_path(path, ".index"), index_bytes)
            .await
            .map_err(|e| StoreError::Persistence(format!("failed to write index artifact: {e}")))?;
        tokio::fs::write(artifact_path(path, ".json"), registry_bytes)
            .await
            .map_err(|e| {
                StoreError::Persistence(format!("failed to write registry artifact: {e}"))
            })?;
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<(), StoreError> {
        let index_path = artifact_path(path, ".index");
        let registry_path = artifact_path(path, ".json");

        // Both halves are read and validated before anything is swapped
        // in, so a failed load leaves the in-memory state untouched.
        let index_bytes = tokio::fs::read(&index_path).await.map_err(|e| {
            StoreError::Persistence(format!(
                "missing index artifact {}: {e}",
                index_path.display()
            ))
        })?;
        let registry_bytes = tokio::fs::read(&registry_path).await.map_err(|e| {
            StoreError::Persistence(format!(
                "missing registry artifact {}: {e}",
                registry_path.display()
            ))
        })?;

        let index: VectorIndex = serde_json::from_slice(&index_bytes)
            .map_err(|e| StoreError::Persistence(format!("failed to decode index: {e}")))?;
        let texts: Vec<String> = serde_json::from_slice(&registry_bytes)
            .map_err(|e| StoreError::Persistence(format!("failed to decode registry: {e}")))?;

        if index.len() != texts.len() {
            tracing::warn!(
                index = index.len(),
                registry = texts.len(),
                "snapshot artifacts disagree on element count"
            );
            return Err(StoreError::Persistence(format!(
                "snapshot mismatch: index has {} vectors, registry has {} texts",
                index.len(),
                texts.len()
            )));
        }
        if index.dimension() != self.config.dimension {
            return Err(StoreError::Persistence(format!(
                "snapshot dimension {} does not match configured dimension {}",
                index.dimension(),
                self.config.dimension
            )));
        }

        let mut state = self.state.write().await;
        state.index = index;
        state.registry = DocumentRegistry::from_texts(texts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_share_the_base() {
        let base = Path::new("/tmp/snapshots/store");
        assert_eq!(
            artifact_path(base, ".index"),
            PathBuf::from("/tmp/snapshots/store.index")
        );
        assert_eq!(
            artifact_path(base, ".json"),
            PathBuf::from("/tmp/snapshots/store.json")
        );
    }

    #[test]
    fn config_defaults() {
        let config = LocalStoreConfig::default();
        assert_eq!(config.dimension, 768);
        assert_eq!(config.index_type, IndexType::FlatL2);
        assert_eq!(config.nlist, 100);
        assert_eq!(config.nprobe, 10);
    }

    #[test]
    fn config_builder_chain() {
        let config = LocalStoreConfig::new(64)
            .with_index_type(IndexType::FlatIp)
            .with_nlist(16)
            .with_nprobe(4);
        assert_eq!(config.dimension, 64);
        assert_eq!(config.index_type, IndexType::FlatIp);
        assert_eq!(config.nlist, 16);
        assert_eq!(config.nprobe, 4);
    }
}
