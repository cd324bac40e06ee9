use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use memoir_core::{Embeddings, StoreError, StoreStats, VectorStore};
use qdrant_client::qdrant::{
    value::Kind, CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;

// ---------------------------------------------------------------------------
// QdrantConfig
// ---------------------------------------------------------------------------

/// Configuration for connecting to a Qdrant instance.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL (e.g. `http://localhost:6334`).
    pub url: String,
    /// Name of the collection to operate on.
    pub collection_name: String,
    /// Dimensionality of the embedding vectors.
    pub vector_size: u64,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Distance metric for similarity search. Defaults to `Cosine`.
    pub distance: Distance,
}

impl QdrantConfig {
    /// Create a new config with the required parameters.
    pub fn new(
        url: impl Into<String>,
        collection_name: impl Into<String>,
        vector_size: u64,
    ) -> Self {
        Self {
            url: url.into(),
            collection_name: collection_name.into(),
            vector_size,
            api_key: None,
            distance: Distance::Cosine,
        }
    }

    /// Set the API key for authenticated access.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the distance metric (default: Cosine).
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }
}

// ---------------------------------------------------------------------------
// QdrantVectorStore
// ---------------------------------------------------------------------------

/// A [`VectorStore`] implementation backed by [Qdrant](https://qdrant.tech/).
///
/// Each saved text is stored as a Qdrant point with a generated UUID id,
/// the embedding computed by the injected [`Embeddings`] provider, and the
/// text itself under the `content` payload field. Scores returned by
/// searches are Qdrant's native similarity for the configured distance;
/// the threshold filter applies to those scores directly.
pub struct QdrantVectorStore {
    client: Qdrant,
    config: QdrantConfig,
    embeddings: Option<Arc<dyn Embeddings>>,
}

impl QdrantVectorStore {
    /// Create a new store, connecting to Qdrant at the configured URL.
    /// Fails with `BackendUnavailable` if the client cannot be built.
    pub fn new(config: QdrantConfig) -> Result<Self, StoreError> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build().map_err(|e| {
            StoreError::BackendUnavailable(format!("failed to build Qdrant client: {e}"))
        })?;
        Ok(Self {
            client,
            config,
            embeddings: None,
        })
    }

    /// Create a store from an existing [`Qdrant`] client.
    pub fn from_client(client: Qdrant, config: QdrantConfig) -> Self {
        Self {
            client,
            config,
            embeddings: None,
        }
    }

    /// Inject the embedding provider. Required before any save or search.
    pub fn with_embeddings(mut self, embeddings: Arc<dyn Embeddings>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Ensure the configured collection exists, creating it if necessary.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        if !self.collection_exists(&self.config.collection_name).await? {
            self.create_named(&self.config.collection_name).await?;
        }
        Ok(())
    }

    /// Return a reference to the underlying Qdrant client.
    pub fn client(&self) -> &Qdrant {
        &self.client
    }

    /// Return a reference to the config.
    pub fn config(&self) -> &QdrantConfig {
        &self.config
    }

    fn require_embeddings(&self) -> Result<&Arc<dyn Embeddings>, StoreError> {
        self.embeddings.as_ref().ok_or_else(|| {
            StoreError::Config("no embedding provider configured for this store".into())
        })
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| StoreError::Backend(format!("collection_exists check failed: {e}")))
    }

    async fn create_named(&self, name: &str) -> Result<(), StoreError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
                    self.config.vector_size,
                    self.config.distance,
                )),
            )
            .await
            .map_err(|e| StoreError::Backend(format!("failed to create collection: {e}")))?;
        Ok(())
    }

    /// Search one query vector against `collection`, applying the score
    /// policy: fetch `2 * limit` candidates, keep native scores at or
    /// above the threshold, truncate to `limit`.
    async fn search_vector_in(
        &self,
        collection: &str,
        query_vec: Vec<f32>,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<(String, f32)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let candidates = limit.saturating_mul(2) as u64;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query_vec, candidates)
                    .with_payload(true)
                    .score_threshold(score_threshold),
            )
            .await
            .map_err(|e| StoreError::Backend(format!("search failed: {e}")))?;

        let mut results: Vec<(String, f32)> = response
            .result
            .into_iter()
            .map(|sp| {
                let score = sp.score;
                (payload_content(&sp), score)
            })
            .collect();
        results.truncate(limit);
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// VectorStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl VectorStore for QdrantVectorStore {
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

        let points: Vec<PointStruct> = texts
            .iter()
            .zip(vectors)
            .map(|(text, vector)| {
                let id = uuid::Uuid::new_v4().to_string();
                PointStruct::new(id, vector, text_payload(text))
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(
                &self.config.collection_name,
                points,
            ))
            .await
            .map_err(|e| StoreError::Backend(format!("upsert failed: {e}")))?;

        tracing::debug!(count = texts.len(), collection = %self.config.collection_name, "saved batch");
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
        self.search_vector_in(
            &self.config.collection_name,
            query_vec,
            limit,
            score_threshold,
        )
        .await
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

        let mut all_results = Vec::with_capacity(query_vecs.len());
        for query_vec in query_vecs {
            let results = self
                .search_vector_in(
                    &self.config.collection_name,
                    query_vec,
                    limit,
                    score_threshold,
                )
                .await?;
            all_results.push(results.into_iter().map(|(text, _)| text).collect());
        }
        Ok(all_results)
    }

    /// Drops the configured collection server-side. Unlike the in-process
    /// backend, the store is not writable again until
    /// [`VectorStore::create_collection`] or
    /// [`QdrantVectorStore::ensure_collection`] has run.
    async fn reset(&self) -> Result<(), StoreError> {
        self.client
            .delete_collection(&self.config.collection_name)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to delete collection: {e}")))?;
        Ok(())
    }

    async fn search_in(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
        collection: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let collection = collection.unwrap_or(&self.config.collection_name);
        let provider = self.require_embeddings()?;
        let query_vec = provider.embed_query(query).await?;
        let results = self
            .search_vector_in(collection, query_vec, limit, score_threshold)
            .await?;
        Ok(results.into_iter().map(|(text, _)| text).collect())
    }

    /// A backend error answers `false` rather than propagating, so callers
    /// can probe availability without handling transport failures.
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError> {
        match self.client.collection_exists(name).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                tracing::warn!(collection = name, error = %e, "collection_exists check failed");
                Ok(false)
            }
        }
    }

    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        if self.collection_exists(name).await? {
            return Ok(());
        }
        self.create_named(name).await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.config.collection_name).exact(true))
            .await
            .map_err(|e| StoreError::Backend(format!("count failed: {e}")))?;
        let count = response.result.map(|r| r.count as usize).unwrap_or(0);

        Ok(StoreStats {
            total_documents: count,
            index_size: count,
            dimension: self.config.vector_size as usize,
            index_type: "qdrant".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Build the point payload carrying the original text.
fn text_payload(text: &str) -> HashMap<String, QdrantValue> {
    HashMap::from([(
        "content".to_string(),
        QdrantValue {
            kind: Some(Kind::StringValue(text.to_string())),
        },
    )])
}

/// Extract the stored text from a scored point, empty if the payload is
/// missing or malformed.
fn payload_content(sp: &ScoredPoint) -> String {
    sp.payload
        .get("content")
        .and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_stores_content() {
        let payload = text_payload("hello world");
        match &payload.get("content").unwrap().kind {
            Some(Kind::StringValue(s)) => assert_eq!(s, "hello world"),
            other => panic!("unexpected payload kind: {other:?}"),
        }
    }

    #[test]
    fn payload_content_round_trips() {
        let sp = ScoredPoint {
            payload: text_payload("the stored text"),
            ..Default::default()
        };
        assert_eq!(payload_content(&sp), "the stored text");
    }

    #[test]
    fn payload_content_missing_is_empty() {
        let sp = ScoredPoint::default();
        assert_eq!(payload_content(&sp), "");
    }

    #[test]
    fn payload_content_wrong_kind_is_empty() {
        let sp = ScoredPoint {
            payload: HashMap::from([(
                "content".to_string(),
                QdrantValue {
                    kind: Some(Kind::IntegerValue(7)),
                },
            )]),
            ..Default::default()
        };
        assert_eq!(payload_content(&sp), "");
    }
}
