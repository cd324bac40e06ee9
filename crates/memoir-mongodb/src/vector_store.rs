use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Bson, Document as BsonDocument};
use futures::TryStreamExt;
use memoir_core::{Embeddings, StoreError, StoreStats, VectorStore};
use mongodb::Client;

// ---------------------------------------------------------------------------
// MongoVectorConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`MongoVectorStore`].
#[derive(Debug, Clone)]
pub struct MongoVectorConfig {
    /// MongoDB database name.
    pub database: String,
    /// MongoDB collection name.
    pub collection: String,
    /// Name of the Atlas Vector Search index (default: `vector_index`).
    pub index_name: String,
    /// Field name storing the embedding vector (default: `embedding`).
    pub vector_field: String,
    /// Field name storing the document text (default: `content`).
    pub content_field: String,
    /// Number of candidates for `$vectorSearch` (default: `10 * k`).
    pub num_candidates: Option<i64>,
    /// Dimensionality of the embedding vectors (default: 768). Only
    /// reported through stats; the server-side index enforces it.
    pub dimension: usize,
}

impl MongoVectorConfig {
    /// Create a new config with the required database and collection names.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            index_name: "vector_index".to_string(),
            vector_field: "embedding".to_string(),
            content_field: "content".to_string(),
            num_candidates: None,
            dimension: 768,
        }
    }

    /// Set the vector search index name.
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    /// Set the field name for storing embedding vectors.
    pub fn with_vector_field(mut self, vector_field: impl Into<String>) -> Self {
        self.vector_field = vector_field.into();
        self
    }

    /// Set the field name for storing document text.
    pub fn with_content_field(mut self, content_field: impl Into<String>) -> Self {
        self.content_field = content_field.into();
        self
    }

    /// Set the number of candidates for `$vectorSearch`.
    ///
    /// If not set, defaults to `10 * k` at query time.
    pub fn with_num_candidates(mut self, num_candidates: i64) -> Self {
        self.num_candidates = Some(num_candidates);
        self
    }

    /// Set the embedding dimension reported through stats.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

// ---------------------------------------------------------------------------
// MongoVectorStore
// ---------------------------------------------------------------------------

/// A [`VectorStore`] implementation backed by MongoDB Atlas Vector Search.
///
/// Each saved text is stored as a document with an `ObjectId` `_id`, the
/// text under the configured content field, and the embedding under the
/// configured vector field as an array of doubles. Similarity search uses
/// the `$vectorSearch` aggregation stage, which requires a pre-configured
/// Atlas Vector Search index on the collection; scores are the native
/// `vectorSearchScore` and the threshold filter applies to those directly.
pub struct MongoVectorStore {
    config: MongoVectorConfig,
    client: Client,
    collection: mongodb::Collection<BsonDocument>,
    embeddings: Option<Arc<dyn Embeddings>>,
}

impl MongoVectorStore {
    /// Create a new store by connecting to MongoDB at the given URI.
    /// Fails with `BackendUnavailable` if the connection cannot be set up.
    pub async fn from_uri(uri: &str, config: MongoVectorConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await.map_err(|e| {
            StoreError::BackendUnavailable(format!("failed to connect to MongoDB: {e}"))
        })?;
        Ok(Self::from_client(client, config))
    }

    /// Create a new store from an existing MongoDB client.
    pub fn from_client(client: Client, config: MongoVectorConfig) -> Self {
        let db = client.database(&config.database);
        let collection = db.collection::<BsonDocument>(&config.collection);
        Self {
            config,
            client,
            collection,
            embeddings: None,
        }
    }

    /// Inject the embedding provider. Required before any save or search.
    pub fn with_embeddings(mut self, embeddings: Arc<dyn Embeddings>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Return a reference to the underlying MongoDB client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &MongoVectorConfig {
        &self.config
    }

    /// Return a reference to the underlying MongoDB collection.
    pub fn collection(&self) -> &mongodb::Collection<BsonDocument> {
        &self.collection
    }

    fn require_embeddings(&self) -> Result<&Arc<dyn Embeddings>, StoreError> {
        self.embeddings.as_ref().ok_or_else(|| {
            StoreError::Config("no embedding provider configured for this store".into())
        })
    }

    /// Compute the number of candidates to use in `$vectorSearch`.
    fn num_candidates(&self, k: usize) -> i64 {
        self.config
            .num_candidates
            .unwrap_or_else(|| (k as i64) * 10)
    }

    /// Search one query vector against `collection`, applying the score
    /// policy: fetch `2 * limit` candidates, keep native scores at or
    /// above the threshold, truncate to `limit`.
    async fn search_vector_in(
        &self,
        collection: &mongodb::Collection<BsonDocument>,
        query_vec: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<(String, f32)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let fetch = limit.saturating_mul(2);
        let num_candidates = self.num_candidates(fetch);
        let query_vector: Vec<Bson> = query_vec.iter().map(|v| Bson::Double(*v as f64)).collect();

        let vector_search_stage = doc! {
            "$vectorSearch": {
                "index": &self.config.index_name,
                "path": &self.config.vector_field,
                "queryVector": query_vector,
                "numCandidates": num_candidates,
                "limit": fetch as i64,
            }
        };
        let project_stage = doc! {
            "$project": {
                "_id": 1,
                &self.config.content_field: 1,
                "score": { "$meta": "vectorSearchScore" },
            }
        };

        let mut cursor = collection
            .aggregate(vec![vector_search_stage, project_stage])
            .await
            .map_err(|e| StoreError::Backend(format!("MongoDB aggregation failed: {e}")))?;

        let mut results = Vec::new();
        while let Some(bson_doc) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::Backend(format!("MongoDB cursor error: {e}")))?
        {
            let score = bson_doc.get_f64("score").unwrap_or(0.0) as f32;
            if score < score_threshold {
                continue;
            }
            let content = bson_doc
                .get_str(&self.config.content_field)
                .unwrap_or("")
                .to_string();
            results.push((content, score));
            if results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// VectorStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl VectorStore for MongoVectorStore {
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

        let bson_docs: Vec<BsonDocument> = texts
            .iter()
            .zip(vectors)
            .map(|(text, vector)| {
                doc! {
                    "_id": bson::oid::ObjectId::new(),
                    &self.config.content_field: text,
                    &self.config.vector_field: vector_to_bson(&vector),
                }
            })
            .collect();

        self.collection
            .insert_many(bson_docs)
            .await
            .map_err(|e| StoreError::Backend(format!("MongoDB insert failed: {e}")))?;

        tracing::debug!(count = texts.len(), collection = %self.config.collection, "saved batch");
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
        self.search_vector_in(&self.collection, &query_vec, limit, score_threshold)
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
        for query_vec in &query_vecs {
            let results = self
                .search_vector_in(&self.collection, query_vec, limit, score_threshold)
                .await?;
            all_results.push(results.into_iter().map(|(text, _)| text).collect());
        }
        Ok(all_results)
    }

    /// Drops the configured collection server-side. Unlike the in-process
    /// backend, the store needs [`VectorStore::create_collection`] (and a
    /// re-created Atlas search index) before further writes.
    async fn reset(&self) -> Result<(), StoreError> {
        self.collection
            .drop()
            .await
            .map_err(|e| StoreError::Backend(format!("MongoDB drop failed: {e}")))?;
        Ok(())
    }

    async fn search_in(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f32,
        collection: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let provider = self.require_embeddings()?;
        let query_vec = provider.embed_query(query).await?;

        let named;
        let target = match collection {
            Some(name) => {
                named = self
                    .client
                    .database(&self.config.database)
                    .collection::<BsonDocument>(name);
                &named
            }
            None => &self.collection,
        };

        let results = self
            .search_vector_in(target, &query_vec, limit, score_threshold)
            .await?;
        Ok(results.into_iter().map(|(text, _)| text).collect())
    }

    /// A backend error answers `false` rather than propagating, so callers
    /// can probe availability without handling transport failures.
    async fn has_collection(&self, name: &str) -> Result<bool, StoreError> {
        match self
            .client
            .database(&self.config.database)
            .list_collection_names()
            .await
        {
            Ok(names) => Ok(names.iter().any(|n| n == name)),
            Err(e) => {
                tracing::warn!(collection = name, error = %e, "list_collection_names failed");
                Ok(false)
            }
        }
    }

    async fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        if self.has_collection(name).await? {
            return Ok(());
        }
        self.client
            .database(&self.config.database)
            .create_collection(name)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to create collection: {e}")))?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let count = self
            .collection
            .estimated_document_count()
            .await
            .map_err(|e| StoreError::Backend(format!("MongoDB count failed: {e}")))?
            as usize;

        Ok(StoreStats {
            total_documents: count,
            index_size: count,
            dimension: self.config.dimension,
            index_type: "mongodb".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert an embedding vector to a BSON array of doubles.
fn vector_to_bson(vector: &[f32]) -> Vec<Bson> {
    vector.iter().map(|v| Bson::Double(*v as f64)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_sets_defaults() {
        let config = MongoVectorConfig::new("my_db", "my_collection");
        assert_eq!(config.database, "my_db");
        assert_eq!(config.collection, "my_collection");
        assert_eq!(config.index_name, "vector_index");
        assert_eq!(config.vector_field, "embedding");
        assert_eq!(config.content_field, "content");
        assert!(config.num_candidates.is_none());
        assert_eq!(config.dimension, 768);
    }

    #[test]
    fn config_with_index_name() {
        let config = MongoVectorConfig::new("db", "col").with_index_name("custom_index");
        assert_eq!(config.index_name, "custom_index");
    }

    #[test]
    fn config_with_vector_field() {
        let config = MongoVectorConfig::new("db", "col").with_vector_field("vec");
        assert_eq!(config.vector_field, "vec");
    }

    #[test]
    fn config_with_content_field() {
        let config = MongoVectorConfig::new("db", "col").with_content_field("text");
        assert_eq!(config.content_field, "text");
    }

    #[test]
    fn config_builder_chain() {
        let config = MongoVectorConfig::new("test_db", "memories")
            .with_index_name("my_vs_index")
            .with_vector_field("vec_field")
            .with_content_field("text_field")
            .with_num_candidates(500)
            .with_dimension(1536);

        assert_eq!(config.database, "test_db");
        assert_eq!(config.collection, "memories");
        assert_eq!(config.index_name, "my_vs_index");
        assert_eq!(config.vector_field, "vec_field");
        assert_eq!(config.content_field, "text_field");
        assert_eq!(config.num_candidates, Some(500));
        assert_eq!(config.dimension, 1536);
    }

    #[test]
    fn num_candidates_default_is_ten_per_candidate() {
        let config = MongoVectorConfig::new("db", "col");
        let k = 10_usize;
        let result = config.num_candidates.unwrap_or_else(|| (k as i64) * 10);
        assert_eq!(result, 100);
    }

    #[test]
    fn num_candidates_custom_overrides() {
        let config = MongoVectorConfig::new("db", "col").with_num_candidates(200);
        let k = 10_usize;
        let result = config.num_candidates.unwrap_or_else(|| (k as i64) * 10);
        assert_eq!(result, 200);
    }

    #[test]
    fn vector_to_bson_doubles() {
        let bson = vector_to_bson(&[0.5, 1.0]);
        assert_eq!(bson, vec![Bson::Double(0.5), Bson::Double(1.0)]);
    }
}
