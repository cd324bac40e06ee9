use memoir_mongodb::MongoVectorConfig;

#[test]
fn config_new_sets_defaults() {
    let config = MongoVectorConfig::new("memoir_db", "memories");
    assert_eq!(config.database, "memoir_db");
    assert_eq!(config.collection, "memories");
    assert_eq!(config.index_name, "vector_index");
    assert_eq!(config.vector_field, "embedding");
    assert_eq!(config.content_field, "content");
    assert!(config.num_candidates.is_none());
    assert_eq!(config.dimension, 768);
}

#[test]
fn config_builder_chain() {
    let config = MongoVectorConfig::new("db", "col")
        .with_index_name("idx")
        .with_vector_field("vec")
        .with_content_field("body")
        .with_num_candidates(64)
        .with_dimension(384);

    assert_eq!(config.index_name, "idx");
    assert_eq!(config.vector_field, "vec");
    assert_eq!(config.content_field, "body");
    assert_eq!(config.num_candidates, Some(64));
    assert_eq!(config.dimension, 384);
}

// ---------------------------------------------------------------------------
// Integration tests — require a MongoDB Atlas cluster with a vector search
// index configured on the test collection.
// Run with: MONGODB_URI=... cargo test -p memoir-mongodb -- --ignored
// ---------------------------------------------------------------------------

#[cfg(test)]
mod integration {
    use std::sync::Arc;

    use memoir_core::VectorStore;
    use memoir_embeddings::FakeEmbeddings;
    use memoir_mongodb::{MongoVectorConfig, MongoVectorStore};

    async fn setup_store(collection: &str, dim: usize) -> MongoVectorStore {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
        let config = MongoVectorConfig::new("memoir_test", collection).with_dimension(dim);
        let store = MongoVectorStore::from_uri(&uri, config)
            .await
            .expect("failed to connect")
            .with_embeddings(Arc::new(FakeEmbeddings::new(dim)));

        // Clear out any previous test data.
        let _ = store.collection().delete_many(bson::doc! {}).await;
        store
    }

    #[tokio::test]
    #[ignore = "requires MongoDB Atlas with a vector search index"]
    async fn save_and_search() {
        let store = setup_store("test_save_search", 64).await;

        store
            .save_batch(&[
                "The quick brown fox jumps over the lazy dog".into(),
                "A fast red car drives down the highway".into(),
            ])
            .await
            .unwrap();

        // Atlas indexes asynchronously.
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        let results = store.search("quick brown fox", 2, 0.0).await.unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 2);
    }

    #[tokio::test]
    #[ignore = "requires MongoDB Atlas with a vector search index"]
    async fn search_with_scores_is_best_first() {
        let store = setup_store("test_search_scores", 64).await;

        store
            .save_batch(&[
                "Rust programming language".into(),
                "Python programming language".into(),
            ])
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        let results = store
            .search_with_scores("Rust language", 2, 0.0)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].1 >= results[1].1);
    }

    #[tokio::test]
    #[ignore = "requires MongoDB Atlas with a vector search index"]
    async fn stats_counts_documents() {
        let store = setup_store("test_stats", 64).await;

        store
            .save_batch(&["one".into(), "two".into(), "three".into()])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.dimension, 64);
        assert_eq!(stats.index_type, "mongodb");
    }

    #[tokio::test]
    #[ignore = "requires MongoDB Atlas with a vector search index"]
    async fn collection_management() {
        let store = setup_store("test_collections", 64).await;

        store.create_collection("test_collections_extra").await.unwrap();
        assert!(store.has_collection("test_collections_extra").await.unwrap());

        store.save("doomed").await.unwrap();
        store.reset().await.unwrap();
        assert!(!store.has_collection("test_collections").await.unwrap());
    }
}
