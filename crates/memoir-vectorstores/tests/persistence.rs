use std::sync::Arc;

use memoir_embeddings::FakeEmbeddings;
use memoir_vectorstores::{LocalStoreConfig, LocalVectorStore, StoreError, VectorStore};

fn store_with_fake(dimension: usize) -> LocalVectorStore {
    LocalVectorStore::new(LocalStoreConfig::new(dimension))
        .unwrap()
        .with_embeddings(Arc::new(FakeEmbeddings::new(dimension)))
}

#[tokio::test]
async fn snapshot_round_trip_preserves_search_results() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("snapshot");

    let store = store_with_fake(8);
    store
        .save_batch(&[
            "the cat sat on the mat".into(),
            "a dog ran in the park".into(),
            "stocks rallied on tuesday".into(),
        ])
        .await
        .unwrap();
    let before = store
        .search_with_scores("the cat sat on the mat", 3, 0.0)
        .await
        .unwrap();
    store.persist(&base).await.unwrap();

    let restored = store_with_fake(8);
    restored.load(&base).await.unwrap();

    let after = restored
        .search_with_scores("the cat sat on the mat", 3, 0.0)
        .await
        .unwrap();
    assert_eq!(before, after);

    let stats = restored.stats().await.unwrap();
    assert_eq!(stats.total_documents, 3);
    assert_eq!(stats.index_size, 3);
}

#[tokio::test]
async fn persist_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("nested/deeper/snapshot");

    let store = store_with_fake(4);
    store.save("doc").await.unwrap();
    store.persist(&base).await.unwrap();

    assert!(dir.path().join("nested/deeper/snapshot.index").exists());
    assert!(dir.path().join("nested/deeper/snapshot.json").exists());
    let restored = store_with_fake(4);
    restored.load(&base).await.unwrap();
    assert_eq!(restored.stats().await.unwrap().total_documents, 1);
}

#[tokio::test]
async fn load_with_missing_artifact_fails_and_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("snapshot");

    let store = store_with_fake(4);
    store.save_batch(&["a".into(), "b".into()]).await.unwrap();
    store.persist(&base).await.unwrap();

    // Remove the text sidecar; a half snapshot must not load.
    let texts_path = dir.path().join("snapshot.json");
    std::fs::remove_file(&texts_path).unwrap();

    let restored = store_with_fake(4);
    restored.save("existing").await.unwrap();
    let err = restored.load(&base).await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));

    // The failed load did not clobber the existing contents.
    let stats = restored.stats().await.unwrap();
    assert_eq!(stats.total_documents, 1);
}

#[tokio::test]
async fn load_rejects_desynchronized_artifacts() {
    let dir = tempfile::tempdir().unwrap();

    // Snapshot A has two documents, snapshot B has one; splice A's index
    // together with B's texts.
    let a = store_with_fake(4);
    a.save_batch(&["one".into(), "two".into()]).await.unwrap();
    a.persist(&dir.path().join("a")).await.unwrap();

    let b = store_with_fake(4);
    b.save("solo").await.unwrap();
    b.persist(&dir.path().join("b")).await.unwrap();

    let spliced = dir.path().join("spliced");
    std::fs::copy(dir.path().join("a.index"), dir.path().join("spliced.index")).unwrap();
    std::fs::copy(dir.path().join("b.json"), dir.path().join("spliced.json")).unwrap();

    let restored = store_with_fake(4);
    let err = restored.load(&spliced).await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));
    assert_eq!(restored.stats().await.unwrap().total_documents, 0);
}

#[tokio::test]
async fn load_rejects_mismatched_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("snapshot");

    let store = store_with_fake(8);
    store.save("doc").await.unwrap();
    store.persist(&base).await.unwrap();

    let restored = store_with_fake(4);
    let err = restored.load(&base).await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));
}

#[tokio::test]
async fn clustered_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("clustered");

    let store = store_with_fake(8);
    store
        .save_batch(&[
            "alpha beta".into(),
            "gamma delta".into(),
            "epsilon zeta".into(),
            "eta theta".into(),
        ])
        .await
        .unwrap();
    store.build_ivf_index(2).await.unwrap();
    store.persist(&base).await.unwrap();

    let restored = store_with_fake(8);
    restored.load(&base).await.unwrap();

    let stats = restored.stats().await.unwrap();
    assert_eq!(stats.index_type, "clustered");
    assert_eq!(stats.total_documents, 4);

    let results = restored.search("alpha beta", 1, 0.0).await.unwrap();
    assert_eq!(results, vec!["alpha beta".to_string()]);
}
