//! Search ordering and snapshot persistence of the in-memory vector store.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{DIM, KeywordEmbedder};
use proptest::prelude::*;
use rag_pipeline::{
    Document, DistanceMetric, InMemoryVectorStore, RagError, StoreConfig, VectorStore,
};

fn arb_metric() -> impl Strategy<Value = DistanceMetric> {
    prop_oneof![Just(DistanceMetric::L2), Just(DistanceMetric::Cosine), Just(DistanceMetric::Ip)]
}

fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, DIM)
}

/// Documents keyed by id, so every generated batch has unique ids.
fn arb_batch() -> impl Strategy<Value = Vec<(String, String, Vec<f32>)>> {
    proptest::collection::hash_map("[a-z]{3,8}", ("[a-z ]{5,30}", arb_embedding()), 1..20)
        .prop_map(|m| m.into_iter().map(|(id, (text, e))| (id, text, e)).collect())
}

mod prop_query_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ascend_by_distance_and_respect_limit(
            batch in arb_batch(),
            query in "[a-z]{1,6}( [a-z]{1,6}){0,4}",
            limit in 1usize..25,
            metric in arb_metric(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let stored = batch.len();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new("prop", Arc::new(KeywordEmbedder::default()))
                    .with_metric(metric);
                let (documents, embeddings): (Vec<Document>, Vec<Vec<f32>>) = batch
                    .into_iter()
                    .map(|(id, text, e)| (Document::new(text).with_id(id), e))
                    .unzip();
                store.upsert_embedded(&documents, embeddings).await.unwrap();
                store.query(&query, limit).await.unwrap()
            });

            prop_assert_eq!(results.len(), limit.min(stored));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "results not in ascending order: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
            }
        }
    }
}

fn config(dir: &std::path::Path, distance: DistanceMetric) -> StoreConfig {
    StoreConfig {
        collection_name: "persisted".to_string(),
        persist_directory: Some(dir.to_path_buf()),
        distance,
    }
}

#[tokio::test]
async fn reopening_loads_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());

    let store = InMemoryVectorStore::open(&config(dir.path(), DistanceMetric::Cosine), embedder.clone())
        .await
        .unwrap();
    let metadata = HashMap::from([("source".to_string(), "notes".to_string())]);
    store
        .upsert(&[
            Document::new("rust ownership rules").with_id("a").with_metadata(metadata),
            Document::new("borrow checker errors").with_id("b"),
        ])
        .await
        .unwrap();
    assert!(dir.path().join("persisted.json").exists());
    drop(store);

    // The stored metric wins over the configured one.
    let reopened = InMemoryVectorStore::open(&config(dir.path(), DistanceMetric::L2), embedder)
        .await
        .unwrap();
    assert_eq!(reopened.metric(), DistanceMetric::Cosine);
    assert_eq!(reopened.count().await.unwrap(), 2);

    let info = reopened.info().await.unwrap();
    assert_eq!(info.name, "persisted");
    assert_eq!(info.persist_directory.as_deref(), Some(dir.path().display().to_string().as_str()));

    let hits = reopened.query("rust ownership rules", 1).await.unwrap();
    assert_eq!(hits[0].id, "a");
    assert_eq!(hits[0].metadata["source"], "notes");
}

#[tokio::test]
async fn delete_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let cfg = config(dir.path(), DistanceMetric::L2);

    let store = InMemoryVectorStore::open(&cfg, embedder.clone()).await.unwrap();
    store
        .upsert(&[Document::new("one").with_id("1"), Document::new("two").with_id("2")])
        .await
        .unwrap();
    store.delete(&["1"]).await.unwrap();
    drop(store);

    let reopened = InMemoryVectorStore::open(&cfg, embedder).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 1);
}

#[tokio::test]
async fn recreate_removes_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let cfg = config(dir.path(), DistanceMetric::L2);

    let store = InMemoryVectorStore::open(&cfg, embedder.clone()).await.unwrap();
    store.upsert(&[Document::new("temporary")]).await.unwrap();
    store.recreate().await.unwrap();

    assert!(!dir.path().join("persisted.json").exists());
    assert_eq!(store.count().await.unwrap(), 0);

    let reopened = InMemoryVectorStore::open(&cfg, embedder).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 0);
}

#[tokio::test]
async fn corrupt_snapshot_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("persisted.json"), b"{not json").unwrap();

    let err = InMemoryVectorStore::open(
        &config(dir.path(), DistanceMetric::L2),
        Arc::new(KeywordEmbedder::default()),
    )
    .await
    .err()
    .expect("corrupt snapshot rejected");

    assert!(matches!(err, RagError::Store { .. }));
}

#[tokio::test]
async fn failed_batch_leaves_snapshot_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let cfg = config(dir.path(), DistanceMetric::L2);

    let store = InMemoryVectorStore::open(&cfg, embedder.clone()).await.unwrap();
    store.upsert(&[Document::new("kept").with_id("k")]).await.unwrap();

    let err = store
        .upsert_embedded(&[Document::new("wrong width").with_id("w")], vec![vec![1.0; DIM + 1]])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
    drop(store);

    let reopened = InMemoryVectorStore::open(&cfg, embedder).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 1);
}
