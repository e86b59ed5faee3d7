use std::collections::HashMap;

use ragward_store::{FieldCondition, QdrantStore, VectorFilter, VectorPoint, VectorStore};
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;

const QDRANT_GRPC_PORT: ContainerPort = ContainerPort::Tcp(6334);
const COLLECTION: &str = "ragward_test";

fn qdrant_image() -> GenericImage {
    GenericImage::new("qdrant/qdrant", "v1.16.0")
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
        .with_exposed_port(QDRANT_GRPC_PORT)
}

async fn setup() -> (QdrantStore, ContainerAsync<GenericImage>) {
    let container = qdrant_image().start().await.unwrap();
    let grpc_port = container.get_host_port_ipv4(6334).await.unwrap();
    let url = format!("http://127.0.0.1:{grpc_port}");
    let store = QdrantStore::new(&url)
        .unwrap()
        .with_keyword_indexes(["original_filename", "status"]);
    (store, container)
}

fn chunk(id: &str, file: &str, status: &str, vector: Vec<f32>) -> VectorPoint {
    VectorPoint {
        id: id.into(),
        vector,
        payload: HashMap::from([
            ("original_filename".into(), serde_json::json!(file)),
            ("status".into(), serde_json::json!(status)),
            ("content".into(), serde_json::json!(format!("text of {id}"))),
        ]),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_collection_is_idempotent() {
    let (store, _container) = setup().await;
    store.ensure_collection(COLLECTION, 4).await.unwrap();
    store.ensure_collection(COLLECTION, 4).await.unwrap();
    assert!(store.collection_exists(COLLECTION).await.unwrap());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn upsert_search_and_delete_by_filename() {
    let (store, _container) = setup().await;
    store.ensure_collection(COLLECTION, 4).await.unwrap();

    store
        .upsert(
            COLLECTION,
            vec![
                chunk("doc_a_chunk_0", "a.txt", "final", vec![1.0, 0.0, 0.0, 0.0]),
                chunk("doc_a_chunk_1", "a.txt", "final", vec![0.9, 0.1, 0.0, 0.0]),
                chunk("doc_b_chunk_0", "b.txt", "draft", vec![0.0, 1.0, 0.0, 0.0]),
            ],
        )
        .await
        .unwrap();
    assert_eq!(store.count(COLLECTION, None).await.unwrap(), 3);

    let hits = store
        .search(COLLECTION, vec![1.0, 0.0, 0.0, 0.0], 5, None)
        .await
        .unwrap();
    assert_eq!(hits[0].id, "doc_a_chunk_0");

    let drafts = VectorFilter::must(vec![FieldCondition::text("status", "draft")]);
    let hits = store
        .search(COLLECTION, vec![1.0, 0.0, 0.0, 0.0], 5, Some(drafts))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "doc_b_chunk_0");

    let by_file = VectorFilter::must(vec![FieldCondition::text("original_filename", "a.txt")]);
    store.delete_by_filter(COLLECTION, by_file.clone()).await.unwrap();
    assert_eq!(store.count(COLLECTION, Some(by_file)).await.unwrap(), 0);
    assert_eq!(store.count(COLLECTION, None).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn contradictory_filter_matches_nothing() {
    let (store, _container) = setup().await;
    store.ensure_collection(COLLECTION, 4).await.unwrap();
    store
        .upsert(
            COLLECTION,
            vec![chunk("doc_a_chunk_0", "a.txt", "final", vec![1.0, 0.0, 0.0, 0.0])],
        )
        .await
        .unwrap();

    let cond = FieldCondition::text("status", "final");
    let deny = VectorFilter {
        must: vec![cond.clone()],
        must_not: vec![cond],
    };
    let hits = store
        .search(COLLECTION, vec![1.0, 0.0, 0.0, 0.0], 5, Some(deny))
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn scroll_all_groups_by_filename() {
    let (store, _container) = setup().await;
    store.ensure_collection(COLLECTION, 4).await.unwrap();
    store
        .upsert(
            COLLECTION,
            vec![
                chunk("doc_a_chunk_0", "a.txt", "final", vec![1.0, 0.0, 0.0, 0.0]),
                chunk("doc_a_chunk_1", "a.txt", "final", vec![0.0, 0.0, 1.0, 0.0]),
                chunk("doc_b_chunk_0", "b.txt", "draft", vec![0.0, 1.0, 0.0, 0.0]),
            ],
        )
        .await
        .unwrap();

    let docs = store
        .scroll_all(COLLECTION, "original_filename")
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs["b.txt"]["status"], "draft");
}
