use aerodetect_node::detection::{
    BoundingBox, DetectionClient, DetectionError, DetectionMode, DetectionRecord, HttpDetectionApi,
    MockDetectionApi,
};
use aerodetect_node::storage::MockAssetStore;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

fn seeded_store(names: &[&str]) -> Arc<MockAssetStore> {
    let store = Arc::new(MockAssetStore::new());
    for name in names {
        store.insert(
            &format!("uploads/u1/{name}"),
            Bytes::from_static(b"jpeg-bytes"),
        );
    }
    store
}

#[tokio::test]
async fn detect_one_submits_basename_and_mode() {
    let store = seeded_store(&["plane.jpg"]);
    let api = Arc::new(MockDetectionApi::new());
    let client = DetectionClient::new(store, api.clone(), 9);

    let reply = client
        .detect_one("uploads/u1/plane.jpg", DetectionMode::Airplane)
        .await
        .unwrap();

    assert!(reply.s3_url.contains("processed/plane_annotated.jpg"));
    assert_eq!(reply.filename.as_deref(), Some("plane_annotated.jpg"));
    assert_eq!(
        api.calls(),
        vec![("plane.jpg".to_string(), DetectionMode::Airplane)]
    );
}

#[tokio::test]
async fn detect_one_fails_when_upload_is_absent() {
    let store = seeded_store(&[]);
    let api = Arc::new(MockDetectionApi::new());
    let client = DetectionClient::new(store, api, 9);

    let result = client
        .detect_one("uploads/u1/ghost.jpg", DetectionMode::Ship)
        .await;
    assert!(matches!(result, Err(DetectionError::Store(_))));
}

#[tokio::test]
async fn batch_isolates_one_failure_and_preserves_order() {
    let store = seeded_store(&["a.jpg", "b.jpg", "c.jpg"]);
    let api = Arc::new(MockDetectionApi::new());
    api.fail_for("b.jpg", "endpoint unreachable");
    let client = DetectionClient::new(store, api, 9);

    let keys: Vec<String> = ["a.jpg", "b.jpg", "c.jpg"]
        .iter()
        .map(|n| format!("uploads/u1/{n}"))
        .collect();
    let outcomes = client.detect_batch(&keys, DetectionMode::Both).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].upload_key, "uploads/u1/a.jpg");
    assert_eq!(outcomes[1].upload_key, "uploads/u1/b.jpg");
    assert_eq!(outcomes[2].upload_key, "uploads/u1/c.jpg");
    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert!(outcomes[2].is_success());
}

#[tokio::test]
async fn batch_respects_the_concurrency_ceiling() {
    let names = ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg", "f.jpg"];
    let store = seeded_store(&names);
    let api = Arc::new(MockDetectionApi::new().with_delay(Duration::from_millis(30)));
    let client = DetectionClient::new(store, api.clone(), 2);

    let keys: Vec<String> = names.iter().map(|n| format!("uploads/u1/{n}")).collect();
    let outcomes = client.detect_batch(&keys, DetectionMode::Airplane).await;

    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(api.calls().len(), 6);
    assert!(
        api.peak_in_flight() <= 2,
        "observed {} in-flight requests",
        api.peak_in_flight()
    );
}

#[tokio::test]
async fn batch_returns_only_after_every_request_settles() {
    let names = ["a.jpg", "b.jpg", "c.jpg"];
    let store = seeded_store(&names);
    let api = Arc::new(MockDetectionApi::new().with_delay(Duration::from_millis(20)));
    api.fail_for("a.jpg", "slow failure");
    let client = DetectionClient::new(store, api.clone(), 1);

    let keys: Vec<String> = names.iter().map(|n| format!("uploads/u1/{n}")).collect();
    let outcomes = client.detect_batch(&keys, DetectionMode::Ship).await;

    // Join-all barrier: all three settled even though the first failed.
    assert_eq!(outcomes.len(), 3);
    assert_eq!(api.calls().len(), 3);
}

#[tokio::test]
async fn batch_publishes_overwriting_outputs_for_repeat_runs() {
    let store = seeded_store(&["plane.jpg"]);
    let api = Arc::new(MockDetectionApi::new().with_publish_store(store.clone()));
    api.script_detections(
        "plane.jpg",
        vec![DetectionRecord {
            class_name: "airplane".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
        }],
    );
    let client = DetectionClient::new(store.clone(), api, 9);

    let keys = vec!["uploads/u1/plane.jpg".to_string()];
    client.detect_batch(&keys, DetectionMode::Airplane).await;
    client.detect_batch(&keys, DetectionMode::Airplane).await;

    // Deterministic naming means a re-run overwrites rather than duplicates.
    let processed: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|k| k.starts_with("processed/"))
        .collect();
    assert_eq!(
        processed,
        vec![
            "processed/plane_annotated.jpg".to_string(),
            "processed/plane_detections.json".to_string(),
        ]
    );
}

#[test]
fn http_api_rejects_a_malformed_endpoint() {
    let result = HttpDetectionApi::new("not a url", 5);
    assert!(matches!(result, Err(DetectionError::Transport(_))));
}
