use aerodetect_node::catalog::AssetKind;
use aerodetect_node::detection::{BoundingBox, DetectionMode, DetectionRecord, MockDetectionApi};
use aerodetect_node::storage::MockAssetStore;
use aerodetect_node::{Engine, EngineConfig};
use bytes::Bytes;
use std::sync::Arc;

fn engine_with_publish() -> (Engine, Arc<MockAssetStore>, Arc<MockDetectionApi>) {
    let store = Arc::new(MockAssetStore::new());
    let api = Arc::new(MockDetectionApi::new().with_publish_store(store.clone()));
    let engine = Engine::new(store.clone(), api.clone(), &EngineConfig::default());
    (engine, store, api)
}

#[tokio::test]
async fn upload_stores_under_owner_prefix_and_refreshes() {
    let (engine, store, _api) = engine_with_publish();

    let key = engine
        .upload("u1", "plane.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();

    assert_eq!(key, "uploads/u1/plane.jpg");
    assert!(store.contains(&key));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.uploads.len(), 1);
    assert_eq!(snapshot.uploads[0].kind, AssetKind::Upload);
    assert_eq!(snapshot.uploads[0].owner.as_deref(), Some("u1"));
}

#[tokio::test]
async fn run_detection_refreshes_exactly_once_after_the_batch() {
    let (engine, store, api) = engine_with_publish();
    engine
        .upload("u1", "a.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    engine
        .upload("u1", "b.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    engine
        .upload("u1", "c.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    api.fail_for("b.jpg", "endpoint unreachable");

    let keys: Vec<String> = ["a.jpg", "b.jpg", "c.jpg"]
        .iter()
        .map(|n| format!("uploads/u1/{n}"))
        .collect();

    let lists_before = store.list_call_count();
    let (outcomes, snapshot) = engine
        .run_detection("u1", &keys, DetectionMode::Both)
        .await
        .unwrap();

    // One refresh = one list per prefix, issued only after all three
    // requests settled.
    assert_eq!(store.list_call_count() - lists_before, 2);

    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert!(outcomes[2].is_success());

    let annotated_keys: Vec<&str> = snapshot
        .annotated
        .iter()
        .map(|r| r.asset.key.as_str())
        .collect();
    assert!(annotated_keys.contains(&"processed/a_annotated.jpg"));
    assert!(annotated_keys.contains(&"processed/c_annotated.jpg"));
    assert!(!annotated_keys.contains(&"processed/b_annotated.jpg"));
}

#[tokio::test]
async fn detection_results_flow_back_through_the_catalog() {
    let (engine, _store, api) = engine_with_publish();
    engine
        .upload("u1", "harbor.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    api.script_detections(
        "harbor.jpg",
        vec![
            DetectionRecord {
                class_name: "ship".to_string(),
                confidence: 0.88,
                bbox: BoundingBox::new(50.0, 60.0, 40.0, 30.0),
            },
            DetectionRecord {
                class_name: "ship".to_string(),
                confidence: 0.71,
                bbox: BoundingBox::new(5.0, 5.0, 12.0, 9.0),
            },
        ],
    );

    let keys = vec!["uploads/u1/harbor.jpg".to_string()];
    let (outcomes, snapshot) = engine
        .run_detection("u1", &keys, DetectionMode::Ship)
        .await
        .unwrap();
    assert!(outcomes[0].is_success());

    let annotated = snapshot
        .annotated
        .iter()
        .find(|r| r.asset.key == "processed/harbor_annotated.jpg")
        .unwrap();
    assert_eq!(annotated.detections.len(), 2);
    assert_eq!(annotated.detections[0].confidence, 0.88);
}

#[tokio::test]
async fn detect_selected_uses_the_upload_selection() {
    let (mut engine, _store, api) = engine_with_publish();
    engine
        .upload("u1", "a.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    engine
        .upload("u1", "b.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();

    engine
        .selection_mut()
        .toggle_upload("uploads/u1/a.jpg")
        .unwrap();

    let (outcomes, _snapshot) = engine
        .detect_selected("u1", DetectionMode::CombinedModel)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].upload_key, "uploads/u1/a.jpg");
    assert_eq!(
        api.calls(),
        vec![("a.jpg".to_string(), DetectionMode::CombinedModel)]
    );
}

#[tokio::test]
async fn focused_crop_uses_the_configured_padding() {
    let store = Arc::new(MockAssetStore::new());
    let api = Arc::new(MockDetectionApi::new().with_publish_store(store.clone()));
    let mut config = EngineConfig::default();
    config.crop_padding = 5.0;
    let mut engine = Engine::new(store, api.clone(), &config);

    engine
        .upload("u1", "harbor.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    api.script_detections(
        "harbor.jpg",
        vec![DetectionRecord {
            class_name: "ship".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(50.0, 60.0, 40.0, 30.0),
        }],
    );
    let keys = vec!["uploads/u1/harbor.jpg".to_string()];
    engine
        .run_detection("u1", &keys, DetectionMode::Ship)
        .await
        .unwrap();

    let annotated_key = "processed/harbor_annotated.jpg";
    assert_eq!(engine.focused_crop(annotated_key), None);

    engine.selection_mut().toggle_detection(annotated_key, 0);
    let crop = engine.focused_crop(annotated_key).unwrap();
    assert_eq!((crop.x, crop.y), (45.0, 55.0));
    assert_eq!((crop.width, crop.height), (50.0, 40.0));

    // Out-of-range focus falls back to the full image.
    engine.selection_mut().toggle_detection(annotated_key, 0);
    engine.selection_mut().toggle_detection(annotated_key, 7);
    assert_eq!(engine.focused_crop(annotated_key), None);
}

#[tokio::test]
async fn deleting_an_annotated_asset_removes_its_sidecar_and_refreshes() {
    let (engine, store, api) = engine_with_publish();
    engine
        .upload("u1", "plane.jpg", Bytes::from_static(b"jpeg"))
        .await
        .unwrap();
    api.script_detections(
        "plane.jpg",
        vec![DetectionRecord {
            class_name: "airplane".to_string(),
            confidence: 0.95,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        }],
    );
    let keys = vec!["uploads/u1/plane.jpg".to_string()];
    engine
        .run_detection("u1", &keys, DetectionMode::Airplane)
        .await
        .unwrap();
    assert!(store.contains("processed/plane_annotated.jpg"));
    assert!(store.contains("processed/plane_detections.json"));

    let snapshot = engine
        .delete("u1", "processed/plane_annotated.jpg")
        .await
        .unwrap();

    assert!(!store.contains("processed/plane_annotated.jpg"));
    assert!(!store.contains("processed/plane_detections.json"));
    assert!(snapshot.annotated.is_empty());
    // The raw upload is untouched.
    assert_eq!(snapshot.uploads.len(), 1);
}
