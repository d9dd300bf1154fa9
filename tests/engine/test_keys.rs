use aerodetect_node::catalog::keys;

#[test]
fn sidecar_key_is_a_pure_function_of_the_annotated_key() {
    let inputs = [
        "processed/foo_annotated.jpg",
        "processed/scene1_ship_annotated.jpg",
        "processed/deep/nest_annotated.png",
        "processed/UPPER_annotated.JPEG",
    ];
    for key in inputs {
        let first = keys::metadata_key_for(key);
        let second = keys::metadata_key_for(key);
        assert!(first.is_some(), "{key} should have a companion");
        assert_eq!(first, second);
    }
}

#[test]
fn non_matching_keys_yield_no_companion_without_raising() {
    for key in [
        "processed/foo.jpg",
        "processed/foo_detections.json",
        "uploads/u1/foo.jpg",
        "",
        "processed/",
    ] {
        assert_eq!(keys::metadata_key_for(key), None);
    }
}

#[test]
fn both_directions_agree() {
    let annotated = "processed/harbor_ship_annotated.jpg";
    let sidecar = keys::metadata_key_for(annotated).unwrap();
    assert_eq!(sidecar, "processed/harbor_ship_detections.json");
    assert_eq!(keys::annotated_key_for(&sidecar).unwrap(), annotated);
}
