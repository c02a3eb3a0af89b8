use qsb_core::{RunProvenance, SchemaVersion};

#[test]
fn schema_versions_display_and_compatibility() {
    let reader = SchemaVersion::new(1, 2, 0);
    assert_eq!(reader.to_string(), "1.2.0");
    assert!(reader.reads(&SchemaVersion::new(1, 1, 7)));
    assert!(!reader.reads(&SchemaVersion::new(1, 3, 0)));
    assert!(!reader.reads(&SchemaVersion::new(2, 0, 0)));
    assert_eq!(SchemaVersion::default(), SchemaVersion::new(1, 0, 0));
}

#[test]
fn provenance_builder_round_trips_through_json() {
    let stamp = RunProvenance::new("cfg", "obs", 42)
        .created_at("2026-01-01T00:00:00+00:00")
        .with_tool("qsb-exp", "0.1.0");
    assert_eq!(stamp.tool_versions.get("qsb-exp").map(String::as_str), Some("0.1.0"));

    let json = serde_json::to_string(&stamp).unwrap();
    let back: RunProvenance = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stamp);
}
