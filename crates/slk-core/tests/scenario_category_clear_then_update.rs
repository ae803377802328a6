// Category sync scenario: a clear-absent pass followed by an update pass.
//
// Local store:  {Title: "Widgets", Guid: "G1"}, {Title: "Gadgets", Guid: ""}
// Remote batch: [{Guid: "G1", GroupName: "Widgets Updated"}]
//
// Expected: "Gadgets" untouched (its Guid is already empty), the "Widgets"
// record's Title updates, updated = 1, cleared = 0.

use serde_json::json;
use slk_core::{
    plan_clear_absent, plan_update, KeySpec, LocalRecord, RemoteRecord, StagedWrite, TransformSet,
    UpdatePolicy,
};

fn remote(v: serde_json::Value) -> RemoteRecord {
    match v {
        serde_json::Value::Object(m) => RemoteRecord(m),
        _ => panic!("remote record literal must be an object"),
    }
}

#[test]
fn scenario_category_clear_then_update() {
    let local = vec![
        LocalRecord::new(1)
            .with_field("Title", "Widgets")
            .with_field("Guid", "G1"),
        LocalRecord::new(2)
            .with_field("Title", "Gadgets")
            .with_field("Guid", ""),
    ];
    let remote_batch = vec![remote(json!({
        "Guid": "G1",
        "GroupName": "Widgets Updated"
    }))];

    let clear_plan = plan_clear_absent(&local, &remote_batch, "Guid", "Guid");
    assert_eq!(clear_plan.cleared, 0);
    assert!(clear_plan.writes.is_empty());

    let key = KeySpec::new("Guid", "Guid").with_fallback("GroupName", "Title");
    let transforms = TransformSet::new();
    let columns = vec![
        ("GroupName".to_string(), "Title".to_string()),
        ("Guid".to_string(), "Guid".to_string()),
    ];
    let policy = UpdatePolicy {
        key: &key,
        columns: &columns,
        transforms: &transforms,
        allow_create: false,
    };
    let update_plan = plan_update(&local, &remote_batch, &policy);

    assert_eq!(update_plan.updated, 1);
    assert_eq!(update_plan.created, 0);
    match &update_plan.writes[0] {
        StagedWrite::Update { id, fields } => {
            assert_eq!(*id, 1);
            assert_eq!(fields.get("Title"), Some(&json!("Widgets Updated")));
        }
        other => panic!("expected update, got {other:?}"),
    }

    let combined = clear_plan.merged(update_plan);
    assert_eq!(combined.total(), 1);
}
