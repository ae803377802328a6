// Idempotence: applying a plan's staged writes to the local snapshot and
// planning again with the same remote batch stages nothing the second time,
// and planning twice from the same state yields identical diffs.

use serde_json::{json, Value};
use slk_core::{
    plan_update, KeySpec, LocalRecord, RemoteRecord, StagedWrite, TransformSet, UpdatePolicy,
};

fn remote(v: Value) -> RemoteRecord {
    match v {
        Value::Object(m) => RemoteRecord(m),
        _ => panic!("remote record literal must be an object"),
    }
}

fn apply_to_snapshot(local: &mut [LocalRecord], writes: &[StagedWrite]) {
    for write in writes {
        if let StagedWrite::Update { id, fields } = write {
            let rec = local
                .iter_mut()
                .find(|r| r.id == *id)
                .expect("staged update targets a loaded record");
            for (field, value) in fields {
                rec.fields.insert(field.clone(), value.clone());
            }
        }
    }
}

#[test]
fn scenario_repeat_run_is_noop() {
    let mut local = vec![
        LocalRecord::new(1)
            .with_field("InternalItemID", "P-1")
            .with_field("Title", "Old Name")
            .with_field("BasePrice", 10.0),
        LocalRecord::new(2)
            .with_field("InternalItemID", "P-2")
            .with_field("Title", "Stable")
            .with_field("BasePrice", 5.0),
    ];
    let remote_batch = vec![
        remote(json!({
            "ProductCode": "P-1",
            "ProductDescription": "New Name",
            "DefaultSellPrice": 12.0
        })),
        remote(json!({
            "ProductCode": "P-2",
            "ProductDescription": "Stable",
            "DefaultSellPrice": 5.0
        })),
    ];

    let key = KeySpec::new("ProductCode", "InternalItemID");
    let transforms = TransformSet::new();
    let columns = vec![
        ("ProductDescription".to_string(), "Title".to_string()),
        ("DefaultSellPrice".to_string(), "BasePrice".to_string()),
    ];
    let policy = UpdatePolicy {
        key: &key,
        columns: &columns,
        transforms: &transforms,
        allow_create: false,
    };

    let first = plan_update(&local, &remote_batch, &policy);
    let first_again = plan_update(&local, &remote_batch, &policy);
    assert_eq!(first, first_again, "planning is deterministic");
    assert_eq!(first.updated, 1);

    apply_to_snapshot(&mut local, &first.writes);

    let second = plan_update(&local, &remote_batch, &policy);
    assert_eq!(second.updated, 0);
    assert!(second.writes.is_empty());
    assert!(second.diffs.is_empty());
}
