//! Product sync.
//!
//! Remote products are matched by `ProductCode` against the local
//! `InternalItemID`. The parent link is resolved against a category index
//! loaded up front so the transform stays a pure lookup; a product whose
//! remote group resolves to no local category is surfaced as a record error
//! instead of being silently unlinked.

use crate::job::JobSpec;
use anyhow::Result;
use chrono_tz::Tz;
use serde_json::Value;
use slk_core::{
    slugify, EntityKind, KeySpec, LocalStore, TransformError, TransformSet,
};
use std::collections::BTreeMap;

pub const JOB_NAME: &str = "ProductUpdate";

/// Local category ids by remote identifier, `Guid` first, title second.
struct CategoryIndex {
    by_guid: BTreeMap<String, i64>,
    by_title: BTreeMap<String, i64>,
}

impl CategoryIndex {
    async fn load(local: &dyn LocalStore) -> Result<Self> {
        let mut by_guid = BTreeMap::new();
        let mut by_title = BTreeMap::new();
        for cat in local.load_all(EntityKind::ProductCategory).await? {
            if let Some(guid) = cat.get_str("Guid") {
                if !guid.is_empty() {
                    by_guid.insert(guid, cat.id);
                }
            }
            if let Some(title) = cat.get_str("Title") {
                if !title.is_empty() {
                    by_title.insert(title, cat.id);
                }
            }
        }
        Ok(Self { by_guid, by_title })
    }

    fn resolve(&self, group: &Value) -> Option<i64> {
        let guid = group.get("Guid").and_then(Value::as_str);
        if let Some(id) = guid.and_then(|g| self.by_guid.get(g)) {
            return Some(*id);
        }
        let name = group.get("GroupName").and_then(Value::as_str);
        name.and_then(|n| self.by_title.get(n)).copied()
    }
}

fn parse_price(raw: &Value) -> Result<f64, TransformError> {
    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(|| TransformError::Invalid {
            message: format!("price out of range: {n}"),
        }),
        Value::String(s) => s.trim().parse().map_err(|_| TransformError::Invalid {
            message: format!("unparseable price: {s:?}"),
        }),
        other => Err(TransformError::Invalid {
            message: format!("unexpected price shape: {other}"),
        }),
    }
}

/// Builds the product job. Loads the category index from `local`, so run it
/// after a category sync when parent links matter.
pub async fn job_spec(local: &dyn LocalStore, filter_timezone: Option<Tz>) -> Result<JobSpec> {
    let index = CategoryIndex::load(local).await?;

    let transforms = TransformSet::new()
        .with("Title", |raw, draft| {
            let title = raw.as_str().ok_or_else(|| TransformError::Invalid {
                message: "product description is not a string".to_string(),
            })?;
            draft.set("URLSegment", slugify(title));
            Ok(raw.clone())
        })
        .with("BasePrice", |raw, _| parse_price(raw).map(Value::from))
        .with("ParentID", move |raw, _| {
            if raw.is_null() {
                return Ok(Value::Null);
            }
            match index.resolve(raw) {
                Some(id) => Ok(Value::from(id)),
                None => Err(TransformError::Invalid {
                    message: format!("no local category for product group {raw}"),
                }),
            }
        });

    Ok(JobSpec {
        name: JOB_NAME,
        entity: EntityKind::Product,
        collection: "Products",
        external_key: "LastModifiedOn",
        key: KeySpec::new("ProductCode", "InternalItemID"),
        columns: vec![
            ("ProductDescription".to_string(), "Title".to_string()),
            ("DefaultSellPrice".to_string(), "BasePrice".to_string()),
            ("ProductGroup".to_string(), "ParentID".to_string()),
        ],
        transforms,
        allow_create: false,
        clear_absent: None,
        local_unique: vec!["InternalItemID".to_string(), "Title".to_string()],
        remote_unique: vec!["ProductCode".to_string()],
        filter_timezone,
        source_id: None,
        subject: "Inventory sync: product results",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slk_core::{plan_update, LocalRecord, RemoteRecord, StagedWrite, UpdatePolicy};
    use slk_testkit::MemStore;

    fn remote(v: serde_json::Value) -> RemoteRecord {
        serde_json::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn parent_resolves_by_guid_then_title() {
        let store = MemStore::new();
        let by_guid = store.seed(
            EntityKind::ProductCategory,
            &[("Title", json!("Widgets")), ("Guid", json!("g-1"))],
        );
        let by_title = store.seed(
            EntityKind::ProductCategory,
            &[("Title", json!("Gadgets"))],
        );
        store.seed(
            EntityKind::Product,
            &[("InternalItemID", json!("P-1")), ("Title", json!("A"))],
        );
        store.seed(
            EntityKind::Product,
            &[("InternalItemID", json!("P-2")), ("Title", json!("B"))],
        );

        let spec = job_spec(&store, None).await.unwrap();
        let local = store.snapshot(EntityKind::Product);
        let batch = vec![
            remote(json!({
                "ProductCode": "P-1",
                "ProductDescription": "A",
                "ProductGroup": {"Guid": "g-1", "GroupName": "renamed"},
            })),
            remote(json!({
                "ProductCode": "P-2",
                "ProductDescription": "B",
                "ProductGroup": {"Guid": "g-unknown", "GroupName": "Gadgets"},
            })),
        ];

        let policy = UpdatePolicy {
            key: &spec.key,
            columns: &spec.columns,
            transforms: &spec.transforms,
            allow_create: spec.allow_create,
        };
        let plan = plan_update(&local, &batch, &policy);
        assert_eq!(plan.updated, 2);
        let parents: Vec<i64> = plan
            .writes
            .iter()
            .map(|w| match w {
                StagedWrite::Update { fields, .. } => fields["ParentID"].as_i64().unwrap(),
                other => panic!("expected update, got {other:?}"),
            })
            .collect();
        assert_eq!(parents, vec![by_guid, by_title]);
    }

    #[tokio::test]
    async fn unresolved_group_surfaces_as_record_error() {
        let store = MemStore::new();
        store.seed(
            EntityKind::Product,
            &[("InternalItemID", json!("P-1")), ("Title", json!("A"))],
        );

        let spec = job_spec(&store, None).await.unwrap();
        let local = store.snapshot(EntityKind::Product);
        let batch = vec![remote(json!({
            "ProductCode": "P-1",
            "ProductDescription": "A renamed",
            "ProductGroup": {"Guid": "nope", "GroupName": "nope"},
        }))];

        let policy = UpdatePolicy {
            key: &spec.key,
            columns: &spec.columns,
            transforms: &spec.transforms,
            allow_create: spec.allow_create,
        };
        let plan = plan_update(&local, &batch, &policy);
        assert_eq!(plan.updated, 0);
        assert_eq!(plan.errors.len(), 1);
        assert_eq!(plan.errors[0].key, "P-1");
        assert_eq!(plan.errors[0].field, "ParentID");
    }

    #[test]
    fn price_parses_numbers_and_numeric_strings() {
        assert_eq!(parse_price(&json!(12.5)).unwrap(), 12.5);
        assert_eq!(parse_price(&json!("8.99")).unwrap(), 8.99);
        assert!(parse_price(&json!("free")).is_err());
        assert!(parse_price(&json!({"amount": 1})).is_err());
    }
}
