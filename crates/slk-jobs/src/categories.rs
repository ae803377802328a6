//! Product category sync.
//!
//! Remote `ProductGroups` are matched to local categories by `Guid`, falling
//! back to the group name against the category title so that categories
//! created locally before the remote identifier was known still link up.
//! Groups deleted on the remote side get their local `Guid` blanked rather
//! than the category removed, since the category may carry local content.

use crate::job::{ClearSpec, JobSpec};
use slk_core::{slugify, EntityKind, KeySpec, TransformError, TransformSet};

pub const JOB_NAME: &str = "ProductCategoryUpdate";

pub fn job_spec() -> JobSpec {
    let transforms = TransformSet::new().with("Title", |raw, draft| {
        let title = raw.as_str().ok_or_else(|| TransformError::Invalid {
            message: "group name is not a string".to_string(),
        })?;
        draft.set("URLSegment", slugify(title));
        Ok(raw.clone())
    });

    JobSpec {
        name: JOB_NAME,
        entity: EntityKind::ProductCategory,
        collection: "ProductGroups",
        external_key: "LastModifiedOn",
        key: KeySpec::new("Guid", "Guid").with_fallback("GroupName", "Title"),
        columns: vec![
            ("GroupName".to_string(), "Title".to_string()),
            ("Guid".to_string(), "Guid".to_string()),
        ],
        transforms,
        allow_create: false,
        clear_absent: Some(ClearSpec {
            remote_key_field: "Guid".to_string(),
            clear_field: "Guid".to_string(),
        }),
        local_unique: vec!["Title".to_string()],
        remote_unique: vec!["GroupName".to_string()],
        filter_timezone: None,
        source_id: None,
        subject: "Inventory sync: product category results",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slk_core::{plan_update, LocalRecord, RemoteRecord, StagedWrite, UpdatePolicy};
    use serde_json::json;

    fn remote(v: serde_json::Value) -> RemoteRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn title_change_also_restages_url_segment() {
        let spec = job_spec();
        let local = vec![LocalRecord::new(4)
            .with_field("Title", "Old Name")
            .with_field("URLSegment", "old-name")
            .with_field("Guid", "g-1")];
        let remote = vec![remote(json!({
            "Guid": "g-1",
            "GroupName": "New & Improved",
            "LastModifiedOn": "2026-02-01T00:00:00",
        }))];

        let policy = UpdatePolicy {
            key: &spec.key,
            columns: &spec.columns,
            transforms: &spec.transforms,
            allow_create: spec.allow_create,
        };
        let plan = plan_update(&local, &remote, &policy);
        assert_eq!(plan.updated, 1);
        match &plan.writes[0] {
            StagedWrite::Update { id, fields } => {
                assert_eq!(*id, 4);
                assert_eq!(fields["Title"], json!("New & Improved"));
                assert_eq!(fields["URLSegment"], json!("new-improved"));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn fallback_match_by_group_name_adopts_guid() {
        let spec = job_spec();
        let local = vec![LocalRecord::new(9).with_field("Title", "Widgets")];
        let remote = vec![remote(json!({
            "Guid": "g-new",
            "GroupName": "Widgets",
            "LastModifiedOn": "2026-02-01T00:00:00",
        }))];

        let policy = UpdatePolicy {
            key: &spec.key,
            columns: &spec.columns,
            transforms: &spec.transforms,
            allow_create: spec.allow_create,
        };
        let plan = plan_update(&local, &remote, &policy);
        assert_eq!(plan.updated, 1);
        match &plan.writes[0] {
            StagedWrite::Update { fields, .. } => {
                assert_eq!(fields["Guid"], json!("g-new"));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }
}
