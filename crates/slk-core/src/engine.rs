//! Reconciliation planner.
//!
//! Pure functions over pre-loaded local records and a fetched remote batch.
//! Nothing here touches a store: both passes return a [`ReconcilePlan`] of
//! staged writes, and the caller decides whether to apply it (a preview run
//! computes the full plan and applies nothing).

use crate::transform::TransformSet;
use crate::types::{
    FieldChange, KeySpec, LocalRecord, ReconcilePlan, RecordDiff, RecordDraft, RecordError,
    RemoteRecord, StagedWrite,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Configuration for one update pass.
pub struct UpdatePolicy<'a> {
    /// Natural-key matching (identifier, with optional fallback label pair).
    pub key: &'a KeySpec,
    /// `(remote_field, local_field)` pairs to carry across. Fields absent
    /// from a remote record are left untouched on the local record.
    pub columns: &'a [(String, String)],
    pub transforms: &'a TransformSet,
    /// When false, remote records without a local match are skipped: catalog
    /// entities are enriched here, never provisioned.
    pub allow_create: bool,
}

fn index_by<'a>(local: &'a [LocalRecord], field: &str) -> BTreeMap<String, &'a LocalRecord> {
    let mut index = BTreeMap::new();
    for rec in local {
        if let Some(v) = rec.get_str(field) {
            if !v.is_empty() {
                index.insert(v, rec);
            }
        }
    }
    index
}

/// Match each remote record to at most one local record and stage the field
/// updates (or creates, when permitted) needed to align them.
///
/// A transform failure (e.g. an unmapped status code) voids that record's
/// staged write and is recorded in `plan.errors`; the rest of the batch
/// proceeds. Records that match but produce no differing field are counted
/// nowhere and staged nowhere, which is what makes a repeated run a no-op.
pub fn plan_update(
    local: &[LocalRecord],
    remote: &[RemoteRecord],
    policy: &UpdatePolicy<'_>,
) -> ReconcilePlan {
    let primary = index_by(local, &policy.key.local_field);
    let fallback = policy
        .key
        .fallback
        .as_ref()
        .map(|(_, local_field)| index_by(local, local_field));

    let mut plan = ReconcilePlan::empty();

    for record in remote {
        let key_value = record
            .get_str(&policy.key.remote_field)
            .filter(|v| !v.is_empty());

        let mut matched = key_value.as_ref().and_then(|v| primary.get(v)).copied();
        let mut display_key = key_value.clone().unwrap_or_default();
        if matched.is_none() {
            if let (Some((remote_fb, _)), Some(fb_index)) = (&policy.key.fallback, &fallback) {
                if let Some(fb_value) = record.get_str(remote_fb).filter(|v| !v.is_empty()) {
                    matched = fb_index.get(&fb_value).copied();
                    if matched.is_some() && display_key.is_empty() {
                        display_key = fb_value;
                    }
                }
            }
        }

        match matched {
            Some(local_rec) => {
                let mut draft = RecordDraft::new(Some(local_rec));
                if !stage_columns(record, policy, &mut draft, &display_key, &mut plan.errors) {
                    continue;
                }
                let changes = draft.into_changes();
                if changes.is_empty() {
                    continue;
                }
                plan.diffs.push(diff_for(&display_key, &changes, Some(local_rec)));
                plan.writes.push(StagedWrite::Update {
                    id: local_rec.id,
                    fields: changes,
                });
                plan.updated += 1;
            }
            None => {
                if !policy.allow_create {
                    continue;
                }
                let Some(key_value) = key_value else {
                    plan.errors.push(RecordError {
                        key: display_key,
                        field: policy.key.remote_field.clone(),
                        message: "missing natural key field".to_string(),
                    });
                    continue;
                };
                let mut draft = RecordDraft::new(None);
                draft.set(policy.key.local_field.clone(), key_value.clone());
                if !stage_columns(record, policy, &mut draft, &key_value, &mut plan.errors) {
                    continue;
                }
                let fields = draft.into_changes();
                plan.diffs.push(diff_for(&key_value, &fields, None));
                plan.writes.push(StagedWrite::Create { fields });
                plan.created += 1;
            }
        }
    }

    plan
}

/// Stage every mapped column present on `record`. Returns false when a
/// transform refused a value, in which case the error has been recorded and
/// the record must not be written.
fn stage_columns(
    record: &RemoteRecord,
    policy: &UpdatePolicy<'_>,
    draft: &mut RecordDraft<'_>,
    display_key: &str,
    errors: &mut Vec<RecordError>,
) -> bool {
    for (remote_field, local_field) in policy.columns {
        let Some(raw) = record.get(remote_field) else {
            continue;
        };
        match policy.transforms.apply(local_field, raw, draft) {
            Ok(value) => draft.set(local_field.clone(), value),
            Err(err) => {
                errors.push(RecordError {
                    key: display_key.to_string(),
                    field: local_field.clone(),
                    message: err.to_string(),
                });
                return false;
            }
        }
    }
    true
}

fn diff_for(
    key: &str,
    changes: &BTreeMap<String, Value>,
    current: Option<&LocalRecord>,
) -> RecordDiff {
    RecordDiff {
        key: key.to_string(),
        changed: changes
            .iter()
            .map(|(field, to)| {
                (
                    field.clone(),
                    FieldChange {
                        from: current.and_then(|r| r.get(field)).cloned(),
                        to: to.clone(),
                    },
                )
            })
            .collect(),
    }
}

/// De-link local records whose external identity the remote system no longer
/// reports: every local record with a non-empty `clear_field` value that does
/// not appear among the remote batch's `remote_key_field` values gets that
/// field staged to the empty string. Records are never deleted, and records
/// whose key is present are never touched.
pub fn plan_clear_absent(
    local: &[LocalRecord],
    remote: &[RemoteRecord],
    remote_key_field: &str,
    clear_field: &str,
) -> ReconcilePlan {
    let remote_keys: BTreeSet<String> = remote
        .iter()
        .filter_map(|r| r.get_str(remote_key_field))
        .filter(|v| !v.is_empty())
        .collect();

    let mut plan = ReconcilePlan::empty();
    for rec in local {
        let Some(value) = rec.get_str(clear_field).filter(|v| !v.is_empty()) else {
            continue;
        };
        if remote_keys.contains(&value) {
            continue;
        }
        let mut fields = BTreeMap::new();
        fields.insert(clear_field.to_string(), Value::String(String::new()));
        plan.diffs.push(RecordDiff {
            key: value.clone(),
            changed: BTreeMap::from([(
                clear_field.to_string(),
                FieldChange {
                    from: rec.get(clear_field).cloned(),
                    to: Value::String(String::new()),
                },
            )]),
        });
        plan.writes.push(StagedWrite::Update { id: rec.id, fields });
        plan.cleared += 1;
    }
    plan
}
