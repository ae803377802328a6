use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One resource item exactly as returned by the remote API.
///
/// Ephemeral: exists only for the duration of one run. Field names are the
/// remote vocabulary (`ProductCode`, `GroupName`, `LastModifiedOn`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRecord(pub Map<String, Value>);

impl RemoteRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value as a string, for key matching and column projection.
    /// Numbers are rendered with their JSON representation; other shapes
    /// (objects, arrays, null) have no string form.
    pub fn get_str(&self, field: &str) -> Option<String> {
        match self.0.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A projection of one local entity row, keyed by logical field names
/// (`Title`, `Guid`, `InternalItemID`, `Status`, ...). The store owns the
/// row's lifecycle; the planner only reads these and stages writes by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: i64,
    pub fields: BTreeMap<String, Value>,
}

impl LocalRecord {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<String> {
        match self.fields.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Natural-key matching configuration: a designated identifier field plus an
/// optional fallback label pair (e.g. category `Guid`, falling back to
/// matching remote `GroupName` against local `Title`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub remote_field: String,
    pub local_field: String,
    pub fallback: Option<(String, String)>,
}

impl KeySpec {
    pub fn new(remote_field: impl Into<String>, local_field: impl Into<String>) -> Self {
        Self {
            remote_field: remote_field.into(),
            local_field: local_field.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(
        mut self,
        remote_field: impl Into<String>,
        local_field: impl Into<String>,
    ) -> Self {
        self.fallback = Some((remote_field.into(), local_field.into()));
        self
    }
}

/// Mutable handle to the in-progress local record, passed to field
/// transforms. `set` is the only sanctioned side channel: it lets a transform
/// derive another field of the *same* record (e.g. a URL segment from a
/// title). Transforms never see other records in the batch.
#[derive(Debug)]
pub struct RecordDraft<'a> {
    current: Option<&'a LocalRecord>,
    staged: BTreeMap<String, Value>,
}

impl<'a> RecordDraft<'a> {
    pub fn new(current: Option<&'a LocalRecord>) -> Self {
        Self {
            current,
            staged: BTreeMap::new(),
        }
    }

    /// The stored value of a field, before any staged change.
    pub fn current(&self, field: &str) -> Option<&Value> {
        self.current.and_then(|r| r.get(field))
    }

    /// Stage a field value on the in-progress record.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.staged.insert(field.into(), value.into());
    }

    pub(crate) fn local_id(&self) -> Option<i64> {
        self.current.map(|r| r.id)
    }

    /// Staged fields that actually differ from the stored record.
    /// For a create (no current record) every staged field counts.
    pub(crate) fn into_changes(self) -> BTreeMap<String, Value> {
        let current = self.current;
        self.staged
            .into_iter()
            .filter(|(field, value)| current.and_then(|r| r.get(field)) != Some(value))
            .collect()
    }
}

/// A single write staged by the planner, applied atomically per record by the
/// store (or never, on a preview run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StagedWrite {
    Create { fields: BTreeMap<String, Value> },
    Update { id: i64, fields: BTreeMap<String, Value> },
}

/// One field's before/after pair inside a [`RecordDiff`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub from: Option<Value>,
    pub to: Value,
}

/// Per-record evidence of what a run would change, keyed by the record's
/// natural-key value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDiff {
    pub key: String,
    pub changed: BTreeMap<String, FieldChange>,
}

/// A per-record failure that did not abort the batch (e.g. an unmapped
/// external status). Surfaced in the run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub key: String,
    pub field: String,
    pub message: String,
}

/// The outcome of one planning pass: staged writes plus the counts and diffs
/// consumed by notification and logging. Built fresh per run.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ReconcilePlan {
    pub writes: Vec<StagedWrite>,
    pub created: usize,
    pub updated: usize,
    pub cleared: usize,
    pub diffs: Vec<RecordDiff>,
    pub errors: Vec<RecordError>,
}

impl ReconcilePlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.cleared
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.errors.is_empty()
    }

    /// Append another pass's outcome (clear pass + update pass are reported
    /// as one result).
    pub fn merged(mut self, other: ReconcilePlan) -> ReconcilePlan {
        self.writes.extend(other.writes);
        self.created += other.created;
        self.updated += other.updated;
        self.cleared += other.cleared;
        self.diffs.extend(other.diffs);
        self.errors.extend(other.errors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote(v: Value) -> RemoteRecord {
        match v {
            Value::Object(m) => RemoteRecord(m),
            _ => panic!("remote record literal must be an object"),
        }
    }

    #[test]
    fn remote_record_get_str_handles_strings_and_numbers() {
        let r = remote(json!({"ProductCode": "P-1", "Qty": 7, "Nested": {"a": 1}}));
        assert_eq!(r.get_str("ProductCode").as_deref(), Some("P-1"));
        assert_eq!(r.get_str("Qty").as_deref(), Some("7"));
        assert_eq!(r.get_str("Nested"), None);
        assert_eq!(r.get_str("Missing"), None);
    }

    #[test]
    fn draft_changes_drop_values_equal_to_current() {
        let local = LocalRecord::new(1)
            .with_field("Title", "Widgets")
            .with_field("Guid", "G1");
        let mut draft = RecordDraft::new(Some(&local));
        draft.set("Title", "Widgets"); // unchanged
        draft.set("Guid", "G2"); // changed
        let changes = draft.into_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("Guid"), Some(&json!("G2")));
    }

    #[test]
    fn draft_for_create_keeps_every_staged_field() {
        let mut draft = RecordDraft::new(None);
        draft.set("Title", "Widgets");
        draft.set("URLSegment", "widgets");
        assert_eq!(draft.into_changes().len(), 2);
    }

    #[test]
    fn plan_merge_accumulates_counts_and_diffs() {
        let mut a = ReconcilePlan::empty();
        a.cleared = 1;
        a.diffs.push(RecordDiff {
            key: "G9".into(),
            changed: BTreeMap::new(),
        });
        let mut b = ReconcilePlan::empty();
        b.updated = 2;
        let merged = a.merged(b);
        assert_eq!(merged.total(), 3);
        assert_eq!(merged.diffs.len(), 1);
        assert!(!merged.is_empty());
    }
}
