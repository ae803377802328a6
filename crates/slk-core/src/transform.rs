use crate::types::RecordDraft;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Why a field transform refused a raw value. The planner records the
/// failure against the record and moves on; the batch is not aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// An external status value with no entry in the configured status map.
    UnknownStatus { code: String },
    /// The raw value could not be converted (bad number, unresolvable
    /// reference, ...).
    Invalid { message: String },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::UnknownStatus { code } => {
                write!(f, "unknown external status code '{code}'")
            }
            TransformError::Invalid { message } => write!(f, "invalid value: {message}"),
        }
    }
}

impl std::error::Error for TransformError {}

type TransformFn = dyn Fn(&Value, &mut RecordDraft) -> Result<Value, TransformError> + Send + Sync;

/// Mapping from local field name to the transformation applied to that
/// field's raw remote value before it is staged. Fields without an entry
/// pass through unchanged.
///
/// A transform receives the in-progress record draft and may stage derived
/// fields on it (see [`RecordDraft::set`]); it must not depend on any other
/// record in the batch.
#[derive(Default)]
pub struct TransformSet {
    map: BTreeMap<String, Box<TransformFn>>,
}

impl TransformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, field: impl Into<String>, f: F)
    where
        F: Fn(&Value, &mut RecordDraft) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.map.insert(field.into(), Box::new(f));
    }

    pub fn with<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &mut RecordDraft) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        self.insert(field, f);
        self
    }

    /// Apply the transform configured for `field`, or identity when none is.
    pub fn apply(
        &self,
        field: &str,
        raw: &Value,
        draft: &mut RecordDraft,
    ) -> Result<Value, TransformError> {
        match self.map.get(field) {
            Some(f) => f(raw, draft),
            None => Ok(raw.clone()),
        }
    }
}

impl fmt::Debug for TransformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformSet")
            .field("fields", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// URL-safe slug of a title, used to derive `URLSegment` alongside `Title`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_dash = true; // suppress a leading dash
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
