use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Values occurring more than once in `values`, each reported at most once,
/// in deterministic order.
///
/// Empty strings are ignored: a record without a key value is unmatched, not
/// ambiguous, and must not abort a run.
pub fn find_duplicates<S: AsRef<str>>(values: &[S]) -> BTreeSet<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        let v = v.as_ref();
        if v.is_empty() {
            continue;
        }
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(v, _)| v.to_string())
        .collect()
}

/// A uniqueness violation in the local or remote keyspace.
///
/// Fatal for the run: reconciliation against an ambiguous keyspace could
/// match the wrong record, so the run stops with zero mutations performed and
/// the watermark untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKeyError {
    /// Where the violation was found, e.g. `"local Product.InternalItemID"`
    /// or `"remote ProductCode"`.
    pub scope: String,
    pub values: BTreeSet<String>,
}

impl DuplicateKeyError {
    pub fn new(scope: impl Into<String>, values: BTreeSet<String>) -> Self {
        Self {
            scope: scope.into(),
            values,
        }
    }
}

impl fmt::Display for DuplicateKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<&str> = self.values.iter().map(|s| s.as_str()).collect();
        write!(
            f,
            "duplicate keys in {}: {} — remove the duplicates before running this sync",
            self.scope,
            values.join(", ")
        )
    }
}

impl std::error::Error for DuplicateKeyError {}
