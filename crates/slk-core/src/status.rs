use std::collections::BTreeMap;
use std::fmt;

/// An external status value with no entry in the configured [`StatusMap`].
///
/// The map is total over the enumerated external vocabulary by design; a new
/// value introduced by the remote system is a configuration gap requiring a
/// deliberate update, not something to paper over with a runtime fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatusCode {
    pub code: String,
}

impl fmt::Display for UnknownStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "external status '{}' has no local mapping; update the status map",
            self.code
        )
    }
}

impl std::error::Error for UnknownStatusCode {}

/// Immutable closed mapping from external status vocabulary to local status
/// vocabulary, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMap {
    map: BTreeMap<String, String>,
}

impl StatusMap {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            map: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn translate(&self, external: &str) -> Result<&str, UnknownStatusCode> {
        self.map
            .get(external)
            .map(|s| s.as_str())
            .ok_or_else(|| UnknownStatusCode {
                code: external.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> StatusMap {
        StatusMap::from_pairs(&[("Dispatched", "Sent"), ("Open", "Unpaid")])
    }

    #[test]
    fn translates_mapped_statuses() {
        assert_eq!(map().translate("Dispatched").unwrap(), "Sent");
        assert_eq!(map().translate("Open").unwrap(), "Unpaid");
    }

    #[test]
    fn unmapped_status_is_an_error() {
        let err = map().translate("Zebra").unwrap_err();
        assert_eq!(err.code, "Zebra");
        assert!(err.to_string().contains("Zebra"));
    }
}
