//! Watermark arithmetic.
//!
//! A watermark is the latest external "last edited" timestamp a job has
//! successfully incorporated; the next run filters its fetch with it.
//! Timestamps are stored as the raw remote string and parsed to instants only
//! for comparison and formatting, so the store stays faithful to what the
//! remote actually said.
//!
//! The remote system emits `LastModifiedOn` either as ISO-8601 (with or
//! without offset, fractional seconds up to 7 digits) or as the legacy
//! `/Date(<millis>)/` JSON form; both are accepted here.

use crate::types::RemoteRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Per sync-job progress marker. One row per job name; `external_last_edited`
/// is monotonically non-decreasing across successful runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub job_name: String,
    /// Remote field the watermark tracks, e.g. `LastModifiedOn`.
    pub external_key: String,
    /// Raw remote timestamp string of the newest incorporated record.
    pub external_last_edited: String,
}

/// Parse an external timestamp into a UTC instant. Naive timestamps (no
/// offset) are read as UTC. Returns `None` for shapes we do not recognize.
pub fn parse_external_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    // Legacy JSON date: /Date(1411892400000)/
    if let Some(inner) = raw.strip_prefix("/Date(").and_then(|s| s.strip_suffix(")/")) {
        // An offset suffix like +1300 may follow the millis; the millis are
        // already an absolute instant, so the suffix is display-only.
        let digits: String = inner
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        let millis: i64 = digits.parse().ok()?;
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    None
}

/// The raw timestamp string of the newest record in `records`, by the field
/// named `external_key`. Records without a parseable value are ignored; an
/// empty or unparseable batch yields `None` (the watermark must not move).
pub fn max_last_edited(records: &[RemoteRecord], external_key: &str) -> Option<String> {
    let mut best: Option<(DateTime<Utc>, String)> = None;
    for record in records {
        let Some(raw) = record.get_str(external_key) else {
            continue;
        };
        let Some(instant) = parse_external_timestamp(&raw) else {
            continue;
        };
        match &best {
            Some((current, _)) if instant <= *current => {}
            _ => best = Some((instant, raw)),
        }
    }
    best.map(|(_, raw)| raw)
}

/// Whether moving the watermark from `current` to `candidate` keeps it
/// non-decreasing. With no current value (first successful run) any parseable
/// candidate advances; an unparseable candidate never does.
pub fn advances(current: Option<&str>, candidate: &str) -> bool {
    let Some(candidate_instant) = parse_external_timestamp(candidate) else {
        return false;
    };
    match current.and_then(parse_external_timestamp) {
        Some(current_instant) => candidate_instant >= current_instant,
        None => true,
    }
}

/// Format a stored watermark timestamp as the `modifiedSince` filter value:
/// millisecond precision, 23 characters, no offset suffix.
///
/// When `zone` is set the instant is converted to that zone first (the remote
/// Products endpoint interprets `modifiedSince` in UTC while other endpoints
/// do not; the quirk is a per-job configuration flag, never inferred).
/// Without a zone the timestamp's own wall-clock reading is preserved.
pub fn format_modified_since(raw: &str, zone: Option<Tz>) -> Option<String> {
    const FMT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
    if let Some(tz) = zone {
        let instant = parse_external_timestamp(raw)?;
        return Some(instant.with_timezone(&tz).format(FMT).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(dt.format(FMT).to_string());
    }
    let instant = parse_external_timestamp(raw)?;
    Some(instant.naive_utc().format(FMT).to_string())
}
