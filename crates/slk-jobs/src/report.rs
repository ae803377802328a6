//! Plain-text run report rendering.

use crate::job::RunReport;
use serde_json::Value;
use std::fmt::Write as _;

fn show(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "<null>".to_string(),
        other => other.to_string(),
    }
}

/// Render a run's outcome as the notification / CLI body. Diffs and errors
/// are already key-ordered by the planner, so the output is deterministic.
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    let mode = if report.preview { "preview" } else { "live" };
    let _ = writeln!(out, "{} ({mode})", report.job);
    let _ = writeln!(out, "fetched: {}", report.fetched);
    let _ = writeln!(
        out,
        "created: {}  updated: {}  cleared: {}",
        report.plan.created, report.plan.updated, report.plan.cleared
    );

    if !report.plan.diffs.is_empty() {
        let _ = writeln!(out, "\nchanges:");
        for diff in &report.plan.diffs {
            for (field, change) in &diff.changed {
                let from = change
                    .from
                    .as_ref()
                    .map(show)
                    .unwrap_or_else(|| "<unset>".to_string());
                let _ = writeln!(out, "  {}: {field} {from} -> {}", diff.key, show(&change.to));
            }
        }
    }

    if !report.plan.errors.is_empty() {
        let _ = writeln!(out, "\nerrors:");
        for err in &report.plan.errors {
            let _ = writeln!(out, "  {} [{}]: {}", err.key, err.field, err.message);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use slk_core::{FieldChange, ReconcilePlan, RecordDiff, RecordError};
    use std::collections::BTreeMap;

    #[test]
    fn report_lists_counts_diffs_and_errors() {
        let mut changed = BTreeMap::new();
        changed.insert(
            "Status".to_string(),
            FieldChange {
                from: Some("Unpaid".into()),
                to: "Sent".into(),
            },
        );
        let plan = ReconcilePlan {
            writes: Vec::new(),
            created: 0,
            updated: 1,
            cleared: 0,
            diffs: vec![RecordDiff {
                key: "SO-001".to_string(),
                changed,
            }],
            errors: vec![RecordError {
                key: "SO-002".to_string(),
                field: "OrderStatus".to_string(),
                message: "unknown status code: Zebra".to_string(),
            }],
        };
        let report = RunReport {
            job: "OrderUpdate".to_string(),
            fetched: 2,
            preview: false,
            plan,
        };

        let body = render_report(&report);
        assert!(body.contains("OrderUpdate (live)"));
        assert!(body.contains("created: 0  updated: 1  cleared: 0"));
        assert!(body.contains("SO-001: Status Unpaid -> Sent"));
        assert!(body.contains("SO-002 [OrderStatus]: unknown status code: Zebra"));
    }

    #[test]
    fn preview_report_is_labelled() {
        let report = RunReport {
            job: "ProductUpdate".to_string(),
            fetched: 0,
            preview: true,
            plan: ReconcilePlan::empty(),
        };
        assert!(render_report(&report).contains("ProductUpdate (preview)"));
    }
}
