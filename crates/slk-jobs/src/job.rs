//! The sync pipeline.
//!
//! One run is: resolve the incremental filter from the stored watermark,
//! fetch the full remote batch, validate key uniqueness on both sides, plan
//! the reconciliation against a local snapshot, then (outside preview) apply
//! the plan, advance the watermark and deliver the run report. The plan is
//! computed identically in preview mode; only the side effects are withheld.

use crate::report::render_report;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use slk_api::{Filter, InventoryClient};
use slk_core::{
    find_duplicates, format_modified_since, plan_clear_absent, plan_update, DuplicateKeyError,
    EntityKind, KeySpec, LocalStore, Notifier, ReconcilePlan, TransformSet, UpdatePolicy,
    WatermarkStore,
};
use tracing::{info, warn};

/// Absent-record clearing: any local record whose `clear_field` is non-empty
/// but missing from the remote batch gets that field blanked.
#[derive(Debug, Clone)]
pub struct ClearSpec {
    pub remote_key_field: String,
    pub clear_field: String,
}

/// Everything that distinguishes one sync job from another. Built by the
/// per-job constructors in `categories`, `products` and `orders`.
pub struct JobSpec {
    pub name: &'static str,
    pub entity: EntityKind,
    /// Remote collection path segment.
    pub collection: &'static str,
    /// Remote timestamp field the watermark tracks.
    pub external_key: &'static str,
    pub key: KeySpec,
    /// `(remote_field, local_field)` column carry-overs.
    pub columns: Vec<(String, String)>,
    pub transforms: TransformSet,
    pub allow_create: bool,
    pub clear_absent: Option<ClearSpec>,
    /// Local fields that must be duplicate-free before any write is staged.
    pub local_unique: Vec<String>,
    /// Remote fields that must be duplicate-free across the fetched batch.
    pub remote_unique: Vec<String>,
    /// Zone the remote expects `modifiedSince` to be expressed in. `None`
    /// forwards the stored wall-clock time unchanged.
    pub filter_timezone: Option<Tz>,
    pub source_id: Option<String>,
    /// Subject line for the run notification.
    pub subject: &'static str,
}

/// Outcome of one run, preview or not.
#[derive(Debug)]
pub struct RunReport {
    pub job: String,
    pub fetched: usize,
    pub preview: bool,
    pub plan: ReconcilePlan,
}

/// One configured sync job bound to its collaborators.
pub struct SyncJob<'a> {
    pub spec: JobSpec,
    pub api: &'a InventoryClient,
    pub local: &'a dyn LocalStore,
    pub watermarks: &'a dyn WatermarkStore,
    pub notifier: &'a dyn Notifier,
    pub preview: bool,
}

impl SyncJob<'_> {
    pub async fn run(&self) -> Result<RunReport> {
        let spec = &self.spec;
        let filter = self.build_filter().await?;
        info!(
            job = spec.name,
            collection = spec.collection,
            modified_since = filter.modified_since.as_deref().unwrap_or("<full>"),
            preview = self.preview,
            "starting sync run"
        );

        let remote = self
            .api
            .fetch_all(spec.collection, &filter)
            .await
            .map_err(anyhow::Error::new)
            .with_context(|| format!("fetching {}", spec.collection))?;
        info!(job = spec.name, fetched = remote.len(), "remote fetch complete");

        // Pre-flight uniqueness checks. A duplicate on either side aborts the
        // run before a single write is staged.
        for field in &spec.local_unique {
            let values = self.local.column(spec.entity, field).await?;
            let dups = find_duplicates(&values);
            if !dups.is_empty() {
                return Err(anyhow::Error::new(DuplicateKeyError::new(
                    format!("local {}.{}", spec.entity.as_str(), field),
                    dups,
                )));
            }
        }
        for field in &spec.remote_unique {
            let values: Vec<String> = remote
                .iter()
                .map(|r| r.get_str(field).unwrap_or_default())
                .collect();
            let dups = find_duplicates(&values);
            if !dups.is_empty() {
                return Err(anyhow::Error::new(DuplicateKeyError::new(
                    format!("remote {}.{}", spec.collection, field),
                    dups,
                )));
            }
        }

        let local = self.local.load_all(spec.entity).await?;

        let mut plan = ReconcilePlan::empty();
        if let Some(clear) = &spec.clear_absent {
            plan = plan.merged(plan_clear_absent(
                &local,
                &remote,
                &clear.remote_key_field,
                &clear.clear_field,
            ));
        }
        let policy = UpdatePolicy {
            key: &spec.key,
            columns: &spec.columns,
            transforms: &spec.transforms,
            allow_create: spec.allow_create,
        };
        plan = plan.merged(plan_update(&local, &remote, &policy));

        if !self.preview {
            self.local
                .apply(spec.entity, &plan)
                .await
                .with_context(|| format!("applying {} plan", spec.name))?;
            self.watermarks
                .advance(spec.name, spec.external_key, &remote)
                .await
                .with_context(|| format!("advancing {} watermark", spec.name))?;
        }

        let report = RunReport {
            job: spec.name.to_string(),
            fetched: remote.len(),
            preview: self.preview,
            plan,
        };
        info!(
            job = spec.name,
            created = report.plan.created,
            updated = report.plan.updated,
            cleared = report.plan.cleared,
            errors = report.plan.errors.len(),
            preview = report.preview,
            "sync run finished"
        );

        if !self.preview && !report.plan.is_empty() {
            let body = render_report(&report);
            if let Err(err) = self.notifier.deliver(spec.subject, &body).await {
                // Delivery is best-effort; the reconciliation already stuck.
                warn!(job = spec.name, error = %err, "notification delivery failed");
            }
        }

        Ok(report)
    }

    async fn build_filter(&self) -> Result<Filter> {
        let spec = &self.spec;
        let mut filter = Filter {
            modified_since: None,
            source_id: spec.source_id.clone(),
        };
        if let Some(wm) = self.watermarks.get(spec.name).await? {
            filter.modified_since =
                format_modified_since(&wm.external_last_edited, spec.filter_timezone);
            if filter.modified_since.is_none() {
                warn!(
                    job = spec.name,
                    raw = %wm.external_last_edited,
                    "stored watermark is unparseable; falling back to a full fetch"
                );
            }
        }
        Ok(filter)
    }
}
