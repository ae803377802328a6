//! Store contracts.
//!
//! The local object store and the watermark persistence are external
//! collaborators; these traits are their whole surface as far as the sync
//! pipeline is concerned. `slk-db` provides the Postgres implementation,
//! `slk-testkit` the deterministic in-memory one.

use crate::types::{LocalRecord, ReconcilePlan, RemoteRecord};
use crate::watermark::Watermark;
use anyhow::Result;
use async_trait::async_trait;

/// The entity collections a sync job can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Product,
    ProductCategory,
    Order,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "Product",
            EntityKind::ProductCategory => "ProductCategory",
            EntityKind::Order => "Order",
        }
    }
}

/// Natural-key lookup, column projection and staged-write application over a
/// named entity collection. Each staged write is applied atomically by the
/// store; the pipeline takes no locks of its own.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// All values of one field across the collection, for duplicate checks.
    /// Null/absent values come back as empty strings.
    async fn column(&self, entity: EntityKind, field: &str) -> Result<Vec<String>>;

    /// Every record of the collection as a field projection.
    async fn load_all(&self, entity: EntityKind) -> Result<Vec<LocalRecord>>;

    /// Persist a plan's staged writes. Never called on a preview run.
    async fn apply(&self, entity: EntityKind, plan: &ReconcilePlan) -> Result<()>;
}

/// Per-job watermark persistence.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get(&self, job_name: &str) -> Result<Option<Watermark>>;

    /// Advance the job's watermark to the maximum `external_key` value across
    /// `records`. An empty batch (or one with no parseable timestamp) must
    /// leave the watermark untouched. Only called after the run's
    /// reconciliation has fully succeeded, and never on a preview run.
    async fn advance(
        &self,
        job_name: &str,
        external_key: &str,
        records: &[RemoteRecord],
    ) -> Result<()>;
}
