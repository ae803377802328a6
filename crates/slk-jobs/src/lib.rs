//! slk-jobs
//!
//! The three sync jobs (product categories, products, orders) and the
//! pipeline that runs them: watermark-derived incremental fetch, pre-flight
//! duplicate validation, reconciliation planning, apply, watermark advance
//! and notification. `slk-core` holds the pure planning machinery; this crate
//! binds it to the remote client and the stores.

pub mod categories;
pub mod job;
pub mod notify;
pub mod orders;
pub mod products;
pub mod report;

pub use job::{ClearSpec, JobSpec, RunReport, SyncJob};
pub use notify::{LogNotifier, WebhookNotifier};
pub use report::render_report;
