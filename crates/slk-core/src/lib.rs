//! slk-core
//!
//! Pure synchronization logic for stocklink:
//! - record types shared by the fetcher, store and jobs
//! - duplicate validation (pre-flight, before any write)
//! - field-transform pipeline
//! - reconciliation planner (update pass + clear-absent pass)
//! - status translation for the order job
//! - watermark arithmetic (external timestamp parsing, max selection,
//!   `modifiedSince` formatting)
//!
//! Deterministic logic only. No network calls, no database access; the
//! `store` module defines the async contracts that `slk-db` and the test
//! doubles implement.

pub mod engine;
pub mod notify;
pub mod status;
pub mod store;
pub mod transform;
pub mod types;
pub mod validate;
pub mod watermark;

pub use engine::{plan_clear_absent, plan_update, UpdatePolicy};
pub use notify::Notifier;
pub use status::{StatusMap, UnknownStatusCode};
pub use store::{EntityKind, LocalStore, WatermarkStore};
pub use transform::{slugify, TransformError, TransformSet};
pub use types::*;
pub use validate::{find_duplicates, DuplicateKeyError};
pub use watermark::{
    advances, format_modified_since, max_last_edited, parse_external_timestamp, Watermark,
};
