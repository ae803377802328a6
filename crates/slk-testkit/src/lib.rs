//! slk-testkit
//!
//! Deterministic in-process doubles for the store and notification
//! boundaries, plus small builders for remote records and pagination
//! envelopes. No network, no database, no randomness.

pub mod mem_store;

pub use mem_store::{MemNotifier, MemStore};

use serde_json::Value;
use slk_core::RemoteRecord;

/// Build a [`RemoteRecord`] from a `json!({...})` object literal.
pub fn remote_record(v: Value) -> RemoteRecord {
    match v {
        Value::Object(m) => RemoteRecord(m),
        other => panic!("remote record literal must be a JSON object, got {other}"),
    }
}

/// A pagination envelope body as the remote API would return it.
pub fn page_body(items: Value, number_of_pages: u32) -> Value {
    serde_json::json!({
        "Items": items,
        "Pagination": { "NumberOfPages": number_of_pages, "PageSize": 200 }
    })
}
