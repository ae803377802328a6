//! Order status sync.
//!
//! Remote sales orders are matched by `OrderNumber` against the local order
//! reference and only the status column is carried across, translated through
//! a fixed status map. An order with a status code outside the map is skipped
//! and surfaced; the rest of the batch proceeds.

use crate::job::JobSpec;
use slk_core::{EntityKind, KeySpec, StatusMap, TransformError, TransformSet};

pub const JOB_NAME: &str = "OrderUpdate";

/// Remote order status -> local order status.
const STATUS_PAIRS: &[(&str, &str)] = &[
    ("Open", "Unpaid"),
    ("Parked", "Paid"),
    ("Backordered", "Processing"),
    ("Placed", "Processing"),
    ("Picking", "Processing"),
    ("Picked", "Processing"),
    ("Packed", "Processing"),
    ("Dispatched", "Sent"),
    ("Complete", "Complete"),
    ("Deleted", "MemberCancelled"),
];

pub fn job_spec(source_id: Option<String>) -> JobSpec {
    let statuses = StatusMap::from_pairs(STATUS_PAIRS);
    let transforms = TransformSet::new().with("Status", move |raw, _| {
        let code = raw.as_str().ok_or_else(|| TransformError::Invalid {
            message: "order status is not a string".to_string(),
        })?;
        let local = statuses
            .translate(code)
            .map_err(|e| TransformError::UnknownStatus { code: e.code })?;
        Ok(local.into())
    });

    JobSpec {
        name: JOB_NAME,
        entity: EntityKind::Order,
        collection: "SalesOrders",
        external_key: "LastModifiedOn",
        key: KeySpec::new("OrderNumber", "Reference"),
        columns: vec![("OrderStatus".to_string(), "Status".to_string())],
        transforms,
        allow_create: false,
        clear_absent: None,
        local_unique: vec!["Reference".to_string()],
        remote_unique: vec!["OrderNumber".to_string()],
        filter_timezone: None,
        source_id,
        subject: "Inventory sync: order results",
    }
}
