//! The stored watermark drives the `modifiedSince` parameter; `sourceId`
//! scoping is forwarded; a first run carries no incremental filter at all.

use httpmock::prelude::*;
use serde_json::json;
use slk_api::InventoryClient;
use slk_jobs::{orders, products, SyncJob};
use slk_testkit::{page_body, MemNotifier, MemStore};

#[tokio::test]
async fn stored_watermark_becomes_modified_since() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/SalesOrders")
            .query_param("modifiedSince", "2026-03-01T10:00:00.000")
            .query_param("sourceId", "webstore");
        then.status(200).json_body(page_body(json!([]), 1));
    });

    let store = MemStore::new();
    store.seed_watermark(orders::JOB_NAME, "LastModifiedOn", "2026-03-01T10:00:00");

    let api = InventoryClient::new(server.base_url());
    let notifier = MemNotifier::new();
    let job = SyncJob {
        spec: orders::job_spec(Some("webstore".to_string())),
        api: &api,
        local: &store,
        watermarks: &store,
        notifier: &notifier,
        preview: false,
    };

    let report = job.run().await.unwrap();
    assert_eq!(report.fetched, 0);
    mock.assert();
    // An empty batch leaves the watermark where it was.
    let wm = store.watermark(orders::JOB_NAME).unwrap();
    assert_eq!(wm.external_last_edited, "2026-03-01T10:00:00");
}

#[tokio::test]
async fn legacy_date_watermark_is_reformatted() {
    let server = MockServer::start();
    // 1787479200000 ms is 2026-08-23T10:00:00Z.
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/Products")
            .query_param("modifiedSince", "2026-08-23T10:00:00.000");
        then.status(200).json_body(page_body(json!([]), 1));
    });

    let store = MemStore::new();
    store.seed_watermark(
        products::JOB_NAME,
        "LastModifiedOn",
        "/Date(1787479200000)/",
    );

    let api = InventoryClient::new(server.base_url());
    let notifier = MemNotifier::new();
    let spec = products::job_spec(&store, Some(chrono_tz::UTC)).await.unwrap();
    let job = SyncJob {
        spec,
        api: &api,
        local: &store,
        watermarks: &store,
        notifier: &notifier,
        preview: false,
    };

    job.run().await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn first_run_has_no_incremental_filter() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/SalesOrders")
            .matches(|req| {
                let query = req.query_params.clone().unwrap_or_default();
                !query.iter().any(|(k, _)| k == "modifiedSince")
            });
        then.status(200).json_body(page_body(json!([]), 1));
    });

    let store = MemStore::new();
    let api = InventoryClient::new(server.base_url());
    let notifier = MemNotifier::new();
    let job = SyncJob {
        spec: orders::job_spec(None),
        api: &api,
        local: &store,
        watermarks: &store,
        notifier: &notifier,
        preview: false,
    };

    job.run().await.unwrap();
    mock.assert();
}
