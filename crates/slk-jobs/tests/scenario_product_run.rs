//! End-to-end product run: price and parent link carried across, with the
//! parent resolved against the local category set.

use httpmock::prelude::*;
use serde_json::json;
use slk_api::InventoryClient;
use slk_core::EntityKind;
use slk_jobs::{products, SyncJob};
use slk_testkit::{page_body, MemNotifier, MemStore};

#[tokio::test]
async fn carries_price_and_parent_link() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/Products");
        then.status(200).json_body(page_body(
            json!([{
                "ProductCode": "SKU-1",
                "ProductDescription": "Blue Widget",
                "DefaultSellPrice": "12.50",
                "ProductGroup": {"Guid": "g-widgets", "GroupName": "Widgets"},
                "LastModifiedOn": "2026-05-01T12:00:00",
            }]),
            1,
        ));
    });

    let store = MemStore::new();
    let cat_id = store.seed(
        EntityKind::ProductCategory,
        &[("Title", json!("Widgets")), ("Guid", json!("g-widgets"))],
    );
    store.seed(
        EntityKind::Product,
        &[
            ("InternalItemID", json!("SKU-1")),
            ("Title", json!("Widget")),
            ("URLSegment", json!("widget")),
            ("BasePrice", json!(10.0)),
        ],
    );

    let api = InventoryClient::new(server.base_url());
    let notifier = MemNotifier::new();
    let spec = products::job_spec(&store, None).await.unwrap();
    let job = SyncJob {
        spec,
        api: &api,
        local: &store,
        watermarks: &store,
        notifier: &notifier,
        preview: false,
    };

    let report = job.run().await.unwrap();
    assert_eq!(report.plan.updated, 1);

    let prods = store.snapshot(EntityKind::Product);
    let p = &prods[0];
    assert_eq!(p.get_str("Title").unwrap(), "Blue Widget");
    assert_eq!(p.get_str("URLSegment").unwrap(), "blue-widget");
    assert_eq!(p.get("BasePrice").unwrap(), &json!(12.5));
    assert_eq!(p.get("ParentID").unwrap().as_i64().unwrap(), cat_id);

    let wm = store.watermark(products::JOB_NAME).unwrap();
    assert_eq!(wm.external_last_edited, "2026-05-01T12:00:00");
}
