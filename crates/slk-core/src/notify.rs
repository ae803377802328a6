//! Notification contract.
//!
//! The delivery mechanism is an external collaborator; the pipeline only
//! hands over a rendered report. Delivery failure is non-fatal to a sync run.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, subject: &str, body: &str) -> Result<()>;
}
