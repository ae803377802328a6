//! Notifier implementations.
//!
//! `LogNotifier` writes the report into the structured log stream;
//! `WebhookNotifier` posts it to a configured endpoint. Both are fire-and-
//! forget from the pipeline's point of view: delivery failure never fails a
//! run.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use slk_core::Notifier;
use tracing::info;

/// Emits the report through `tracing`. The default sink when no webhook is
/// configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, subject: &str, body: &str) -> Result<()> {
        info!(subject, %body, "sync report");
        Ok(())
    }
}

/// Posts `{"subject": .., "body": ..}` as JSON to a webhook URL.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, subject: &str, body: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "subject": subject, "body": body }))
            .send()
            .await
            .context("posting sync report webhook")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("webhook responded {status}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn webhook_posts_subject_and_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/hook")
                .json_body(serde_json::json!({
                    "subject": "sync results",
                    "body": "updated: 2",
                }));
            then.status(200);
        });

        let notifier = WebhookNotifier::new(server.url("/hook"));
        notifier.deliver("sync results", "updated: 2").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn webhook_failure_surfaces_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hook");
            then.status(500);
        });

        let notifier = WebhookNotifier::new(server.url("/hook"));
        let err = notifier.deliver("s", "b").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
