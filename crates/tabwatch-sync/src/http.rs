//! HTTP push client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tabwatch_protocols::{CapturePayload, DeliveryKind, PeerSink, SyncError, SyncRequest, TabEvent};
use tracing::{debug, trace};

/// [`PeerSink`] that POSTs JSON to the companion app.
///
/// Every request carries the configured timeout. A non-2xx status is an
/// error; nothing is retried.
pub struct HttpPeer {
    client: Client,
    base_url: String,
}

impl HttpPeer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + Sync>(&self, kind: DeliveryKind, body: &T) -> Result<(), SyncError> {
        let url = format!("{}{}", self.base_url, kind.path());
        let json = serde_json::to_string(body)?;

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(json)
            .send()
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }

        trace!("Delivered {}", url);
        Ok(())
    }
}

#[async_trait]
impl PeerSink for HttpPeer {
    async fn post_event(&self, event: &TabEvent) -> Result<(), SyncError> {
        self.post(DeliveryKind::Event, event).await
    }

    async fn post_capture(&self, payload: &CapturePayload) -> Result<(), SyncError> {
        self.post(DeliveryKind::Capture, payload).await
    }

    async fn post_sync(&self, request: &SyncRequest) -> Result<(), SyncError> {
        self.post(DeliveryKind::Sync, request).await
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
