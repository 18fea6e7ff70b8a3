//! Push-delivery transport.
//!
//! `PushTransport` is the seam the dispatcher sends through. A call either
//! returns a per-address report or a transport-level error; only the latter is
//! retried. `HttpPushTransport` talks JSON to a push gateway over reqwest.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{AlertPayload, RecipientAddress};

/// Per-address counts from a call that went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendReport {
    // ---
    pub success_count: usize,
    pub failure_count: usize,
}

impl SendReport {
    /// Every address in a batch of `size` accepted.
    pub fn all_accepted(size: usize) -> Self {
        Self {
            success_count: size,
            failure_count: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Push gateway returned status {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        addresses: &[RecipientAddress],
        payload: &AlertPayload,
    ) -> Result<SendReport, TransportError>;
}

// ---

/// Gateway reply body. Counts are optional on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MulticastReply {
    success_count: Option<usize>,
    failure_count: Option<usize>,
}

#[derive(Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct MulticastRequest<'a> {
    tokens: &'a [RecipientAddress],
    notification: Notification<'a>,
    data: &'a BTreeMap<String, String>,
}

/// Sends multicast requests to an HTTP push gateway.
pub struct HttpPushTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPushTransport {
    // ---
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(
        &self,
        addresses: &[RecipientAddress],
        payload: &AlertPayload,
    ) -> Result<SendReport, TransportError> {
        // ---
        let body = MulticastRequest {
            tokens: addresses,
            notification: Notification {
                title: &payload.title,
                body: &payload.body,
            },
            data: &payload.data,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        // 2xx: the gateway took the batch. Never fail past this point.
        let reply = match response.bytes().await {
            Ok(bytes) => {
                serde_json::from_slice::<MulticastReply>(&bytes).map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        let report = match reply {
            Ok(MulticastReply {
                success_count: Some(success_count),
                failure_count,
            }) => SendReport {
                success_count,
                failure_count: failure_count
                    .unwrap_or_else(|| addresses.len().saturating_sub(success_count)),
            },
            Ok(_) => {
                warn!(
                    endpoint = %self.endpoint,
                    tokens = addresses.len(),
                    "Push gateway reply has no successCount; counting batch as delivered"
                );
                SendReport::all_accepted(addresses.len())
            }
            Err(error) => {
                warn!(
                    endpoint = %self.endpoint,
                    tokens = addresses.len(),
                    %error,
                    "Unreadable push gateway reply; counting batch as delivered"
                );
                SendReport::all_accepted(addresses.len())
            }
        };

        debug!(
            endpoint = %self.endpoint,
            tokens = addresses.len(),
            success = report.success_count,
            "Push gateway responded"
        );
        Ok(report)
    }
}
