//! Event bus seam and implementations.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;

use docvault_core::models::LifecycleEvent;

type HmacSha256 = Hmac<Sha256>;

/// Durable publish-subscribe transport for lifecycle events.
///
/// Implementations must be safe to call repeatedly with the same event:
/// delivery is at-least-once and consumers de-duplicate on `event_id`.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: &LifecycleEvent) -> Result<()>;
}

/// In-process bus collecting events; used in tests and embedded setups.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<LifecycleEvent> {
        self.events.lock().expect("event list poisoned").clone()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: &LifecycleEvent) -> Result<()> {
        self.events
            .lock()
            .expect("event list poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// HTTP bus: JSON POST of the event envelope to a configured endpoint,
/// signed with HMAC-SHA256 when a secret is configured.
pub struct HttpEventBus {
    endpoint: String,
    signing_secret: Option<String>,
    http_client: Client,
}

impl HttpEventBus {
    pub fn new(endpoint: String, signing_secret: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client for event delivery")?;

        Ok(Self {
            endpoint,
            signing_secret,
            http_client,
        })
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl EventBus for HttpEventBus {
    async fn publish(&self, event: &LifecycleEvent) -> Result<()> {
        let envelope = json!({
            "event_type": event.kind.routing_key(),
            "event_id": event.event_id,
            "timestamp": event.occurred_at,
            "service": "docvault",
            "data": event,
        });
        let body = serde_json::to_vec(&envelope).context("Failed to serialize event envelope")?;

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(body.clone());

        if let Some(ref secret) = self.signing_secret {
            request = request.header("X-Docvault-Signature", Self::sign(secret, &body));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to deliver event to {}", self.endpoint))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Event delivery to {} returned status {}",
                self.endpoint,
                response.status()
            );
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.kind,
            "Event delivered"
        );
        Ok(())
    }
}
