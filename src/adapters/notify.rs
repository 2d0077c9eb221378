use crate::domain::ports::{LedgerEvent, Notifier};
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Writes events to the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: LedgerEvent) -> Result<()> {
        tracing::info!("Ledger event: {:?}", event);
        Ok(())
    }
}

/// Posts each event as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: LedgerEvent) -> Result<()> {
        let response = self.client.post(&self.url).json(&event).send().await?;
        if !response.status().is_success() {
            return Err(LedgerError::BackendError {
                status: response.status().as_u16(),
                message: format!("webhook {} rejected the event", self.url),
            });
        }
        Ok(())
    }
}

/// Keeps every event in memory. It can fail every call, or take `delay` to
/// deliver each one.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<LedgerEvent>>>,
    failing: bool,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: LedgerEvent) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(LedgerError::transport("notification service unavailable"));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}
