use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub content: String,
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// One POST attempt. Any non-2xx response is an error.
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<(), WebhookError>;
}

pub struct HttpWebhook {
    http: Client,
}

impl HttpWebhook {
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhook {
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<(), WebhookError> {
        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), %body, "webhook rejected message");
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), "webhook accepted message");
        Ok(())
    }
}
