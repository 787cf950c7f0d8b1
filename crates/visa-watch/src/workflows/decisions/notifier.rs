//! Outbound text notification.
//!
//! The messaging API is a plain HTTP GET carrying the key, recipient and
//! message text as query parameters. Responses are logged but never
//! validated beyond the HTTP status, and nothing is retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NotifierConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("messaging request failed: {0}")]
    Transport(String),
    #[error("messaging API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Delivers the single message produced by a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendMessageQuery<'a> {
    apikey: &'a str,
    number: &'a str,
    text: &'a str,
}

/// Reply body returned by the messaging API, when it is JSON.
#[derive(Debug, Deserialize)]
struct ApiReply {
    success: Option<bool>,
    description: Option<String>,
}

pub struct MessagingApiNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    recipient: String,
}

impl MessagingApiNotifier {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        recipient: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            recipient,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &NotifierConfig) -> Self {
        Self::new(
            client,
            config.endpoint.clone(),
            config.api_key.clone(),
            config.recipient.clone(),
        )
    }

    fn request(&self, message: &str) -> Result<reqwest::Request, reqwest::Error> {
        self.client
            .get(&self.endpoint)
            .query(&SendMessageQuery {
                apikey: &self.api_key,
                number: &self.recipient,
                text: message,
            })
            .build()
    }
}

#[async_trait]
impl Notifier for MessagingApiNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let request = self
            .request(message)
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        info!(status = status.as_u16(), %body, "response from messaging API");

        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if let Ok(ApiReply {
            success: Some(false),
            description,
        }) = serde_json::from_str::<ApiReply>(&body)
        {
            warn!(description = ?description, "messaging API reported a failed delivery");
        }

        info!(recipient = %self.recipient, message, "notification sent");
        Ok(())
    }
}
