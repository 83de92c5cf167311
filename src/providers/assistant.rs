//! HTTP client for the assistant endpoint
//!
//! Posts `{"text": ...}` to `{base_url}/chat` and decodes the reply. Any
//! transport error, non-success status, timeout or undecodable body comes
//! back as a `ProviderError`; callers do not need to tell them apart.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{AssistantReply, AssistantRequest, ProviderError, RemoteAssistant};

pub struct HttpAssistant {
    client: Client,
    endpoint: String,
}

impl HttpAssistant {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteAssistant for HttpAssistant {
    async fn ask(&self, text: &str) -> Result<AssistantReply, ProviderError> {
        let request = AssistantRequest {
            text: text.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::InvalidResponse(format!(
                "{}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
