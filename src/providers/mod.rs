//! Remote collaborators: the assistant endpoint and the language model

mod assistant;
mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub use assistant::HttpAssistant;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Body posted to the assistant endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub text: String,
}

/// Successful assistant payload. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssistantReply {
    pub fn response(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(text.into()),
        }
    }
}

/// The service that turns user text into an assistant reply
#[async_trait]
pub trait RemoteAssistant: Send + Sync {
    async fn ask(&self, text: &str) -> Result<AssistantReply, ProviderError>;
}

/// Language model backends used for free-form prompts
pub enum Provider {
    Ollama(ollama::OllamaProvider),
}

impl Provider {
    pub fn from_name(name: &str, config: &Config) -> Result<Self, ProviderError> {
        match name.to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama(ollama::OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            ))),
            _ => Err(ProviderError::UnknownProvider(name.to_string())),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            Provider::Ollama(p) => p.generate(prompt).await,
        }
    }
}
