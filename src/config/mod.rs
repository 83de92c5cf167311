//! Application configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL the chat client sends messages to
    pub assistant_url: String,
    pub request_timeout_secs: u64,
    /// Language model backend behind the `ask` command
    pub llm_provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    /// Directory exposed to the file commands
    pub workspace_dir: PathBuf,
    pub max_file_size: u64,
    /// Allowed browser origin; any origin when unset
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            assistant_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 30,
            llm_provider: "ollama".into(),
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "llama3.2".into(),
            workspace_dir: PathBuf::from("./data/files"),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), "PORT", defaults.port)?,
            assistant_url: lookup("ASSISTANT_URL").unwrap_or(defaults.assistant_url),
            request_timeout_secs: parse_or(
                lookup("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            llm_provider: lookup("LLM_PROVIDER").unwrap_or(defaults.llm_provider),
            ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            workspace_dir: lookup("WORKSPACE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_dir),
            max_file_size: parse_or(
                lookup("MAX_FILE_SIZE"),
                "MAX_FILE_SIZE",
                defaults.max_file_size,
            )?,
            cors_origin: lookup("CORS_ORIGIN").filter(|origin| !origin.trim().is_empty()),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}
