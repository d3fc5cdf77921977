use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ferro_core::{FallbackClassifier, FallbackError, FALLBACK_INSTRUCTION};
use reqwest::Client;
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiFallbackConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for OpenAiFallbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiFallbackConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiFallbackConfig {
    /// `None` when `OPENAI_API_KEY` is unset or blank.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())?;
        let model = lookup("OPENAI_MODEL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = lookup("OPENAI_BASE_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Some(Self {
            api_key,
            model,
            base_url,
        })
    }
}

pub struct OpenAiFallbackClassifier {
    config: OpenAiFallbackConfig,
    http_client: Client,
}

impl OpenAiFallbackClassifier {
    pub fn new(config: OpenAiFallbackConfig) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request_payload(&self, query: &str) -> Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "user", "content": build_prompt(query) }
            ],
            "response_format": { "type": "json_object" }
        })
    }
}

#[async_trait]
impl FallbackClassifier for OpenAiFallbackClassifier {
    async fn classify(&self, query: &str) -> Result<Value, FallbackError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.as_str())
            .json(&self.request_payload(query))
            .send()
            .await
            .map_err(|err| FallbackError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FallbackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| FallbackError::Malformed(format!("completion body: {err}")))?;
        let content = extract_chat_content(&body)
            .ok_or_else(|| FallbackError::Malformed("completion content missing".to_string()))?;

        serde_json::from_str(content)
            .map_err(|err| FallbackError::Malformed(format!("completion content: {err}")))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn build_prompt(query: &str) -> String {
    format!("{FALLBACK_INSTRUCTION} Consulta del usuario: {query}")
}

fn extract_chat_content(payload: &Value) -> Option<&str> {
    payload
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
}
