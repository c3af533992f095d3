use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use devteam_core::config::LlmConfig;

use super::{execute, require_api_key, with_retries, HttpSettings};
use crate::llm::{LlmClient, LlmError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    settings: HttpSettings,
    api_key: SecretString,
}

impl AnthropicClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let settings = HttpSettings::from_config(config, DEFAULT_BASE_URL);
        let api_key = require_api_key(config, "anthropic")?;
        Ok(Self { http: settings.http_client()?, settings, api_key })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self
            .http
            .post(format!("{}/v1/messages", self.settings.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt));
        let body = execute(request, self.settings.timeout).await?;
        extract_text(&body)
    }
}

fn extract_text(body: &Value) -> Result<String, LlmError> {
    body.get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks.iter().find_map(|block| {
                (block.get("type").and_then(Value::as_str) == Some("text"))
                    .then(|| block.get("text").and_then(Value::as_str))
                    .flatten()
            })
        })
        .map(str::to_string)
        .ok_or_else(|| LlmError::Decode("response carried no text content block".to_string()))
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        with_retries(self.provider_name(), self.settings.max_retries, || self.send_once(prompt))
            .await
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
