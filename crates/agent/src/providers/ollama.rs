use async_trait::async_trait;
use serde_json::{json, Value};

use devteam_core::config::{LlmConfig, DEFAULT_OLLAMA_BASE_URL};

use super::{execute, with_retries, HttpSettings};
use crate::llm::{LlmClient, LlmError};

/// Non-streaming `/api/generate` client for a local Ollama daemon.
pub struct OllamaClient {
    http: reqwest::Client,
    settings: HttpSettings,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let settings = HttpSettings::from_config(config, DEFAULT_OLLAMA_BASE_URL);
        Ok(Self { http: settings.http_client()?, settings })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": self.settings.max_tokens },
        })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self
            .http
            .post(format!("{}/api/generate", self.settings.base_url))
            .json(&self.request_body(prompt));
        let body = execute(request, self.settings.timeout).await?;
        body.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing `response` field".to_string()))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        with_retries(self.provider_name(), self.settings.max_retries, || self.send_once(prompt))
            .await
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use devteam_core::config::AppConfig;

    use super::OllamaClient;

    #[test]
    fn request_disables_streaming() {
        let mut llm = AppConfig::default().llm;
        llm.base_url = Some("http://127.0.0.1:11434/".to_string());

        let client = OllamaClient::from_config(&llm).expect("client");
        let body = client.request_body("hello");

        assert_eq!(body["stream"], false);
        assert_eq!(body["prompt"], "hello");
        assert_eq!(client.settings.base_url, "http://127.0.0.1:11434");
    }

    #[tokio::test]
    async fn unreachable_daemon_is_a_transport_error() {
        let mut llm = AppConfig::default().llm;
        llm.base_url = Some("http://127.0.0.1:9".to_string());
        llm.max_retries = 0;
        llm.timeout_secs = 2;

        let client = OllamaClient::from_config(&llm).expect("client");
        let error = client.send_once("hello").await.expect_err("nothing listens on port 9");

        assert!(error.is_retryable());
    }
}
