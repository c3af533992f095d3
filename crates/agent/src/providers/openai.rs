use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use devteam_core::config::LlmConfig;

use super::{execute, require_api_key, with_retries, HttpSettings};
use crate::llm::{LlmClient, LlmError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    settings: HttpSettings,
    api_key: SecretString,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let settings = HttpSettings::from_config(config, DEFAULT_BASE_URL);
        let api_key = require_api_key(config, "openai")?;
        Ok(Self { http: settings.http_client()?, settings, api_key })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.settings.max_tokens,
            "temperature": 0.7,
        })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self
            .http
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(prompt));
        let body = execute(request, self.settings.timeout).await?;
        extract_text(&body)
    }
}

fn extract_text(body: &Value) -> Result<String, LlmError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::Decode("missing choices[0].message.content".to_string()))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        with_retries(self.provider_name(), self.settings.max_retries, || self.send_once(prompt))
            .await
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use devteam_core::config::{AppConfig, LlmProvider};

    use super::{extract_text, OpenAiClient};
    use crate::llm::LlmError;

    fn config() -> devteam_core::config::LlmConfig {
        let mut llm = AppConfig::default().llm;
        llm.provider = LlmProvider::OpenAi;
        llm.base_url = None;
        llm.api_key = Some("sk-test".to_string().into());
        llm.model = "gpt-4o-mini".to_string();
        llm
    }

    #[test]
    fn request_body_carries_prompt_and_limits() {
        let client = OpenAiClient::from_config(&config()).expect("client");
        let body = client.request_body("hello");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(client.settings.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let mut llm = config();
        llm.api_key = None;
        assert!(matches!(OpenAiClient::from_config(&llm), Err(LlmError::Configuration(_))));
    }

    #[test]
    fn extracts_first_choice_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "{}"}}]});
        assert_eq!(extract_text(&body).expect("content"), "{}");
        assert!(matches!(extract_text(&json!({"choices": []})), Err(LlmError::Decode(_))));
    }
}
