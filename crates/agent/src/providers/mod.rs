use std::future::Future;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use devteam_core::config::LlmConfig;

use crate::llm::LlmError;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Settings shared by every HTTP-backed provider.
#[derive(Clone, Debug)]
pub(crate) struct HttpSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub max_tokens: u32,
}

impl HttpSettings {
    pub(crate) fn from_config(config: &LlmConfig, default_base_url: &str) -> Self {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(default_base_url)
            .trim_end_matches('/')
            .to_string();
        Self {
            base_url,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            max_tokens: config.max_tokens,
        }
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, LlmError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))
    }
}

pub(crate) fn require_api_key(
    config: &LlmConfig,
    provider: &str,
) -> Result<SecretString, LlmError> {
    match &config.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => Ok(key.clone()),
        _ => Err(LlmError::Configuration(format!("{provider} requires llm.api_key"))),
    }
}

/// Sends `request`, turning non-success statuses into `LlmError::Status`.
pub(crate) async fn execute(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value, LlmError> {
    let response = request.send().await.map_err(|error| LlmError::from_reqwest(error, timeout))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { status: status.as_u16(), body });
    }
    response.json::<serde_json::Value>().await.map_err(|error| LlmError::from_reqwest(error, timeout))
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_retries` extra attempts were spent.
pub(crate) async fn with_retries<F, Fut>(
    provider: &'static str,
    max_retries: u32,
    mut attempt: F,
) -> Result<String, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, LlmError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(text) => return Ok(text),
            Err(error) if error.is_retryable() && retries < max_retries => {
                retries += 1;
                let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(retries - 1);
                warn!(
                    event_name = "llm.request.retry",
                    provider,
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying language model request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::with_retries;
    use crate::llm::LlmError;

    #[tokio::test]
    async fn retryable_failures_are_retried_up_to_limit() {
        let calls = AtomicU32::new(0);
        let result = with_retries("test", 2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(LlmError::Transport("reset".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn success_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retries("test", 2, || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err(LlmError::Status { status: 503, body: String::new() })
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.expect("second attempt succeeds"), "done");
    }

    #[tokio::test]
    async fn non_retryable_failure_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = with_retries("test", 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(LlmError::Status { status: 401, body: "denied".to_string() }) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Status { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
