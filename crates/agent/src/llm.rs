use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use devteam_core::config::{LlmConfig, LlmProvider};

use crate::providers::{AnthropicClient, OllamaClient, OpenAiClient};

pub const JSON_SCHEMA_INSTRUCTION: &str = "Return your response as valid JSON matching this schema:";
pub const JSON_ONLY_INSTRUCTION: &str =
    "IMPORTANT: Return ONLY valid JSON, no other text or formatting.";
pub const JSON_FALLBACK_ERROR: &str = "Failed to generate valid JSON response";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("llm configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Timeouts, transport failures, rate limits and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Decode(_) | Self::Configuration(_) => false,
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Outcome of a structured generation. `degraded` marks the schema fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonGeneration {
    pub value: Value,
    pub degraded: bool,
    pub attempts: u32,
}

/// Asks the model for JSON, retrying once with a stricter instruction and then
/// salvaging the first parseable line. Never fails: unusable output degrades to
/// a value shaped by `schema`.
pub async fn generate_json(client: &dyn LlmClient, prompt: &str, schema: &Value) -> JsonGeneration {
    let json_prompt = format!("{prompt}\n\n{JSON_SCHEMA_INSTRUCTION} {schema}");

    let first = request(client, &json_prompt, 1).await;
    if let Some(value) = first.as_deref().and_then(parse_whole) {
        return JsonGeneration { value, degraded: false, attempts: 1 };
    }

    info!(
        event_name = "llm.json.retry",
        provider = client.provider_name(),
        "model output was not valid JSON; retrying with strict instruction"
    );

    let retry_prompt = format!("{json_prompt}\n\n{JSON_ONLY_INSTRUCTION}");
    let second = request(client, &retry_prompt, 2).await;
    if let Some(raw) = second.as_deref() {
        if let Some(value) = parse_whole(raw).or_else(|| parse_lines(raw)) {
            return JsonGeneration { value, degraded: false, attempts: 2 };
        }
    }

    warn!(
        event_name = "llm.json.fallback",
        provider = client.provider_name(),
        "model output unusable after retry; using schema fallback"
    );

    JsonGeneration { value: fallback_for(schema), degraded: true, attempts: 2 }
}

async fn request(client: &dyn LlmClient, prompt: &str, attempt: u32) -> Option<String> {
    match client.complete(prompt).await {
        Ok(raw) => Some(raw),
        Err(error) => {
            warn!(
                event_name = "llm.request.failed",
                provider = client.provider_name(),
                attempt,
                retryable = error.is_retryable(),
                error = %error,
                "language model request failed"
            );
            None
        }
    }
}

fn parse_whole(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

fn parse_lines(raw: &str) -> Option<Value> {
    raw.trim().lines().find_map(|line| serde_json::from_str(line.trim()).ok())
}

fn fallback_for(schema: &Value) -> Value {
    if schema.get("type").and_then(Value::as_str) == Some("object") {
        json!({})
    } else {
        json!({ "error": JSON_FALLBACK_ERROR })
    }
}

pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::from_config(config)?),
        LlmProvider::Anthropic => Arc::new(AnthropicClient::from_config(config)?),
        LlmProvider::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    Ok(client)
}

/// Replays queued responses in order and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queued = responses.into_iter().map(|response| Ok(response.into())).collect();
        Self { responses: Mutex::new(queued), prompts: Mutex::new(Vec::new()) }
    }

    pub fn push_error(&self, error: LlmError) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(Err(error));
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|prompts| prompts.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self.responses.lock().ok().and_then(|mut responses| responses.pop_front());
        next.unwrap_or_else(|| Err(LlmError::Transport("scripted client exhausted".to_string())))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
