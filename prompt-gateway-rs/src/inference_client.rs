// prompt-gateway-rs/src/inference_client.rs
//
// HTTP client for the hosted chat-completion endpoint (OpenAI-compatible API)
//
// This module provides:
// - A single outbound chat-completion call per attempt via reqwest
// - A fixed-delay retry loop while the upstream model is still loading
// - Classification of the response envelope into text or a failure description
//
// Configuration (.env file):
// - HF_TOKEN: bearer credential for the inference router (required)
// - HF_API_URL: chat-completions endpoint (defaults to the Hugging Face router)
// - HF_MODEL: model identifier (defaults to Meta-Llama-3-8B-Instruct)

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::{Backoff, Constant};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use config_rs::{get_env_or, get_required_env, ConfigError};

pub const DEFAULT_API_URL: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// Sampling temperature sent with every attempt
pub const TEMPERATURE: f64 = 0.7;

/// Upper bound on generated tokens sent with every attempt
pub const MAX_TOKENS: u32 = 400;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

const LOADING_MARKER: &str = "loading";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

impl ChatCompletionRequest {
    fn for_instruction(model: &str, instruction: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: instruction.to_string(),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

/// Failure outcomes of one generation call
///
/// The `Display` text of each variant is the description handed back to HTTP
/// callers; no other distinction crosses that boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    /// The request could not be completed or the reply was not JSON
    #[error("{0}")]
    Transport(String),

    /// Structured upstream error that is not a loading condition
    #[error("{0}")]
    Upstream(String),

    /// Upstream reports the model is still warming up; retried
    #[error("{0}")]
    ModelLoading(String),

    /// Success-shaped reply without `choices[0].message.content`
    #[error("Bad response: {0}")]
    MalformedResponse(String),

    /// Every attempt came back as `ModelLoading`
    #[error("model did not load in time")]
    RetryBudgetExhausted,
}

impl InferenceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, InferenceError::ModelLoading(_))
    }
}

/// Decide whether an upstream error message means the model is still loading
///
/// Case-insensitive substring match; any message mentioning "loading" counts.
pub fn is_model_loading(message: &str) -> bool {
    message.to_lowercase().contains(LOADING_MARKER)
}

fn upstream_error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Classify one parsed response body
pub fn interpret_envelope(body: &Value) -> Result<String, InferenceError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = upstream_error_message(error);
        return if is_model_loading(&message) {
            Err(InferenceError::ModelLoading(message))
        } else {
            Err(InferenceError::Upstream(message))
        };
    }

    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or_else(|| InferenceError::MalformedResponse(body.to_string()))
}

/// Fixed-delay retry policy for the loading condition
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> Constant {
        Constant::new(self.delay)
    }
}

/// Endpoint, credential and timing used by [`InferenceClient`]
#[derive(Clone)]
pub struct InferenceConfig {
    pub api_url: String,
    pub model: String,
    api_token: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl InferenceConfig {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
            api_token: api_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Reads `HF_TOKEN` (required), `HF_API_URL` and `HF_MODEL`
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = get_required_env("HF_TOKEN")?;
        Ok(Self::new(
            get_env_or("HF_API_URL", DEFAULT_API_URL),
            get_env_or("HF_MODEL", DEFAULT_MODEL),
            api_token,
        ))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Something that turns a finished instruction into generated text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, instruction: &str) -> Result<String, InferenceError>;
}

#[derive(Debug)]
pub struct InferenceClient {
    client: Client,
    config: InferenceConfig,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Generate text for a fully assembled instruction
    ///
    /// Makes at most `retry.max_attempts` calls. Only the loading condition is
    /// retried, after a fixed `retry.delay`; every other outcome returns on
    /// the attempt that produced it.
    pub async fn generate(&self, instruction: &str) -> Result<String, InferenceError> {
        let request_body = ChatCompletionRequest::for_instruction(&self.config.model, instruction);
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut delay = self.config.retry.backoff();

        tracing::info!(
            api_url = %self.config.api_url,
            model = %self.config.model,
            instruction_len = instruction.len(),
            "Preparing inference request"
        );

        for attempt in 1..=max_attempts {
            match self.execute_request(&request_body).await {
                Ok(text) => {
                    tracing::info!(attempt, "Inference request succeeded");
                    return Ok(text);
                }
                Err(err) if err.is_retryable() => {
                    if attempt == max_attempts {
                        tracing::warn!(attempt, error = %err, "Model still loading on final attempt");
                        break;
                    }
                    let wait = delay.next_backoff().unwrap_or(self.config.retry.delay);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "Model is loading, retrying in {:?}",
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) => {
                    tracing::error!(attempt, error = %err, "Inference request failed");
                    return Err(err);
                }
            }
        }

        tracing::error!(max_attempts, "Model did not finish loading within the retry budget");
        Err(InferenceError::RetryBudgetExhausted)
    }

    // Execute a single request attempt
    async fn execute_request(
        &self,
        request_body: &ChatCompletionRequest,
    ) -> Result<String, InferenceError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_token)
            .json(request_body)
            .send()
            .await
            .map_err(|err| InferenceError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| InferenceError::Transport(err.to_string()))?;

        // Status is informational only; the body decides the outcome
        tracing::debug!(%status, body_len = text.len(), "Inference response received");

        let body: Value = serde_json::from_str(&text)
            .map_err(|err| InferenceError::Transport(err.to_string()))?;

        interpret_envelope(&body)
    }

    /// Collapse to a plain description for callers that only surface text
    pub async fn generate_text_string(&self, instruction: &str) -> Result<String, String> {
        self.generate(instruction).await.map_err(|err| err.to_string())
    }
}

#[async_trait]
impl TextGenerator for InferenceClient {
    async fn complete(&self, instruction: &str) -> Result<String, InferenceError> {
        self.generate(instruction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loading_predicate_is_case_insensitive() {
        assert!(is_model_loading("Model is currently loading, please wait"));
        assert!(is_model_loading("LOADING"));
        assert!(is_model_loading("model still Loading"));
        assert!(!is_model_loading("Invalid API key"));
        assert!(!is_model_loading(""));
    }

    #[test]
    fn test_envelope_success() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "A sharper prompt"}}]
        });
        assert_eq!(interpret_envelope(&body), Ok("A sharper prompt".to_string()));
    }

    #[test]
    fn test_envelope_errors() {
        let loading = json!({"error": {"message": "Model is currently loading"}});
        assert_eq!(
            interpret_envelope(&loading),
            Err(InferenceError::ModelLoading("Model is currently loading".to_string()))
        );

        let bare = json!({"error": "Model meta-llama is loading"});
        assert!(interpret_envelope(&bare).unwrap_err().is_retryable());

        let denied = json!({"error": {"message": "Invalid API key", "type": "auth"}});
        assert_eq!(
            interpret_envelope(&denied),
            Err(InferenceError::Upstream("Invalid API key".to_string()))
        );

        // No message field: the whole error object becomes the description
        let opaque = json!({"error": {"code": 500}});
        assert_eq!(
            interpret_envelope(&opaque),
            Err(InferenceError::Upstream("{\"code\":500}".to_string()))
        );
    }

    #[test]
    fn test_envelope_malformed() {
        let missing = json!({"id": "cmpl-1", "object": "chat.completion"});
        let err = interpret_envelope(&missing).unwrap_err();
        assert_eq!(err, InferenceError::MalformedResponse(missing.to_string()));
        assert!(err.to_string().starts_with("Bad response: "));
        assert!(err.to_string().contains("chat.completion"));

        let empty_choices = json!({"choices": []});
        assert!(matches!(
            interpret_envelope(&empty_choices),
            Err(InferenceError::MalformedResponse(_))
        ));

        let empty_content = json!({"choices": [{"message": {"content": ""}}]});
        assert!(matches!(
            interpret_envelope(&empty_content),
            Err(InferenceError::MalformedResponse(_))
        ));

        let null_error = json!({"error": null, "choices": [{"message": {"content": "ok"}}]});
        assert_eq!(interpret_envelope(&null_error), Ok("ok".to_string()));
    }

    #[test]
    fn test_error_descriptions() {
        assert_eq!(
            InferenceError::RetryBudgetExhausted.to_string(),
            "model did not load in time"
        );
        assert_eq!(
            InferenceError::Upstream("Invalid API key".to_string()).to_string(),
            "Invalid API key"
        );
        assert!(!InferenceError::Transport("refused".to_string()).is_retryable());
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatCompletionRequest::for_instruction("test-model", "Do the thing");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": "Do the thing"}],
                "temperature": 0.7,
                "max_tokens": 400
            })
        );
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = InferenceConfig::new(DEFAULT_API_URL, DEFAULT_MODEL, "hf_secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hf_secret"));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }
}
