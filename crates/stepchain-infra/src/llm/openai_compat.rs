//! OpenAI-compatible chat completion client.
//!
//! Implements `ModelCaller` against any endpoint speaking the
//! `/chat/completions` wire format. One client serves every model the
//! workflows name; the model identifier travels in the request body.
//!
//! Transport-level failures and server errors are retried a few times here
//! with a flat delay. This is independent of the engine's per-step retry
//! policy, which treats the whole call as one attempt.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use stepchain_types::llm::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelCallError,
};
use tracing::{debug, warn};

use stepchain_core::llm::ModelCaller;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TRANSPORT_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 512;

/// HTTP client for OpenAI-compatible chat completion endpoints.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: SecretString,
}

impl OpenAiCompatClient {
    /// Create a new client for the given endpoint URL and API key.
    pub fn new(api_url: impl Into<String>, api_key: SecretString) -> Result<Self, ModelCallError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ModelCallError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key,
        })
    }

    /// Create a client from `STEPCHAIN_API_KEY` and `STEPCHAIN_API_URL`.
    ///
    /// The key is required; the URL falls back to the OpenAI endpoint.
    pub fn from_env() -> Result<Self, ModelCallError> {
        let api_key = std::env::var("STEPCHAIN_API_KEY")
            .map_err(|_| ModelCallError::MissingConfig("STEPCHAIN_API_KEY".to_string()))?;
        let api_url =
            std::env::var("STEPCHAIN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self::new(api_url, SecretString::from(api_key))
    }

    fn build_request(model: &str, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
        }
    }

    async fn send_once(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<String, ModelCallError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| ModelCallError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ModelCallError::AuthenticationFailed);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ModelCallError::Deserialization(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ModelCallError::Deserialization("response contained no choices".to_string())
            })
    }

    /// A server error or transport failure may be transient; auth failures
    /// and other client errors are not.
    fn is_retryable(err: &ModelCallError) -> bool {
        match err {
            ModelCallError::Transport(_) => true,
            ModelCallError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl ModelCaller for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn call(&self, model: &str, prompt: &str) -> Result<String, ModelCallError> {
        let request = Self::build_request(model, prompt);

        let mut last_err = None;
        for attempt in 1..=TRANSPORT_RETRIES {
            debug!(model, attempt, "sending chat completion request");
            match self.send_once(&request).await {
                Ok(content) => return Ok(content),
                Err(err) if Self::is_retryable(&err) && attempt < TRANSPORT_RETRIES => {
                    warn!(model, attempt, error = %err, "chat completion attempt failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        // The loop always returns on its final attempt.
        Err(last_err
            .unwrap_or_else(|| ModelCallError::Transport("no attempts made".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = OpenAiCompatClient::build_request("gpt-4o-mini", "say hi");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "say hi");
        assert_eq!(json["temperature"], 0.7);
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(OpenAiCompatClient::is_retryable(
            &ModelCallError::Transport("timeout".to_string())
        ));
        assert!(OpenAiCompatClient::is_retryable(&ModelCallError::Api {
            status: 503,
            message: String::new()
        }));
        assert!(OpenAiCompatClient::is_retryable(&ModelCallError::Api {
            status: 429,
            message: String::new()
        }));
        assert!(!OpenAiCompatClient::is_retryable(&ModelCallError::Api {
            status: 400,
            message: String::new()
        }));
        assert!(!OpenAiCompatClient::is_retryable(
            &ModelCallError::AuthenticationFailed
        ));
    }

    #[test]
    fn test_name() {
        let client =
            OpenAiCompatClient::new("http://localhost:9999/v1/chat/completions", "k".into())
                .unwrap();
        assert_eq!(client.name(), "openai-compat");
    }
}
