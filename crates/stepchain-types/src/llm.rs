//! Model-call types for stepchain.
//!
//! Wire shapes for OpenAI-compatible chat-completions endpoints and the
//! error type surfaced by the model-caller port. The engine treats the call
//! as an opaque `(model, prompt) -> output` capability; these types belong
//! to the boundary, not to the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a message in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Request body for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response body for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Only the fields the caller reads are modeled; anything else the provider
/// returns is ignored during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

/// One completion choice from the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

/// The message payload of a completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: String,
}

/// Errors from the model-call capability.
#[derive(Debug, thiserror::Error)]
pub enum ModelCallError {
    #[error("model endpoint configuration missing: {0}")]
    MissingConfig(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("model call failed: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model call failed: {0}")]
    Transport(String),

    #[error("invalid model response: {0}")]
    Deserialization(String),
}
