//! ModelCaller trait definition.
//!
//! The single outbound capability the engine consumes: send a prompt to a
//! named model backend, get the text output back. The call is opaque to the
//! engine -- possibly slow, possibly failing, with its own internal
//! timeout/retry policy.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).
//! Implementations live in stepchain-infra (e.g. `OpenAiCompatClient`).

use stepchain_types::llm::ModelCallError;

/// Trait for model-call backends.
pub trait ModelCaller: Send + Sync {
    /// Human-readable backend name (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Send `prompt` to the backend identified by `model` and return the
    /// full text output.
    fn call(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, ModelCallError>> + Send;
}
