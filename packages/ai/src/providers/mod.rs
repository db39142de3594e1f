//! Completion provider abstraction and implementations.
//!
//! A provider turns a (system, user) prompt pair into generated text,
//! either in one blocking call or as an incremental stream of fragments.

pub mod together;

use tokio::sync::mpsc;

use crate::AiError;

/// Trait for chat-completion providers.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Requests a complete response.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError>;

    /// Requests a streamed response, sending each text fragment through
    /// `tx` as it arrives.
    ///
    /// The channel is dropped when this returns, which is how consumers
    /// observe the end of the fragment stream.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the stream errors
    /// mid-flight; fragments already sent remain delivered.
    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tx: mpsc::Sender<String>,
    ) -> Result<(), AiError>;
}

/// Creates the completion provider from environment variables.
///
/// Requires `TOGETHER_API_KEY`; `AI_MODEL` overrides the default model.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the API key is not set.
pub fn create_provider_from_env() -> Result<Box<dyn CompletionProvider>, AiError> {
    let api_key = std::env::var("TOGETHER_API_KEY").map_err(|_| AiError::Config {
        message: "TOGETHER_API_KEY environment variable not set".to_string(),
    })?;
    let model =
        std::env::var("AI_MODEL").unwrap_or_else(|_| together::DEFAULT_MODEL.to_string());

    Ok(Box::new(together::TogetherProvider::new(api_key, model)))
}
