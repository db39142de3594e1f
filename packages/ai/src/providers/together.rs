//! Together.ai chat-completions provider.
//!
//! Uses the OpenAI-compatible `/v1/chat/completions` endpoint with fixed
//! sampling parameters. Streaming responses arrive as server-sent events:
//! `data: {json}` lines carrying `choices[0].delta.content` fragments,
//! terminated by a `data: [DONE]` marker.

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::CompletionProvider;
use crate::AiError;

/// Default chat completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1/chat/completions";

/// Default model for market analysis.
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free";

/// Fixed sampling parameters for reproducible, factual output.
const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.95;
const MAX_TOKENS: u32 = 300;

/// Together.ai API provider.
pub struct TogetherProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl TogetherProvider {
    /// Creates a new Together provider against the public endpoint.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a provider against a custom endpoint (e.g. a local
    /// OpenAI-compatible server).
    #[must_use]
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, system_prompt: &str, user_prompt: &str, stream: bool) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_TOKENS,
            stream,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extracts the content fragment from one SSE `data:` payload.
///
/// Returns `None` for the `[DONE]` marker and for chunks without a text
/// delta (role announcements, finish markers).
fn parse_stream_data(data: &str) -> Result<Option<String>, AiError> {
    if data.trim() == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content))
}

#[async_trait::async_trait]
impl CompletionProvider for TogetherProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError> {
        let request = self.build_request(system_prompt, user_prompt, false);

        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: ApiError = serde_json::from_str(&body).unwrap_or_else(|_| ApiError {
                error: ApiErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: ChatResponse = serde_json::from_str(&body)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::Provider {
                message: "No choices in completion response".to_string(),
            })?;

        Ok(content.trim().to_string())
    }

    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tx: mpsc::Sender<String>,
    ) -> Result<(), AiError> {
        let request = self.build_request(system_prompt, user_prompt, true);

        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Provider {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let mut stream = resp.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // SSE frames are newline-delimited; anything after the last
            // newline may be a partial frame, keep it buffered.
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };

                if data.trim() == "[DONE]" {
                    return Ok(());
                }

                if let Some(fragment) = parse_stream_data(data)?
                    && tx.send(fragment).await.is_err()
                {
                    // Receiver hung up; stop pulling from the network.
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Le prix"}}]}"#;
        assert_eq!(parse_stream_data(data).unwrap(), Some("Le prix".to_string()));
    }

    #[test]
    fn parses_stream_done_marker() {
        assert_eq!(parse_stream_data(" [DONE]").unwrap(), None);
    }

    #[test]
    fn parses_delta_without_content() {
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_stream_data(data).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_chunk() {
        assert!(parse_stream_data("{not json").is_err());
    }
}
