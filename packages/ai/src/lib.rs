#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM-backed market narrative generation.
//!
//! Renders aggregate statistics into a deterministic French prompt and
//! requests a completion from a chat-completions API (Together.ai), either
//! as a single blocking call or as an incremental stream of text
//! fragments. Completion failures never propagate to the end user: the
//! blocking mode degrades to a fixed fallback sentence, the streaming mode
//! terminates with an `error` frame.

pub mod generate;
pub mod prompt;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during narrative generation.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the completion provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Events emitted during incremental narrative delivery.
///
/// These are the frames the server forwards verbatim over the event
/// stream. Receipt of `End` or `Error` is authoritative stream
/// termination regardless of transport-level closure timing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NarrativeEvent {
    /// Generation has started.
    Start {
        /// Status message.
        content: String,
    },
    /// A text fragment of the narrative.
    Content {
        /// The fragment.
        content: String,
    },
    /// Generation completed successfully.
    End {
        /// Status message.
        content: String,
    },
    /// Generation failed; no further frames follow.
    Error {
        /// Reason, safe to show to the client.
        content: String,
    },
}
