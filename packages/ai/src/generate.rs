//! Narrative generation with degradation.
//!
//! Wraps a [`CompletionProvider`] with the service's failure policy: the
//! blocking mode answers with a fixed fallback sentence on any provider
//! failure, and the streaming mode always terminates the event stream
//! with an `End` or `Error` frame so consumers are never left waiting.

use immo_map_stats::MarketStats;
use tokio::sync::mpsc;

use crate::providers::CompletionProvider;
use crate::{NarrativeEvent, prompt};

/// System message sent with every completion request.
pub const SYSTEM_PROMPT: &str = "Tu es un expert en analyse immobilière.";

/// Fixed fallback returned when the completion call fails.
pub const FALLBACK_MESSAGE: &str = "Analyse indisponible temporairement.";

/// Status message for the `start` frame.
pub const START_MESSAGE: &str = "Reflexion...";

/// Status message for the `end` frame.
pub const END_MESSAGE: &str = "Analyse terminée";

/// Error message for a mid-stream failure.
pub const STREAM_ERROR_MESSAGE: &str = "Erreur lors de l'analyse";

/// Generates the market narrative as one blocking call.
///
/// Any provider failure is logged and degraded to [`FALLBACK_MESSAGE`];
/// this function never fails.
pub async fn analyse_market(
    provider: &dyn CompletionProvider,
    stats: &MarketStats,
    rayon_m: u32,
) -> String {
    let user_prompt = prompt::render(stats, rayon_m);

    match provider.complete(SYSTEM_PROMPT, &user_prompt).await {
        Ok(text) => text,
        Err(e) => {
            log::error!("Narrative generation failed (rayon_m={rayon_m}): {e}");
            FALLBACK_MESSAGE.to_string()
        }
    }
}

/// Generates the market narrative incrementally, emitting
/// [`NarrativeEvent`] frames through `tx`.
///
/// Frame sequence: `Start`, zero or more `Content` fragments, then exactly
/// one terminal frame: `End` on success, `Error` on any failure,
/// including failures after fragments were already delivered.
pub async fn analyse_market_stream(
    provider: &dyn CompletionProvider,
    stats: &MarketStats,
    rayon_m: u32,
    tx: mpsc::Sender<NarrativeEvent>,
) {
    let user_prompt = prompt::render(stats, rayon_m);

    let _ = tx
        .send(NarrativeEvent::Start {
            content: START_MESSAGE.to_string(),
        })
        .await;

    let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(32);

    // Single-task cooperative pump: the provider future fills the chunk
    // channel while the forward future drains it, so fragments reach the
    // consumer as they arrive. The forward future finishes when the
    // provider future returns and drops its sender.
    let stream_result = {
        let forward = async {
            while let Some(fragment) = chunk_rx.recv().await {
                if fragment.is_empty() {
                    continue;
                }
                let _ = tx
                    .send(NarrativeEvent::Content { content: fragment })
                    .await;
            }
        };

        let (result, ()) = tokio::join!(
            provider.complete_stream(SYSTEM_PROMPT, &user_prompt, chunk_tx),
            forward
        );
        result
    };

    let terminal = match stream_result {
        Ok(()) => NarrativeEvent::End {
            content: END_MESSAGE.to_string(),
        },
        Err(e) => {
            log::error!("Streaming narrative failed (rayon_m={rayon_m}): {e}");
            NarrativeEvent::Error {
                content: STREAM_ERROR_MESSAGE.to_string(),
            }
        }
    };

    let _ = tx.send(terminal).await;
}
