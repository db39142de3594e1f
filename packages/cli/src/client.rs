//! HTTP client for the immo-map API.
//!
//! Thin wrapper over `reqwest`: one call for the JSON lookup endpoint and
//! one for the SSE analysis stream, decoding `data:` frames into
//! [`NarrativeEvent`]s as they arrive.

use std::io::Write as _;

use futures::StreamExt as _;
use immo_map_ai::NarrativeEvent;
use immo_map_server_models::NearbyResponse;

/// Errors surfaced to the terminal user.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status and message.
    #[error("{0}")]
    Api(String),
}

/// Calls `GET /biens_proches` and decodes the response.
///
/// # Errors
///
/// Returns [`ClientError`] on transport failure or an API error status.
pub async fn fetch_nearby(
    client: &reqwest::Client,
    api_url: &str,
    adresse: &str,
    rayon_m: u32,
) -> Result<NearbyResponse, ClientError> {
    let resp = client
        .get(format!("{api_url}/biens_proches"))
        .query(&[("adresse", adresse), ("rayon_m", &rayon_m.to_string())])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let detail = body["detail"]
            .as_str()
            .map_or_else(|| format!("HTTP {status}"), ToString::to_string);
        return Err(ClientError::Api(detail));
    }

    Ok(resp.json().await?)
}

/// Consumes `GET /analyse_stream`, printing `content` fragments as they
/// arrive. Returns once a terminal `end`/`error` frame is received or the
/// connection closes.
///
/// # Errors
///
/// Returns [`ClientError`] on transport failure or an API error status.
pub async fn stream_analysis(
    client: &reqwest::Client,
    api_url: &str,
    adresse: &str,
    rayon_m: u32,
) -> Result<(), ClientError> {
    let resp = client
        .get(format!("{api_url}/analyse_stream"))
        .query(&[("adresse", adresse), ("rayon_m", &rayon_m.to_string())])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let detail = body["detail"]
            .as_str()
            .map_or_else(|| format!("HTTP {status}"), ToString::to_string);
        return Err(ClientError::Api(detail));
    }

    let mut stream = resp.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].trim().to_string();
            buffer.drain(..=newline);

            let Some(event) = parse_sse_line(&line) else {
                continue;
            };

            match event {
                NarrativeEvent::Start { .. } => {}
                NarrativeEvent::Content { content } => {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
                NarrativeEvent::End { .. } => {
                    println!();
                    return Ok(());
                }
                NarrativeEvent::Error { content } => {
                    println!();
                    return Err(ClientError::Api(content));
                }
            }
        }
    }

    // Connection closed without a terminal frame; treat like an error so
    // the user knows the analysis may be incomplete.
    println!();
    Err(ClientError::Api("flux interrompu".to_string()))
}

/// Decodes one SSE line into a narrative event.
///
/// Non-`data:` lines and undecodable payloads yield `None`.
fn parse_sse_line(line: &str) -> Option<NarrativeEvent> {
    let data = line.strip_prefix("data:")?.trim();
    serde_json::from_str(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_content_frames() {
        let event = parse_sse_line(r#"data: {"type":"content","content":"Le prix"}"#).unwrap();
        assert_eq!(
            event,
            NarrativeEvent::Content {
                content: "Le prix".to_string()
            }
        );
    }

    #[test]
    fn decodes_terminal_frames() {
        let event = parse_sse_line(r#"data: {"type":"end","content":"Analyse terminée"}"#).unwrap();
        assert!(matches!(event, NarrativeEvent::End { .. }));
    }

    #[test]
    fn ignores_non_data_lines() {
        assert!(parse_sse_line(": keep-alive").is_none());
        assert!(parse_sse_line("").is_none());
    }

    #[test]
    fn ignores_undecodable_payloads() {
        assert!(parse_sse_line("data: {broken").is_none());
    }
}
