//! Server-sent event decoding for streamed chat completions.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use super::api_error::ApiError;

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    delta: CompletionDelta,
}

#[derive(Deserialize, Default)]
struct CompletionDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamErrorEvent {
    error: StreamErrorBody,
}

#[derive(Deserialize)]
struct StreamErrorBody {
    message: String,
}

/// Parses one SSE line of a chat completion stream. Returns:
/// - `Some(Ok(delta))` for content
/// - `Some(Err(_))` for an in-band error event or an undecodable chunk
/// - `None` for blank lines, comments, non-data fields, `[DONE]` and empty deltas
pub fn parse_event_line(line: &str) -> Option<Result<String, ApiError>> {
    let line = line.trim();
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    if let Ok(event) = serde_json::from_str::<StreamErrorEvent>(data) {
        return Some(Err(ApiError::Response { status: 200, message: event.error.message }));
    }

    match serde_json::from_str::<CompletionChunk>(data) {
        Ok(chunk) => {
            let content = chunk.choices.into_iter().next().and_then(|c| c.delta.content)?;
            if content.is_empty() {
                return None;
            }
            Some(Ok(content))
        }
        Err(e) => Some(Err(ApiError::Format(format!("Failed to parse completion chunk: {e}")))),
    }
}

/// Splits a byte stream into complete lines, carrying partial lines across
/// chunk boundaries.
pub fn stream_lines<S, B, E>(byte_stream: S) -> impl Stream<Item = anyhow::Result<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    stream::unfold(
        (Box::pin(byte_stream), Vec::<u8>::new(), false),
        |(mut inner, mut buffer, finished)| async move {
            loop {
                if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line).trim_end().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    return Some((Ok(line), (inner, buffer, finished)));
                }

                if finished {
                    return None;
                }

                match inner.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(bytes.as_ref()),
                    Some(Err(e)) => {
                        let err = anyhow::Error::new(e).context("Chat stream read error");
                        return Some((Err(err), (inner, Vec::new(), true)));
                    }
                    None => {
                        let rest = String::from_utf8_lossy(&std::mem::take(&mut buffer)).trim().to_string();
                        if rest.is_empty() {
                            return None;
                        }
                        return Some((Ok(rest), (inner, buffer, true)));
                    }
                }
            }
        },
    )
}

/// Turns a raw SSE byte stream into content deltas.
pub fn content_deltas<S, B, E>(byte_stream: S) -> impl Stream<Item = anyhow::Result<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    stream_lines(byte_stream).filter_map(|line| async move {
        match line {
            Ok(line) => parse_event_line(&line).map(|item| item.map_err(anyhow::Error::from)),
            Err(e) => Some(Err(e)),
        }
    })
}
