//! SSE stream parser for the `OpenAI` Responses API.
//!
//! Converts a raw `reqwest::Response` byte stream into a
//! [`ProviderStream`]. Handles UTF-8 sequences split across chunks and
//! maps the handful of event types the generation loop consumes:
//!
//! | SSE `type` | Event |
//! |------------|-------|
//! | `response.created` | [`ProviderEvent::Created`] |
//! | `response.output_text.delta` | [`ProviderEvent::TextDelta`] |
//! | `response.output_item.done` (function call) | [`ProviderEvent::FunctionCall`] |
//! | `response.completed`, `response.incomplete` | [`ProviderEvent::Completed`] |
//! | `error`, `response.failed` | error, or [`ProviderEvent::Error`] |
//!
//! Everything else is ignored.

use futures::stream::StreamExt;
use gen_stack::{FunctionCallItem, GenerationError, ProviderEvent, ProviderStream};

use crate::convert::{convert_stream_error, convert_usage, failed_response_error};
use crate::types::{OutputItem, StreamPayload};

/// Maximum size for buffers before we abort the stream.
const MAX_BUF: usize = 16 * 1024 * 1024; // 16 MiB

/// Convert a reqwest SSE response into a [`ProviderStream`].
pub(crate) fn into_stream(response: reqwest::Response) -> ProviderStream {
    let stream = response
        .bytes_stream()
        .scan(
            (String::new(), Vec::<u8>::new()),
            move |(buffer, utf8_buf), chunk| {
                let result = match chunk {
                    Ok(bytes) => Some(push_chunk(buffer, utf8_buf, &bytes)),
                    Err(e) => Some(vec![Err(GenerationError::Http {
                        status: None,
                        message: format!("Stream read error: {e}"),
                        retryable: true,
                    })]),
                };
                async move { result }
            },
        )
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}

/// Appends `bytes` and drains every complete SSE event.
fn push_chunk(
    buffer: &mut String,
    utf8_buf: &mut Vec<u8>,
    bytes: &[u8],
) -> Vec<Result<ProviderEvent, GenerationError>> {
    utf8_buf.extend_from_slice(bytes);

    if utf8_buf.len() > MAX_BUF || buffer.len() > MAX_BUF {
        utf8_buf.clear();
        buffer.clear();
        return vec![Err(GenerationError::ResponseFormat {
            message: "SSE stream buffer exceeded 16 MiB".into(),
            raw: String::new(),
        })];
    }

    match std::str::from_utf8(utf8_buf) {
        Ok(text) => {
            buffer.push_str(text);
            utf8_buf.clear();
        }
        Err(e) => {
            let valid_up_to = e.valid_up_to();
            buffer.push_str(&String::from_utf8_lossy(&utf8_buf[..valid_up_to]));
            match e.error_len() {
                // Permanently invalid bytes are skipped.
                Some(len) => {
                    utf8_buf.drain(..valid_up_to + len);
                }
                // A sequence cut at the chunk boundary waits for more bytes.
                None => {
                    utf8_buf.drain(..valid_up_to);
                }
            }
        }
    }

    let mut results = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let event_text: String = buffer.drain(..pos + 2).collect();
        results.extend(parse_sse_event(&event_text));
    }
    results
}

/// Parse a single SSE event into zero or one provider events.
fn parse_sse_event(event_text: &str) -> Option<Result<ProviderEvent, GenerationError>> {
    let data = extract_data(event_text)?;
    if data == "[DONE]" {
        return None;
    }

    let payload = match serde_json::from_str::<StreamPayload>(&data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "skipping unparseable OpenAI stream event");
            return None;
        }
    };

    match payload {
        StreamPayload::Created { response } => Some(Ok(ProviderEvent::Created {
            response_id: response.id,
        })),
        StreamPayload::TextDelta { delta } if !delta.is_empty() => {
            Some(Ok(ProviderEvent::TextDelta(delta)))
        }
        StreamPayload::OutputItemDone {
            item:
                OutputItem::FunctionCall {
                    id,
                    call_id,
                    name,
                    arguments,
                },
        } => Some(Ok(ProviderEvent::FunctionCall(FunctionCallItem {
            id,
            call_id,
            name,
            arguments,
        }))),
        StreamPayload::Completed { response } => Some(Ok(ProviderEvent::Completed {
            usage: response
                .usage
                .as_ref()
                .map(convert_usage)
                .unwrap_or_default(),
        })),
        StreamPayload::Error {
            code: None,
            message,
        } => Some(Ok(ProviderEvent::Error { message })),
        StreamPayload::Error { code, message } => Some(Err(convert_stream_error(code, message))),
        StreamPayload::Failed { response } => Some(Err(failed_response_error(response.error))),
        StreamPayload::TextDelta { .. }
        | StreamPayload::OutputItemDone { .. }
        | StreamPayload::Other => None,
    }
}

/// Joins the `data:` lines of one SSE event.
fn extract_data(event_text: &str) -> Option<String> {
    let mut data: Option<String> = None;
    for line in event_text.lines() {
        let line = line.trim_end_matches('\r');
        let Some(rest) = line.strip_prefix("data:") else {
            continue;
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match &mut data {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(rest);
            }
            None => data = Some(rest.to_owned()),
        }
    }
    data
}
