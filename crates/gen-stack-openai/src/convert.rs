//! Conversion between `gen-stack` types and `OpenAI` Responses API types.

use gen_stack::{ContextItem, ErrorKind, GenerationError, ResponseRequest, Usage};

use crate::config::OpenAiConfig;
use crate::types::{ErrorDetail, ErrorResponse, InputItem, Reasoning, Request, ResponseUsage, Tool};

// ── Request conversion ───────────────────────────────────────────────

/// Build a streaming `POST /responses` body.
///
/// An empty `request.model` falls back to the configured model.
pub(crate) fn build_request<'a>(
    request: &'a ResponseRequest,
    config: &'a OpenAiConfig,
) -> Request<'a> {
    let model = if request.model.is_empty() {
        config.model.as_str()
    } else {
        request.model.as_str()
    };

    Request {
        model,
        input: request.input.iter().map(convert_item).collect(),
        stream: true,
        max_output_tokens: request.max_output_tokens,
        tools: request
            .tools
            .iter()
            .map(|t| Tool {
                tool_type: "function",
                name: &t.name,
                description: &t.description,
                parameters: t.parameters.as_value(),
            })
            .collect(),
        parallel_tool_calls: request.parallel_tool_calls,
        previous_response_id: request.previous_response_id.as_deref(),
        reasoning: request.reasoning.map(|effort| Reasoning { effort }),
        user: request.user.as_deref(),
        metadata: (!request.metadata.is_empty()).then_some(&request.metadata),
    }
}

fn convert_item(item: &ContextItem) -> InputItem<'_> {
    match item {
        ContextItem::Message { role, content } => InputItem::Message { role, content },
        ContextItem::FunctionCall {
            call_id,
            name,
            arguments,
            ..
        } => InputItem::FunctionCall {
            call_id,
            name,
            arguments,
        },
        ContextItem::FunctionCallOutput {
            call_id, output, ..
        } => InputItem::FunctionCallOutput { call_id, output },
    }
}

/// Convert `OpenAI` usage to core [`Usage`].
pub(crate) fn convert_usage(usage: &ResponseUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        reasoning_tokens: usage
            .output_tokens_details
            .as_ref()
            .and_then(|d| d.reasoning_tokens),
        cached_input_tokens: usage
            .input_tokens_details
            .as_ref()
            .and_then(|d| d.cached_tokens),
    }
}

// ── Error conversion ─────────────────────────────────────────────────

/// Convert an HTTP status and error body into a [`GenerationError`].
pub(crate) fn convert_error(status: http::StatusCode, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<ErrorResponse>(body).ok().map(|r| r.error);
    let message = detail
        .as_ref()
        .map_or_else(|| body.to_string(), |d| d.message.clone());

    match status.as_u16() {
        401 | 403 => GenerationError::Auth(message),
        429 => GenerationError::RateLimited(message),
        400 | 404 | 413 | 422 => GenerationError::InvalidRequest(message),
        code => match detail.and_then(error_code) {
            Some(code_str) => GenerationError::Provider {
                code: code_str,
                message,
                retryable: code >= 500,
            },
            None => GenerationError::Http {
                status: Some(status),
                message,
                retryable: matches!(code, 500 | 502 | 503 | 504),
            },
        },
    }
}

/// Convert an in-stream `error` event or failed response.
///
/// Errors with a code become [`GenerationError::Provider`] so
/// [`classify`] can map the code. Codeless errors fail the generation
/// with the provider's message.
pub(crate) fn convert_stream_error(code: Option<String>, message: String) -> GenerationError {
    match code {
        Some(code) => {
            let retryable = code == "server_error";
            GenerationError::Provider {
                code,
                message,
                retryable,
            }
        }
        None => GenerationError::Stream(message),
    }
}

pub(crate) fn failed_response_error(error: Option<ErrorDetail>) -> GenerationError {
    match error {
        Some(detail) => {
            let message = detail.message.clone();
            convert_stream_error(error_code(detail), message)
        }
        None => GenerationError::Stream("response failed without an error payload".into()),
    }
}

fn error_code(detail: ErrorDetail) -> Option<String> {
    detail.code.or(detail.error_type)
}

/// `OpenAI` error classification.
///
/// Error codes are more precise than statuses: a quota failure is a rate
/// limit even when it arrives mid-stream, and an oversized context is the
/// caller's fault even when the API reports it as a server event.
pub(crate) fn classify(error: &GenerationError) -> ErrorKind {
    match error {
        GenerationError::Provider { code, .. } => match code.as_str() {
            "rate_limit_exceeded" | "insufficient_quota" => ErrorKind::RateLimit,
            "context_length_exceeded" | "invalid_prompt" | "invalid_request_error" => {
                ErrorKind::InvalidRequest
            }
            "invalid_api_key" | "authentication_error" => ErrorKind::Authentication,
            _ => ErrorKind::ApiError,
        },
        other => other.kind(),
    }
}
