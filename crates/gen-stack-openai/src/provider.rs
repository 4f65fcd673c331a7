//! `OpenAI` `Provider` implementation.

use std::collections::HashSet;

use gen_stack::provider::{Capability, Provider, ProviderMetadata};
use gen_stack::{
    Credits, ErrorKind, GenerationError, ProviderStream, ResponseRequest, SafetyVerdict,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::instrument;

use crate::config::OpenAiConfig;
use crate::convert;
use crate::types::{ModerationRequest, ModerationResponse};

/// `OpenAI` provider implementing [`Provider`] over the Responses API.
///
/// Streams turns from `POST /responses`, supports function tools,
/// reasoning effort and `previous_response_id` chaining, and moderates
/// text through `POST /moderations`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use gen_stack::GenerationService;
/// use gen_stack_openai::{OpenAiConfig, OpenAiProvider, openai_catalog};
///
/// let provider = OpenAiProvider::new(OpenAiConfig {
///     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
///     ..Default::default()
/// });
/// let service = GenerationService::new(Arc::new(provider), Arc::new(openai_catalog()));
/// ```
#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a new `OpenAI` provider from configuration.
    ///
    /// If `config.client` is `Some`, that client is reused for connection
    /// pooling. Otherwise a new client is built with the configured timeout.
    pub fn new(config: OpenAiConfig) -> Self {
        let client = config.http_client();
        Self { config, client }
    }

    /// The provider's configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build the default headers for `OpenAI` API requests.
    fn default_headers(&self) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&auth_value).map_err(|_| {
                GenerationError::Auth("API key contains invalid header characters".into())
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        for (name, value) in [
            ("openai-organization", &self.config.organization),
            ("openai-project", &self.config.project),
        ] {
            if let Some(value) = value {
                headers.insert(
                    name,
                    HeaderValue::from_str(value).map_err(|_| {
                        GenerationError::InvalidRequest(format!(
                            "{name} contains invalid header characters"
                        ))
                    })?,
                );
            }
        }

        Ok(headers)
    }

    /// POST `body` to `endpoint`, mapping transport and status failures.
    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(self.config.endpoint(endpoint))
            .headers(self.default_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        elapsed_ms: self
                            .config
                            .timeout
                            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                    }
                } else {
                    GenerationError::Http {
                        status: e.status().map(|s| {
                            http::StatusCode::from_u16(s.as_u16())
                                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
                        }),
                        message: e.to_string(),
                        retryable: e.is_connect(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let http_status = http::StatusCode::from_u16(status.as_u16())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
            return Err(convert::convert_error(http_status, &body));
        }

        Ok(response)
    }
}

impl Provider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %request.model, items = request.input.len()))]
    async fn stream(&self, request: &ResponseRequest) -> Result<ProviderStream, GenerationError> {
        let body = convert::build_request(request, &self.config);
        let response = self.post("responses", &body).await?;
        Ok(crate::stream::into_stream(response))
    }

    #[instrument(skip_all, fields(model = %self.config.moderation_model))]
    async fn moderate(&self, text: &str) -> Result<SafetyVerdict, GenerationError> {
        let body = ModerationRequest {
            model: &self.config.moderation_model,
            input: text,
        };
        let response = self.post("moderations", &body).await?;
        let raw = response
            .text()
            .await
            .map_err(|e| GenerationError::ResponseFormat {
                message: format!("Failed to read OpenAI moderation body: {e}"),
                raw: String::new(),
            })?;
        let parsed: ModerationResponse =
            serde_json::from_str(&raw).map_err(|e| GenerationError::ResponseFormat {
                message: format!("Failed to parse OpenAI moderation response: {e}"),
                raw: raw.clone(),
            })?;

        let mut flagged_categories: Vec<String> = parsed
            .results
            .iter()
            .flat_map(|r| r.categories.iter())
            .filter(|(_, flagged)| **flagged)
            .map(|(category, _)| category.clone())
            .collect();
        flagged_categories.sort_unstable();
        flagged_categories.dedup();

        Ok(SafetyVerdict {
            is_safe: !parsed.results.iter().any(|r| r.flagged),
            // The moderation endpoint is free of charge.
            cost: Credits::ZERO,
            flagged_categories,
        })
    }

    fn classify_error(&self, error: &GenerationError) -> ErrorKind {
        convert::classify(error)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "openai".into(),
            default_model: self.config.model.clone(),
            capabilities: HashSet::from([
                Capability::Tools,
                Capability::Reasoning,
                Capability::Moderation,
                Capability::ResponseChaining,
            ]),
        }
    }
}
