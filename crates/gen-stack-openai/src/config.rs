//! Connection settings for the Responses and Moderations endpoints.

use std::time::Duration;

/// Public API root. Requests go to `{base_url}/responses` and
/// `{base_url}/moderations`.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model a generation falls back to when its hint matches nothing in the
/// catalog.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Model that screens text for
/// [`safe_input_check`](gen_stack::GenerationService::safe_input_check).
pub const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";

/// Everything [`OpenAiProvider`](crate::OpenAiProvider) needs to reach the
/// API.
///
/// Only `api_key` has no usable default:
///
/// ```rust
/// use gen_stack_openai::OpenAiConfig;
///
/// let config = OpenAiConfig {
///     api_key: "sk-...".into(),
///     model: "gpt-4.1-mini".into(),
///     ..Default::default()
/// };
/// assert_eq!(config.endpoint("responses"), "https://api.openai.com/v1/responses");
/// ```
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token. Never printed by `Debug`.
    pub api_key: String,
    /// Generation model when the request names none the catalog knows.
    pub model: String,
    /// API root, with or without a trailing slash.
    pub base_url: String,
    /// Billing organization, sent as `OpenAI-Organization`.
    pub organization: Option<String>,
    /// Billing project, sent as `OpenAI-Project`.
    pub project: Option<String>,
    /// Model passed to `POST /moderations`.
    pub moderation_model: String,
    /// Whole-request timeout, applied only when `client` is `None`.
    pub timeout: Option<Duration>,
    /// Shared client. Clones of the config reuse its connection pool.
    pub client: Option<reqwest::Client>,
}

impl OpenAiConfig {
    /// Full URL of `path` under `base_url`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The configured client, or a fresh one honoring `timeout`.
    pub(crate) fn http_client(&self) -> reqwest::Client {
        if let Some(client) = &self.client {
            return client.clone();
        }
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "HTTP client build failed, using defaults");
            reqwest::Client::new()
        })
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("OpenAiConfig")
            .field("api_key", &key)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("moderation_model", &self.moderation_model)
            .field("timeout", &self.timeout)
            .field("shared_client", &self.client.is_some())
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            organization: None,
            project: None,
            moderation_model: DEFAULT_MODERATION_MODEL.into(),
            timeout: None,
            client: None,
        }
    }
}
