//! Configuration types for W-9 extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across handlers, and to substitute fake
//! collaborators in tests without touching production construction paths.
//!
//! There is deliberately no import-time global client: the config (and the
//! collaborators it resolves to) is created once at process start and passed
//! explicitly into [`crate::extract::extract_batch`].

use crate::error::W9Error;
use crate::pipeline::layout::LayoutAnalyzer;
use crate::pipeline::llm::ChatModel;
use std::fmt;
use std::sync::Arc;

/// Configuration for a W-9 extraction batch.
///
/// Built via [`ExtractionConfig::builder()`].
///
/// # Example
/// ```rust
/// use w9_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .layout_endpoint("https://example.cognitiveservices.azure.com")
///     .layout_key("key")
///     .llm_endpoint("https://example.openai.azure.com")
///     .llm_token("token")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Pre-constructed layout collaborator. Takes precedence over
    /// `layout_endpoint`/`layout_key`. Used by tests to inject fakes.
    pub layout: Option<Arc<dyn LayoutAnalyzer>>,

    /// Pre-constructed chat collaborator. Takes precedence over the
    /// `llm_*` fields. Used by tests to inject fakes.
    pub chat: Option<Arc<dyn ChatModel>>,

    /// Base URL of the document-layout analysis service.
    pub layout_endpoint: Option<String>,

    /// Subscription key for the layout service.
    pub layout_key: Option<String>,

    /// Layout API version. Default: "2024-11-30".
    pub layout_api_version: String,

    /// Base URL of the chat-completion gateway.
    pub llm_endpoint: Option<String>,

    /// Deployment (model) identifier for chat completions.
    /// Default: "gpt-4.1-2025-04-14".
    pub llm_deployment: String,

    /// Chat API version. Default: "2025-01-01-preview".
    pub llm_api_version: String,

    /// Bearer token for the chat gateway, usually acquired via
    /// [`crate::auth::fetch_access_token`] at startup.
    pub llm_token: Option<String>,

    /// Optional project identifier forwarded as a request header to the
    /// chat gateway.
    pub project_id: Option<String>,

    /// Sampling temperature for the completion. Default: 0.0.
    ///
    /// Extraction wants the model deterministic and faithful to the form
    /// content; creativity only worsens field accuracy.
    pub temperature: f32,

    /// Maximum tokens the model may generate per document. Default: 1024.
    ///
    /// An eleven-field JSON object fits comfortably; the cap keeps a
    /// runaway reply from inflating per-document cost.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient chat-API failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Delay between layout-result polls in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Maximum number of layout-result polls before giving up. Default: 60.
    ///
    /// With the default interval this bounds a single analysis at two
    /// minutes, matching the service's own long-running-operation envelope.
    pub max_poll_attempts: u32,

    /// Per-HTTP-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            layout: None,
            chat: None,
            layout_endpoint: None,
            layout_key: None,
            layout_api_version: "2024-11-30".to_string(),
            llm_endpoint: None,
            llm_deployment: "gpt-4.1-2025-04-14".to_string(),
            llm_api_version: "2025-01-01-preview".to_string(),
            llm_token: None,
            project_id: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            poll_interval_ms: 2000,
            max_poll_attempts: 60,
            api_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("layout", &self.layout.as_ref().map(|_| "<dyn LayoutAnalyzer>"))
            .field("chat", &self.chat.as_ref().map(|_| "<dyn ChatModel>"))
            .field("layout_endpoint", &self.layout_endpoint)
            .field("layout_api_version", &self.layout_api_version)
            .field("llm_endpoint", &self.llm_endpoint)
            .field("llm_deployment", &self.llm_deployment)
            .field("llm_api_version", &self.llm_api_version)
            .field("llm_token", &self.llm_token.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn layout(mut self, analyzer: Arc<dyn LayoutAnalyzer>) -> Self {
        self.config.layout = Some(analyzer);
        self
    }

    pub fn chat(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.config.chat = Some(model);
        self
    }

    pub fn layout_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.layout_endpoint = Some(url.into());
        self
    }

    pub fn layout_key(mut self, key: impl Into<String>) -> Self {
        self.config.layout_key = Some(key.into());
        self
    }

    pub fn layout_api_version(mut self, v: impl Into<String>) -> Self {
        self.config.layout_api_version = v.into();
        self
    }

    pub fn llm_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.llm_endpoint = Some(url.into());
        self
    }

    pub fn llm_deployment(mut self, d: impl Into<String>) -> Self {
        self.config.llm_deployment = d.into();
        self
    }

    pub fn llm_api_version(mut self, v: impl Into<String>) -> Self {
        self.config.llm_api_version = v.into();
        self
    }

    pub fn llm_token(mut self, token: impl Into<String>) -> Self {
        self.config.llm_token = Some(token.into());
        self
    }

    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.config.project_id = Some(id.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, W9Error> {
        let c = &self.config;
        if c.max_poll_attempts == 0 {
            return Err(W9Error::InvalidConfig("max_poll_attempts must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(W9Error::InvalidConfig("api_timeout_secs must be ≥ 1".into()));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(W9Error::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        Ok(self.config)
    }
}

/// OAuth2 client-credentials settings for token acquisition.
///
/// Consumed once at startup by [`crate::auth::fetch_access_token`]; the
/// resulting token is threaded into [`ExtractionConfig::llm_token`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token endpoint URL.
    pub token_url: String,
    /// OAuth2 scope requested for the token.
    pub scope: String,
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = ExtractionConfig::builder().build().unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff_ms, 500);
        assert_eq!(config.layout_api_version, "2024-11-30");
        assert_eq!(config.max_tokens, 1024);
        assert!(config.layout.is_none());
    }

    #[test]
    fn builder_clamps_temperature() {
        let config = ExtractionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn builder_clamps_poll_attempts() {
        let config = ExtractionConfig::builder().max_poll_attempts(0).build().unwrap();
        assert_eq!(config.max_poll_attempts, 1);
    }

    #[test]
    fn debug_redacts_token() {
        let config = ExtractionConfig::builder().llm_token("secret").build().unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("redacted"));
    }
}
