//! Chat-completion interaction: build messages and call the model.
//!
//! This module is intentionally thin — all prompt text lives in
//! [`crate::prompts`] so it can change without touching retry or
//! error-handling logic here.
//!
//! ## Retry Strategy
//!
//! Gateway 429/5xx errors are transient and frequent. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) avoids hammering a recovering endpoint:
//! with 500 ms base and 3 retries the wait sequence is 500 ms → 1 s → 2 s.
//! Exhausting the retries surfaces as a per-document error record, never a
//! batch failure.

use crate::config::ExtractionConfig;
use crate::error::{DocError, W9Error};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Consumed interface of the chat-completion collaborator.
///
/// A single attempt; retries are layered on by [`invoke`]. No schema can be
/// enforced on this boundary — downstream parsing is defensive.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DocError>;
}

/// Call the model with bounded retry and exponential backoff.
///
/// Returns the raw reply text; JSON isolation happens in
/// [`crate::pipeline::reply`].
pub async fn invoke(
    model: &Arc<dyn ChatModel>,
    system: &str,
    user: &str,
    config: &ExtractionConfig,
) -> Result<String, DocError> {
    let mut last_err = String::new();

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!("chat retry {}/{} after {}ms", attempt, config.max_retries, backoff);
            sleep(Duration::from_millis(backoff)).await;
        }

        match model.complete(system, user).await {
            Ok(reply) => {
                debug!("chat reply received: {} bytes", reply.len());
                return Ok(reply);
            }
            Err(e) => {
                warn!("chat attempt {} failed: {}", attempt + 1, e);
                last_err = match e {
                    DocError::Llm { detail, .. } => detail,
                    other => other.to_string(),
                };
            }
        }
    }

    Err(DocError::Llm {
        retries: config.max_retries,
        detail: last_err,
    })
}

// ── HTTP client ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP client for an Azure-OpenAI-style chat-completion gateway.
///
/// Authenticates with a bearer token (acquired at startup via
/// [`crate::auth::fetch_access_token`]) and an optional `projectId` header.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    token: String,
    project_id: Option<String>,
    temperature: f32,
    max_tokens: usize,
}

impl ChatClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self, W9Error> {
        let endpoint = config
            .llm_endpoint
            .clone()
            .ok_or_else(|| W9Error::InvalidConfig("no chat endpoint configured".into()))?;
        let token = config
            .llm_token
            .clone()
            .ok_or_else(|| W9Error::InvalidConfig("no chat bearer token configured".into()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| W9Error::InvalidConfig(format!("chat client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment: config.llm_deployment.clone(),
            api_version: config.llm_api_version.clone(),
            token,
            project_id: config.project_id.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DocError> {
        let request = ChatRequest {
            messages: vec![
                Message { role: "system", content: system },
                Message { role: "user", content: user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut call = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.token)
            .json(&request);
        if let Some(ref project) = self.project_id {
            call = call.header("projectId", project);
        }

        let response = call
            .send()
            .await
            .map_err(|e| DocError::Llm { retries: 0, detail: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DocError::Llm {
                retries: 0,
                detail: format!("gateway returned {status}: {text}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| DocError::Llm {
            retries: 0,
            detail: format!("unreadable completion response: {e}"),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DocError::Llm {
                retries: 0,
                detail: "completion response has no choices".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;

    #[test]
    fn completions_url_embeds_deployment_and_version() {
        let config = ExtractionConfig::builder()
            .llm_endpoint("https://gw.example/")
            .llm_token("t")
            .llm_deployment("gpt-4.1-2025-04-14")
            .build()
            .unwrap();
        let client = ChatClient::new(&config).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://gw.example/openai/deployments/gpt-4.1-2025-04-14/chat/completions?api-version=2025-01-01-preview"
        );
    }

    #[test]
    fn chat_client_requires_token() {
        let config = ExtractionConfig::builder()
            .llm_endpoint("https://gw.example")
            .build()
            .unwrap();
        assert!(ChatClient::new(&config).is_err());
    }
}
