//! Layout analysis adapter: text lines and selection marks with geometry.
//!
//! The layout service is a long-running-operation REST API: submitting a
//! document returns `202 Accepted` with an `Operation-Location` header, and
//! the result URL is polled until the analysis reports `succeeded` or
//! `failed`. This module owns that dance and hands the rest of the pipeline
//! a plain [`AnalyzeResult`].
//!
//! Only `pages[0]` is consumed downstream — W-9 forms are single-page — but
//! the full page list is deserialised so a zero-page reply is distinguishable
//! from a missing one.

use crate::error::{DocError, W9Error};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// A recognised line of text with its bounding polygon.
///
/// The polygon is a flat alternating x,y sequence as returned by the
/// service; the first vertex is the line's origin for nearest-neighbour
/// lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub content: String,
    #[serde(default)]
    pub polygon: Vec<f64>,
}

/// Checked / unchecked state of a detected selection mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionState {
    Selected,
    Unselected,
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionState::Selected => write!(f, "selected"),
            SelectionState::Unselected => write!(f, "unselected"),
        }
    }
}

/// A detected checkbox/radio-style marking with a bounding polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionMark {
    #[serde(default)]
    pub polygon: Vec<f64>,
    pub state: SelectionState,
}

/// One page of layout output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub lines: Vec<TextLine>,
    #[serde(default)]
    pub selection_marks: Vec<SelectionMark>,
}

/// Full layout analysis output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResult {
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Consumed interface of the layout analysis collaborator.
///
/// Production uses [`LayoutClient`]; tests inject fakes through
/// [`crate::config::ExtractionConfig::layout`].
#[async_trait]
pub trait LayoutAnalyzer: Send + Sync {
    async fn analyze(&self, document: &[u8]) -> Result<AnalyzeResult, DocError>;
}

// ── HTTP client ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(rename = "analyzeResult")]
    analyze_result: Option<AnalyzeResult>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeRequest {
    #[serde(rename = "base64Source")]
    base64_source: String,
}

/// HTTP client for a document-intelligence-style layout API.
pub struct LayoutClient {
    http: reqwest::Client,
    endpoint: String,
    key: String,
    api_version: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl LayoutClient {
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        api_version: impl Into<String>,
        timeout_secs: u64,
        poll_interval_ms: u64,
        max_poll_attempts: u32,
    ) -> Result<Self, W9Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| W9Error::InvalidConfig(format!("layout client: {e}")))?;
        let endpoint = endpoint.into();
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
            key: key.into(),
            api_version: api_version.into(),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_poll_attempts,
        })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/prebuilt-layout:analyze?api-version={}&features=keyValuePairs",
            self.endpoint, self.api_version
        )
    }
}

#[async_trait]
impl LayoutAnalyzer for LayoutClient {
    async fn analyze(&self, document: &[u8]) -> Result<AnalyzeResult, DocError> {
        let body = AnalyzeRequest {
            base64_source: base64::engine::general_purpose::STANDARD.encode(document),
        };

        let response = self
            .http
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocError::Layout { detail: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DocError::Layout {
                detail: format!("submit rejected ({status}): {text}"),
            });
        }

        let result_url = response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| DocError::Layout {
                detail: "no Operation-Location header in analyze response".into(),
            })?;
        debug!("layout analysis submitted, polling {result_url}");

        for attempt in 0..self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let poll: OperationStatus = self
                .http
                .get(&result_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await
                .map_err(|e| DocError::Layout { detail: e.to_string() })?
                .json()
                .await
                .map_err(|e| DocError::Layout {
                    detail: format!("unreadable poll response: {e}"),
                })?;

            match poll.status.as_str() {
                "succeeded" => {
                    return poll.analyze_result.ok_or_else(|| DocError::Layout {
                        detail: "succeeded without an analyzeResult".into(),
                    });
                }
                "failed" => {
                    let detail = poll
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "unknown service error".into());
                    return Err(DocError::Layout { detail });
                }
                other => debug!("layout analysis poll {attempt}: {other}"),
            }
        }

        warn!("layout analysis still running after {} polls", self.max_poll_attempts);
        Err(DocError::Layout {
            detail: format!("analysis did not complete within {} polls", self.max_poll_attempts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_state_display_matches_wire_values() {
        assert_eq!(SelectionState::Selected.to_string(), "selected");
        assert_eq!(SelectionState::Unselected.to_string(), "unselected");
    }

    #[test]
    fn page_deserialises_service_shape() {
        let json = r#"{
            "pages": [{
                "lines": [{"content": "Name", "polygon": [1.0, 1.0, 2.0, 1.0]}],
                "selectionMarks": [{"polygon": [1.0, 2.0, 1.2, 2.2], "state": "selected"}]
            }]
        }"#;
        let result: AnalyzeResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].lines[0].content, "Name");
        assert_eq!(result.pages[0].selection_marks[0].state, SelectionState::Selected);
    }

    #[test]
    fn missing_geometry_deserialises_to_empty_polygon() {
        let json = r#"{"pages": [{"lines": [{"content": "x"}], "selectionMarks": [{"state": "unselected"}]}]}"#;
        let result: AnalyzeResult = serde_json::from_str(json).unwrap();
        assert!(result.pages[0].lines[0].polygon.is_empty());
        assert!(result.pages[0].selection_marks[0].polygon.is_empty());
    }

    #[test]
    fn analyze_url_includes_model_and_features() {
        let client = LayoutClient::new("https://svc.example/", "k", "2024-11-30", 10, 100, 1).unwrap();
        let url = client.analyze_url();
        assert!(url.starts_with("https://svc.example/documentintelligence"));
        assert!(url.contains("prebuilt-layout"));
        assert!(url.contains("api-version=2024-11-30"));
        assert!(url.contains("features=keyValuePairs"));
    }
}
