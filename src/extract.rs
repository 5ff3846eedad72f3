//! Batch extraction entry point.
//!
//! ## Failure model
//!
//! Each pipeline stage returns an explicit `Result<_, DocError>`; the
//! orchestrator composes them with `?` inside [`process_document`] and turns
//! the outcome into one [`DocumentOutcome`] per input. No per-document
//! failure aborts the batch, and every failure path — unreadable file,
//! page-less analysis, garbled reply, validation — emits an error record, so
//! `outcomes.len() == paths.len()` holds regardless of how many documents
//! fail. Only a missing collaborator configuration is fatal.
//!
//! Documents are processed strictly sequentially: each one's two network
//! round-trips complete before the next begins, and nothing is shared across
//! documents.

use crate::config::ExtractionConfig;
use crate::error::{DocError, W9Error};
use crate::output::{BatchOutput, DocumentOutcome, DocumentResponse, W9Record};
use crate::pipeline::layout::{LayoutAnalyzer, LayoutClient};
use crate::pipeline::llm::{self, ChatClient, ChatModel};
use crate::pipeline::{associate, normalize, reply};
use crate::prompts;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Extract W-9 data from every file in `paths`, in order.
///
/// This is the seam between the core pipeline and the HTTP/CLI glue.
///
/// # Returns
/// One [`DocumentOutcome`] per input path, in input order, even when
/// individual documents fail.
///
/// # Errors
/// Returns `Err(W9Error)` only when no layout or chat collaborator can be
/// resolved from the configuration.
pub async fn extract_batch(
    paths: &[PathBuf],
    config: &ExtractionConfig,
) -> Result<BatchOutput, W9Error> {
    let layout = resolve_layout(config)?;
    let chat = resolve_chat(config)?;

    let batch_start = Instant::now();
    info!("starting extraction batch of {} file(s)", paths.len());

    let mut outcomes = Vec::with_capacity(paths.len());
    for path in paths {
        let response = match process_document(path, &layout, &chat, config).await {
            Ok(record) => DocumentResponse::Data(record),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                DocumentResponse::Error { error: e.to_string() }
            }
        };
        outcomes.push(DocumentOutcome {
            file: path.display().to_string(),
            response,
        });
    }

    info!(
        "batch complete: {}/{} succeeded in {}ms",
        outcomes.iter().filter(|o| o.response.is_success()).count(),
        outcomes.len(),
        batch_start.elapsed().as_millis()
    );
    Ok(outcomes)
}

/// Run the full pipeline for one document.
async fn process_document(
    path: &Path,
    layout: &Arc<dyn LayoutAnalyzer>,
    chat: &Arc<dyn ChatModel>,
    config: &ExtractionConfig,
) -> Result<W9Record, DocError> {
    let document = tokio::fs::read(path)
        .await
        .map_err(|e| DocError::Read { detail: e.to_string() })?;

    let analysis = layout.analyze(&document).await?;

    // W-9 forms are single-page; only the first page is consulted.
    let page = analysis.pages.first().ok_or(DocError::NoPages)?;

    let associations = associate::associate_checkboxes(&page.lines, &page.selection_marks);
    let user_prompt = prompts::build_user_prompt(&page.lines, &associations);

    let raw_reply = llm::invoke(chat, prompts::SYSTEM_PROMPT, &user_prompt, config).await?;

    let parsed = reply::parse_object(&raw_reply)?;
    let normalized = normalize::normalize_keys(&parsed);
    normalize::build_record(&normalized)
}

/// Resolve the layout collaborator: pre-built instance first, then the
/// configured endpoint.
fn resolve_layout(config: &ExtractionConfig) -> Result<Arc<dyn LayoutAnalyzer>, W9Error> {
    if let Some(ref layout) = config.layout {
        return Ok(Arc::clone(layout));
    }

    let (endpoint, key) = match (&config.layout_endpoint, &config.layout_key) {
        (Some(e), Some(k)) => (e.clone(), k.clone()),
        _ => {
            return Err(W9Error::InvalidConfig(
                "no layout collaborator: set layout_endpoint + layout_key or inject one".into(),
            ))
        }
    };

    let client = LayoutClient::new(
        endpoint,
        key,
        config.layout_api_version.clone(),
        config.api_timeout_secs,
        config.poll_interval_ms,
        config.max_poll_attempts,
    )?;
    Ok(Arc::new(client))
}

/// Resolve the chat collaborator: pre-built instance first, then the
/// configured gateway.
fn resolve_chat(config: &ExtractionConfig) -> Result<Arc<dyn ChatModel>, W9Error> {
    if let Some(ref chat) = config.chat {
        return Ok(Arc::clone(chat));
    }

    let client = ChatClient::new(config)?;
    Ok(Arc::new(client))
}
