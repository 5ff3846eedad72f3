//! # w9-extract
//!
//! Extract structured data from scanned W-9 tax forms by combining a
//! document-layout analysis service with a chat-completion LLM call.
//!
//! ## Why this crate?
//!
//! Scanned tax forms defeat plain OCR: the interesting signal is not just the
//! text but *which checkbox is ticked next to which label*, and LLM replies to
//! extraction prompts are free-form JSON-ish text with misspelled, re-cased,
//! or re-separated keys. This crate owns the data-shaping logic between the
//! two managed services: geometric association of checkboxes to their labels,
//! prompt construction, and fuzzy-match normalisation of the model reply onto
//! a fixed eleven-field record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Layout     submit to layout analysis, poll for lines + marks
//!  ├─ 2. Associate  nearest-line label for every checkbox
//!  ├─ 3. Prompt     fixed-schema instruction embedding text + checkboxes
//!  ├─ 4. Complete   chat-completion call with retry/backoff
//!  ├─ 5. Reply      isolate the first {...} object from surrounding prose
//!  └─ 6. Normalise  fuzzy key matching → validated W9Record
//! ```
//!
//! One record is produced per input file; a failure at any stage becomes an
//! error record for that file and the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use w9_extract::{extract_batch, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .layout_endpoint("https://example.cognitiveservices.azure.com")
//!         .layout_key("…")
//!         .llm_endpoint("https://example.openai.azure.com")
//!         .llm_token("…")
//!         .build()?;
//!     let outcomes = extract_batch(&["form.pdf".into()], &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&outcomes)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `w9x` binary and the axum HTTP layer |
//!
//! Disable `server` when using only the library:
//! ```toml
//! w9-extract = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AuthConfig, ExtractionConfig, ExtractionConfigBuilder};
pub use error::{DocError, W9Error};
pub use extract::extract_batch;
pub use output::{BatchOutput, DocumentOutcome, DocumentResponse, W9Record};
pub use pipeline::layout::{AnalyzeResult, LayoutAnalyzer, Page, SelectionMark, SelectionState, TextLine};
pub use pipeline::llm::ChatModel;
