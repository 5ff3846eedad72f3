//! Error types for the w9-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`W9Error`] — **Fatal**: the batch cannot run at all (no collaborator
//!   configured, token acquisition failed, server could not bind). Returned
//!   as `Err(W9Error)` from the top-level entry points.
//!
//! * [`DocError`] — **Non-fatal**: a single document failed (unreadable file,
//!   garbled model reply, transient API error) but the rest of the batch is
//!   fine. Converted into the `{error: …}` payload of a
//!   [`crate::output::DocumentOutcome`] so callers always receive exactly one
//!   outcome per input, in input order.
//!
//! Every per-document failure path emits an error record. The batch length
//! invariant (`outputs.len() == inputs.len()`) holds unconditionally.

use thiserror::Error;

/// All fatal errors returned by the w9-extract library.
///
/// Per-document failures use [`DocError`] and are stored in
/// [`crate::output::DocumentOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum W9Error {
    /// Builder validation failed or a required collaborator is missing.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// OAuth2 client-credentials token acquisition failed.
    #[error("Token acquisition failed: {detail}")]
    Auth { detail: String },

    /// Could not bind or serve the HTTP listener.
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored (stringified) inside the outcome for the failing file. The overall
/// batch always continues to the next document.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocError {
    /// Input file could not be read.
    #[error("could not read input file: {detail}")]
    Read { detail: String },

    /// Layout analysis returned a page-less result.
    #[error("layout analysis returned no pages")]
    NoPages,

    /// Layout analysis call failed (network, auth, service-side rejection).
    #[error("layout analysis failed: {detail}")]
    Layout { detail: String },

    /// Chat-completion call failed after all retries.
    #[error("LLM call failed after {retries} retries: {detail}")]
    Llm { retries: u32, detail: String },

    /// Model reply contained no `{…}` JSON object span.
    #[error("model reply contains no JSON object")]
    MalformedReply,

    /// The isolated `{…}` span did not parse as a JSON object.
    #[error("model reply is not valid JSON: {detail}")]
    InvalidJson { detail: String },

    /// The normalised mapping could not be coerced into the record shape.
    #[error("record validation failed: {detail}")]
    Validation { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_display_carries_retry_count() {
        let e = DocError::Llm {
            retries: 3,
            detail: "HTTP 429".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 retries"), "got: {msg}");
        assert!(msg.contains("429"));
    }

    #[test]
    fn doc_error_serialises_for_diagnostics() {
        let e = DocError::Validation {
            detail: "ein is an array".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("Validation"));
    }

    #[test]
    fn no_pages_display() {
        assert_eq!(DocError::NoPages.to_string(), "layout analysis returned no pages");
    }
}
