//! Output types: the validated record and per-document batch outcomes.

use serde::{Deserialize, Serialize};

/// The fixed eleven-field record extracted from one W-9 form.
///
/// All fields except `user_signed` are nullable strings; fields the model
/// did not return (or whose keys fell below the fuzzy-match cutoff) stay
/// `None` and serialise as `null`.
///
/// Invariant: `user_signed` is always exactly `"Y"` or `""` — canonicalised
/// by [`crate::pipeline::normalize::build_record`], never any other value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct W9Record {
    pub entity_type: Option<String>,
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub ein: Option<String>,
    pub ssn: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub user_signed: String,
    pub signed_date: Option<String>,
}

/// Payload of one batch entry: the record, or an error descriptor.
///
/// Serialises either as the record object or as `{"error": "…"}`, matching
/// what the frontend inspects (`success` is "no error key present").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentResponse {
    Data(W9Record),
    Error { error: String },
}

impl DocumentResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, DocumentResponse::Data(_))
    }
}

/// One entry of a batch result: the source file and its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub file: String,
    pub response: DocumentResponse,
}

/// Ordered batch result, exactly one entry per input file.
pub type BatchOutput = Vec<DocumentOutcome>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serialises_with_error_key() {
        let outcome = DocumentOutcome {
            file: "bad.pdf".into(),
            response: DocumentResponse::Error {
                error: "could not read input file".into(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["response"]["error"], "could not read input file");
        assert!(!outcome.response.is_success());
    }

    #[test]
    fn record_serialises_missing_fields_as_null() {
        let record = W9Record {
            name: Some("Jane Doe".into()),
            user_signed: "Y".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Jane Doe");
        assert_eq!(json["user_signed"], "Y");
        assert!(json["ein"].is_null());
        assert!(json["signed_date"].is_null());
    }
}
