//! Schema normalisation: fuzzy key matching onto the fixed W-9 vocabulary.
//!
//! Models return keys that are misspelled, re-cased, or re-separated
//! (`"Business_Name"`, `"zip-code"`, `"Entity Type"`). Each input key is
//! cleaned (trimmed, lowercased, separators collapsed to spaces) and scored
//! against the eleven expected keys with a normalised sequence-similarity
//! ratio; the best match wins when it clears the cutoff, and everything
//! below the cutoff is dropped outright — value included.
//!
//! Dropping is deliberate: the record carries exactly the eleven known
//! fields, so an unmatched key never leaks through under its original name.

use crate::error::DocError;
use crate::output::W9Record;
use serde_json::{Map, Value};
use tracing::debug;

/// The eleven field names the record carries, in declaration order.
///
/// Order matters: similarity ties resolve to the earlier entry.
pub const EXPECTED_KEYS: [&str; 11] = [
    "entity_type",
    "name",
    "business_name",
    "ein",
    "ssn",
    "address",
    "city",
    "state",
    "zip_code",
    "user_signed",
    "signed_date",
];

/// Minimum similarity for a cleaned key to claim an expected key.
const SIMILARITY_CUTOFF: f64 = 0.7;

/// Values of `user_signed` that canonicalise to `"Y"`.
const SIGNED_VALUES: [&str; 4] = ["yes", "y", "signed", "true"];

/// Trim, lowercase, and collapse `_`/`-` separators to spaces.
fn clean_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['_', '-'], " ")
}

/// Best expected key for an arbitrary input key, if any clears the cutoff.
fn best_match(key: &str) -> Option<&'static str> {
    let cleaned = clean_key(key);
    let mut best: Option<(&'static str, f64)> = None;
    for candidate in EXPECTED_KEYS {
        let score = strsim::normalized_levenshtein(&cleaned, candidate);
        if score >= SIMILARITY_CUTOFF && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(key, _)| key)
}

/// Remap an arbitrary parsed reply onto the expected-key vocabulary.
///
/// Keys with no match above the cutoff are dropped with their values. When
/// two input keys claim the same expected key, the later one wins.
pub fn normalize_keys(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = Map::new();
    for (key, value) in raw {
        match best_match(key) {
            Some(expected) => {
                normalized.insert(expected.to_string(), value.clone());
            }
            None => debug!("dropping unrecognised reply key {key:?}"),
        }
    }
    normalized
}

/// Build the validated record from a normalised mapping.
///
/// Scalar values coerce to strings (zip codes routinely arrive numeric);
/// arrays and objects fail validation. `user_signed` canonicalises to
/// exactly `"Y"` or `""`.
pub fn build_record(normalized: &Map<String, Value>) -> Result<W9Record, DocError> {
    Ok(W9Record {
        entity_type: field(normalized, "entity_type")?,
        name: field(normalized, "name")?,
        business_name: field(normalized, "business_name")?,
        ein: field(normalized, "ein")?,
        ssn: field(normalized, "ssn")?,
        address: field(normalized, "address")?,
        city: field(normalized, "city")?,
        state: field(normalized, "state")?,
        zip_code: field(normalized, "zip_code")?,
        user_signed: canonical_signed(normalized.get("user_signed")),
        signed_date: field(normalized, "signed_date")?,
    })
}

fn field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, DocError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(composite) => Err(DocError::Validation {
            detail: format!("field {key:?} is not a scalar: {composite}"),
        }),
    }
}

/// Canonicalise the `user_signed` indicator to `"Y"` or `""`.
fn canonical_signed(value: Option<&Value>) -> String {
    let affirmative = match value {
        Some(Value::String(s)) => SIGNED_VALUES.contains(&s.trim().to_lowercase().as_str()),
        Some(Value::Bool(b)) => *b,
        _ => false,
    };
    if affirmative { "Y".to_string() } else { String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn underscore_case_and_spacing_variants_match() {
        assert_eq!(best_match("Business_Name"), Some("business_name"));
        assert_eq!(best_match("  zip-code  "), Some("zip_code"));
        assert_eq!(best_match("Entity Type"), Some("entity_type"));
        assert_eq!(best_match("USER SIGNED"), Some("user_signed"));
        assert_eq!(best_match("ein"), Some("ein"));
    }

    #[test]
    fn dissimilar_keys_are_dropped() {
        assert_eq!(best_match("comments"), None);
        assert_eq!(best_match("frobnicator"), None);

        let normalized = normalize_keys(&obj(json!({
            "Business_Name": "Acme LLC",
            "comments": "should vanish"
        })));
        assert_eq!(normalized.get("business_name"), Some(&json!("Acme LLC")));
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn exact_key_beats_longer_cousin() {
        // "name" must map to name, not business_name.
        assert_eq!(best_match("name"), Some("name"));
        assert_eq!(best_match("Name"), Some("name"));
    }

    #[test]
    fn record_defaults_missing_fields_to_none() {
        let record = build_record(&obj(json!({"name": "Jane Doe"}))).unwrap();
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.ein, None);
        assert_eq!(record.user_signed, "");
    }

    #[test]
    fn numeric_zip_codes_coerce_to_strings() {
        let record = build_record(&obj(json!({"zip_code": 55343}))).unwrap();
        assert_eq!(record.zip_code.as_deref(), Some("55343"));
    }

    #[test]
    fn composite_values_fail_validation() {
        let err = build_record(&obj(json!({"ein": ["12", "3456789"]}))).unwrap_err();
        assert!(matches!(err, DocError::Validation { .. }));
    }

    #[test]
    fn user_signed_affirmatives_canonicalise_to_y() {
        for v in [json!("Yes"), json!("Y"), json!("signed"), json!("TRUE"), json!(true)] {
            let record = build_record(&obj(json!({"user_signed": v}))).unwrap();
            assert_eq!(record.user_signed, "Y", "value {v:?}");
        }
    }

    #[test]
    fn user_signed_everything_else_canonicalises_to_empty() {
        for v in [json!("no"), json!(""), json!("N"), json!(false), Value::Null] {
            let record = build_record(&obj(json!({"user_signed": v}))).unwrap();
            assert_eq!(record.user_signed, "", "value {v:?}");
        }
        let record = build_record(&Map::new()).unwrap();
        assert_eq!(record.user_signed, "");
    }

    #[test]
    fn later_duplicate_claim_wins() {
        // serde_json::Map preserves insertion order, so "Name " is visited
        // after "name" and overwrites it.
        let mut raw = Map::new();
        raw.insert("name".to_string(), json!("first"));
        raw.insert("Name ".to_string(), json!("second"));
        let normalized = normalize_keys(&raw);
        assert_eq!(normalized.get("name"), Some(&json!("second")));
    }

    #[test]
    fn full_reply_round_trip() {
        let normalized = normalize_keys(&obj(json!({
            "Entity-Type": "Individual",
            "name": "Jane Doe",
            "Business_Name": "Acme LLC",
            "EIN": "12-3456789",
            "zip code": "55343",
            "User_Signed": "yes",
            "signed date": "2024-01-15",
            "confidence": 0.97
        })));
        let record = build_record(&normalized).unwrap();
        assert_eq!(record.entity_type.as_deref(), Some("Individual"));
        assert_eq!(record.business_name.as_deref(), Some("Acme LLC"));
        assert_eq!(record.ein.as_deref(), Some("12-3456789"));
        assert_eq!(record.zip_code.as_deref(), Some("55343"));
        assert_eq!(record.user_signed, "Y");
        assert_eq!(record.signed_date.as_deref(), Some("2024-01-15"));
        // "confidence" clears 0.7 against nothing; it must not reappear.
        assert_eq!(serde_json::to_value(&record).unwrap().as_object().unwrap().len(), 11);
    }
}
