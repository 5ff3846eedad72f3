//! Model-reply envelope handling: isolate and parse the JSON object.
//!
//! The prompt mandates JSON-only output, and models disobey anyway — they
//! preface the object with "Here is the result:" or append pleasantries.
//! Everything outside the first `{` and the last `}` is discardable prose;
//! the span between them (inclusive) must be one well-formed JSON object.

use crate::error::DocError;
use serde_json::{Map, Value};

/// Slice out the `{…}` span of a raw model reply.
///
/// Fails with [`DocError::MalformedReply`] when no `{` exists or every `}`
/// precedes the first `{`.
pub fn isolate_object(raw: &str) -> Result<&str, DocError> {
    let start = raw.find('{').ok_or(DocError::MalformedReply)?;
    let end = raw.rfind('}').filter(|&e| e > start).ok_or(DocError::MalformedReply)?;
    Ok(&raw[start..=end])
}

/// Parse a raw model reply into its key/value mapping.
///
/// Fails with [`DocError::InvalidJson`] when the isolated span does not
/// parse, or parses to something other than an object.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, DocError> {
    let span = isolate_object(raw)?;
    let value: Value = serde_json::from_str(span).map_err(|e| DocError::InvalidJson {
        detail: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DocError::InvalidJson {
            detail: format!("expected a JSON object, got {}", type_name(&other)),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Here is the result:\n{\"name\":\"A\"}\nThanks!";
        assert_eq!(isolate_object(raw).unwrap(), "{\"name\":\"A\"}");

        let map = parse_object(raw).unwrap();
        assert_eq!(map["name"], "A");
    }

    #[test]
    fn reply_without_open_brace_is_malformed() {
        let err = parse_object("no json here").unwrap_err();
        assert!(matches!(err, DocError::MalformedReply));
    }

    #[test]
    fn close_brace_before_open_brace_is_malformed() {
        let err = parse_object("} oops {").unwrap_err();
        assert!(matches!(err, DocError::MalformedReply));
    }

    #[test]
    fn unparsable_span_is_invalid_json() {
        let err = parse_object("{not json}").unwrap_err();
        assert!(matches!(err, DocError::InvalidJson { .. }));
    }

    #[test]
    fn nested_objects_keep_the_outermost_span() {
        let raw = "prefix {\"a\": {\"b\": 1}} suffix";
        let map = parse_object(raw).unwrap();
        assert_eq!(map["a"]["b"], 1);
    }

    #[test]
    fn multibyte_prose_around_the_object_is_fine() {
        let raw = "Résultat — voilà : {\"name\":\"José\"} — merci ✓";
        let map = parse_object(raw).unwrap();
        assert_eq!(map["name"], "José");
    }
}
