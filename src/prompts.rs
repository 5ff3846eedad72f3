//! Prompts for W-9 field extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the eleven key names below are a hard
//!    contract with [`crate::pipeline::normalize`]; changing one without the
//!    other silently degrades every extraction.
//!
//! 2. **Testability** — unit tests can inspect the built prompt directly
//!    without a live model call.
//!
//! The model is *asked* for JSON-only output but cannot be forced; reply
//! parsing stays defensive regardless.

use crate::pipeline::associate::CheckboxAssociation;
use crate::pipeline::layout::TextLine;
use std::fmt::Write;

/// System message for the extraction call.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts W9 tax form data.";

/// Build the user prompt embedding the page text and checkbox states.
///
/// Exactly two variable blocks: the line contents joined by newline in the
/// layout service's reading order (the associator never reorders lines),
/// and one `Checkbox labeled '…' is …` line per association.
pub fn build_user_prompt(lines: &[TextLine], checkboxes: &[CheckboxAssociation]) -> String {
    let extracted_text = lines
        .iter()
        .map(|l| l.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut checkbox_text = String::new();
    for (i, b) in checkboxes.iter().enumerate() {
        if i > 0 {
            checkbox_text.push('\n');
        }
        let _ = write!(checkbox_text, "Checkbox labeled '{}' is {}", b.label, b.state);
    }

    format!(
        r#"You are an expert assistant that extracts structured data from W9 tax forms.
Return only the result in valid JSON format. Do NOT add any explanation or surrounding text.
Use the exact key names below (spelling and casing matters):

{{
  "entity_type": "",
  "name": "",
  "business_name": "",
  "ein": "",
  "ssn": "",
  "address": "",
  "city": "",
  "state": "",
  "zip_code": "",
  "user_signed": "Y" if signed, "" otherwise,
  "signed_date": ""
}}

Below is the content of the form:
{extracted_text}

Below are the checkbox states:
{checkbox_text}

Only return JSON do not add explanations
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::SelectionState;
    use crate::pipeline::normalize::EXPECTED_KEYS;

    #[test]
    fn prompt_enumerates_every_expected_key() {
        let prompt = build_user_prompt(&[], &[]);
        for key in EXPECTED_KEYS {
            assert!(prompt.contains(&format!("\"{key}\"")), "missing key {key}");
        }
    }

    #[test]
    fn prompt_embeds_lines_in_reading_order() {
        let lines = vec![
            TextLine { content: "Form W-9".into(), polygon: vec![] },
            TextLine { content: "Request for Taxpayer".into(), polygon: vec![] },
        ];
        let prompt = build_user_prompt(&lines, &[]);
        assert!(prompt.contains("Form W-9\nRequest for Taxpayer"));
    }

    #[test]
    fn prompt_formats_checkbox_states() {
        let boxes = vec![
            CheckboxAssociation { label: "Individual".into(), state: SelectionState::Selected },
            CheckboxAssociation { label: "".into(), state: SelectionState::Unselected },
        ];
        let prompt = build_user_prompt(&[], &boxes);
        assert!(prompt.contains("Checkbox labeled 'Individual' is selected"));
        assert!(prompt.contains("Checkbox labeled '' is unselected"));
    }
}
