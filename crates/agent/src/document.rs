//! Structured answer parsing for the extended (document) mode.
//!
//! The model is asked for a single JSON object. Providers still wrap it in
//! prose or code fences often enough that parsing falls back to extracting
//! the first balanced top-level object from the raw completion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of the requirements table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub validation: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub remarks: String,
}

/// Structured specification answer produced by the model in extended mode.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub as_is: String,
    #[serde(default)]
    pub to_be: String,
    #[serde(default)]
    pub requirements: Vec<RequirementRow>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("completion contained no JSON object")]
    NoJsonObject,
    #[error("structured answer failed to deserialize: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl DocumentSpec {
    /// Parse a completion into a structured document. Tries the whole text
    /// first, then the first balanced `{...}` block.
    pub fn parse(completion: &str) -> Result<Self, DocumentError> {
        let trimmed = completion.trim();
        match serde_json::from_str(trimmed) {
            Ok(spec) => Ok(spec),
            Err(direct_err) => {
                let block = first_json_object(trimmed).ok_or(DocumentError::NoJsonObject)?;
                serde_json::from_str(block).map_err(|_| DocumentError::Deserialize(direct_err))
            }
        }
    }
}

/// Locate the first balanced top-level JSON object, honoring string
/// literals and escapes so braces inside values do not confuse the scan.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::DocumentSpec;

    const CLEAN: &str = r#"{
        "title": "Leave Request Handling",
        "module": "HR Portal",
        "purpose": "Capture and route employee leave requests.",
        "as_is": "Requests arrive by email.",
        "to_be": "Requests are submitted through a form.",
        "requirements": [
            {
                "id": "FR-01",
                "description": "Employee submits a leave request",
                "field": "leave_type",
                "validation": "must be one of sick, casual",
                "source": "HR policy",
                "remarks": "-"
            }
        ],
        "assumptions": ["Employees have portal accounts"],
        "dependencies": ["Identity provider"],
        "risks": ["Policy changes mid-cycle"],
        "notes": "Initial draft."
    }"#;

    #[test]
    fn parses_a_clean_json_completion() {
        let spec = DocumentSpec::parse(CLEAN).unwrap();
        assert_eq!(spec.title, "Leave Request Handling");
        assert_eq!(spec.requirements.len(), 1);
        assert_eq!(spec.requirements[0].id, "FR-01");
    }

    #[test]
    fn extracts_the_object_from_surrounding_prose() {
        let wrapped = format!("Here is the document you asked for:\n```json\n{CLEAN}\n```\nLet me know.");
        let spec = DocumentSpec::parse(&wrapped).unwrap();
        assert_eq!(spec.module, "HR Portal");
    }

    #[test]
    fn braces_inside_string_values_do_not_break_extraction() {
        let tricky = r#"noise {"title": "Uses {braces} and \"quotes\"", "notes": "}"} trailing"#;
        let spec = DocumentSpec::parse(tricky).unwrap();
        assert_eq!(spec.title, "Uses {braces} and \"quotes\"");
        assert_eq!(spec.notes, "}");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let spec = DocumentSpec::parse(r#"{"title": "Only a title"}"#).unwrap();
        assert!(spec.requirements.is_empty());
        assert!(spec.purpose.is_empty());
    }

    #[test]
    fn prose_without_json_is_an_error() {
        assert!(DocumentSpec::parse("I could not produce a document.").is_err());
    }
}
