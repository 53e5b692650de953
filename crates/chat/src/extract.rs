//! Split a model reply into human-readable text and a filters object.

use crate::repair::parse_json_blob;
use ragchat_core::AppResult;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// What to do when the structured part of a reply cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractMode {
    /// Fall back to empty filters.
    #[default]
    Lenient,
    /// Return an extraction error.
    Strict,
}

impl ExtractMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Prose and filters recovered from one model reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedAnswer {
    pub human_text: String,
    pub filters: Map<String, Value>,
}

/// Extract prose and filters from a raw model reply.
///
/// A fenced block whose body is a valid JSON object wins; otherwise the
/// reply is split at its first `{`. The `"filters"` key of the parsed object
/// is returned when present, else the whole object.
pub fn extract(raw: &str, mode: ExtractMode) -> AppResult<ExtractedAnswer> {
    if let Some((human_text, value)) = fenced_object(raw) {
        return Ok(ExtractedAnswer {
            human_text,
            filters: filters_of(value),
        });
    }

    let Some(start) = raw.find('{') else {
        return Ok(ExtractedAnswer {
            human_text: raw.trim().to_string(),
            filters: Map::new(),
        });
    };

    let filters = match parse_json_blob(&raw[start..]) {
        Ok(value) => filters_of(value),
        Err(e) => match mode {
            ExtractMode::Strict => return Err(e),
            ExtractMode::Lenient => {
                warn!("Could not parse filters from model output: {}", e);
                Map::new()
            }
        },
    };

    Ok(ExtractedAnswer {
        human_text: raw[..start].trim().to_string(),
        filters,
    })
}

/// The first fenced block, if its body parses as a JSON object as-is:
/// (text outside the fence, parsed body).
fn fenced_object(raw: &str) -> Option<(String, Value)> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    let tag_len = after_open
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_open.len());
    let inner = &after_open[tag_len..];
    let close = inner.find("```")?;

    // A closing fence inside a string value cuts the body short; leave
    // those replies to the brace split.
    let value = serde_json::from_str::<Value>(inner[..close].trim()).ok()?;
    if !value.is_object() {
        return None;
    }

    let outside = [raw[..open].trim(), inner[close + 3..].trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Some((outside, value))
}

fn filters_of(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(mut map) => match map.remove("filters") {
            Some(Value::Object(filters)) => filters,
            Some(_) => Map::new(),
            None => map,
        },
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::AppError;
    use serde_json::json;

    fn lenient(raw: &str) -> ExtractedAnswer {
        extract(raw, ExtractMode::Lenient).unwrap()
    }

    #[test]
    fn test_no_brace_is_all_prose() {
        let answer = lenient("  No structured data available.  ");
        assert_eq!(answer.human_text, "No structured data available.");
        assert!(answer.filters.is_empty());
    }

    #[test]
    fn test_splits_at_first_brace() {
        let answer = lenient("Here is info {\"filters\": {\"industry\": \"tech\"}}");
        assert_eq!(answer.human_text, "Here is info");
        assert_eq!(Value::Object(answer.filters), json!({"industry": "tech"}));
    }

    #[test]
    fn test_object_without_filters_key() {
        let answer = lenient("Summary. {\"location\": [\"Austin\"]}");
        assert_eq!(answer.human_text, "Summary.");
        assert_eq!(Value::Object(answer.filters), json!({"location": ["Austin"]}));
    }

    #[test]
    fn test_non_object_filters_value() {
        let answer = lenient("x {\"filters\": [\"a\"]}");
        assert!(answer.filters.is_empty());
    }

    #[test]
    fn test_fenced_block_preferred() {
        let raw = "Fintech firms in Texas are a good fit {see below}.\n\n```json\n{\n  \"filters\": {\"industry\": [\"Fintech\"], \"location\": [\"Texas\"]}\n}\n```\nAnything else?";
        let answer = lenient(raw);
        assert_eq!(
            answer.human_text,
            "Fintech firms in Texas are a good fit {see below}.\nAnything else?"
        );
        assert_eq!(answer.filters["industry"], json!(["Fintech"]));
        assert_eq!(answer.filters["location"], json!(["Texas"]));
    }

    #[test]
    fn test_fence_without_object_falls_back() {
        let answer = lenient("Run `ls`:\n```sh\nls -la\n```\nthen {\"a\": 1}");
        assert_eq!(Value::Object(answer.filters), json!({"a": 1}));
        assert!(answer.human_text.ends_with("then"));
    }

    #[test]
    fn test_fence_inside_string_value_uses_brace_split() {
        let answer = lenient("See ``` {\"a\": \"x```y\"}");
        assert_eq!(answer.human_text, "See ```");
        assert_eq!(Value::Object(answer.filters), json!({"a": "x```y"}));
    }

    #[test]
    fn test_fenced_broken_json_uses_brace_split() {
        let answer = lenient("Matches:\n```json\n{\"industry\": [\"Retail\",]}\n```");
        assert_eq!(answer.human_text, "Matches:\n```json");
        assert_eq!(answer.filters["industry"], json!(["Retail"]));
    }

    #[test]
    fn test_repairs_broken_json() {
        let answer = lenient("Results:\n{\"filters\": {\"industry\": [\"Retail\",], \"location\": [\"Ohio\"");
        assert_eq!(answer.human_text, "Results:");
        assert_eq!(answer.filters["industry"], json!(["Retail"]));
        assert_eq!(answer.filters["location"], json!(["Ohio"]));
    }

    #[test]
    fn test_lenient_unrepairable_is_empty() {
        let answer = lenient("Text {::}");
        assert_eq!(answer.human_text, "Text");
        assert!(answer.filters.is_empty());
    }

    #[test]
    fn test_strict_unrepairable_is_error() {
        let err = extract("Text {::}", ExtractMode::Strict).unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_mode_from_strict() {
        assert_eq!(ExtractMode::from_strict(true), ExtractMode::Strict);
        assert_eq!(ExtractMode::from_strict(false), ExtractMode::Lenient);
        assert_eq!(ExtractMode::default(), ExtractMode::Lenient);
    }
}
