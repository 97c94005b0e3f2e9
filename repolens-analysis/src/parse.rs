//! Best-effort extraction of structured data from free-form model output.
//!
//! Models wrap JSON in code fences, surround it with prose, or stringify
//! nested payloads. The fallback ladder is deliberately concentrated in one
//! function so output-format drift only ever touches this module:
//!
//! 1. strip a surrounding code fence (optional `json` tag)
//! 2. direct JSON parse
//! 3. first-`{`-to-last-`}` (or bracket) substring parse
//! 4. recursive stringified-JSON unwrapping of every parsed string value
//! 5. fall back to Markdown or a tagged failure — the raw text is never
//!    dropped

use serde_json::Value;

/// Outcome of parsing a raw model reply. Never panics past this boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    /// The reply contained a JSON document (possibly fenced or embedded in
    /// prose), fully unwrapped.
    Json(Value),
    /// The reply is prose/Markdown with no embedded JSON document.
    Markdown(String),
    /// The reply looked like JSON but could not be parsed, or was empty.
    Failed { reason: String, raw: String },
}

/// Parse a raw model reply through the fallback ladder.
pub fn parse_model_output(raw: &str) -> ParsedOutput {
    if raw.trim().is_empty() {
        return ParsedOutput::Failed {
            reason: "empty response".to_string(),
            raw: raw.to_string(),
        };
    }

    let stripped = strip_code_fence(raw);

    let direct_err = match serde_json::from_str::<Value>(stripped) {
        Ok(value) => return ParsedOutput::Json(unwrap_stringified(value)),
        Err(e) => e,
    };

    // Tolerate prose before/after the JSON body.
    if let Some(candidate) = delimited_span(stripped, '{', '}')
        .or_else(|| delimited_span(stripped, '[', ']'))
        && let Ok(value) = serde_json::from_str::<Value>(candidate)
    {
        return ParsedOutput::Json(unwrap_stringified(value));
    }

    // Text that opens like JSON but never parses was meant to be JSON;
    // report the parse failure instead of pretending it is Markdown.
    if stripped.starts_with('{') || stripped.starts_with('[') {
        return ParsedOutput::Failed {
            reason: direct_err.to_string(),
            raw: raw.to_string(),
        };
    }

    ParsedOutput::Markdown(raw.to_string())
}

/// Strip a surrounding ``` fence and an optional json language tag.
fn strip_code_fence(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        t = rest;
        if let Some(rest) = t.strip_prefix("json").or_else(|| t.strip_prefix("JSON")) {
            t = rest;
        }
        if let Some(rest) = t.trim_end().strip_suffix("```") {
            t = rest;
        }
    }
    t.trim()
}

/// Substring from the first `open` to the last `close`, inclusive.
fn delimited_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Recursively materialize stringified JSON: any string value that itself
/// reads as a JSON object/array is replaced by its parse, depth-first, so
/// nested stringified payloads unwrap all the way down.
pub fn unwrap_stringified(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let t = s.trim();
            let looks_like_json = (t.starts_with('{') && t.ends_with('}'))
                || (t.starts_with('[') && t.ends_with(']'));
            if looks_like_json {
                match serde_json::from_str::<Value>(t) {
                    Ok(inner) => unwrap_stringified(inner),
                    Err(_) => Value::String(s),
                }
            } else {
                Value::String(s)
            }
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(unwrap_stringified).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, unwrap_stringified(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_json_parses() {
        assert_eq!(
            parse_model_output(r#"{"a": 1}"#),
            ParsedOutput::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn fenced_json_with_and_without_tag_parse_identically() {
        let tagged = "```json\n{\"a\": 1}\n```";
        let bare = "```\n{\"a\": 1}\n```";
        assert_eq!(parse_model_output(tagged), parse_model_output(bare));
        assert_eq!(parse_model_output(tagged), ParsedOutput::Json(json!({"a": 1})));
    }

    #[test]
    fn prose_wrapped_fenced_json_parses() {
        let raw = "Here is the result:\n```json\n{\"a\":1}\n```\nThanks";
        assert_eq!(parse_model_output(raw), ParsedOutput::Json(json!({"a": 1})));
    }

    #[test]
    fn prose_around_bare_json_parses_via_brace_scan() {
        let raw = "Sure! The answer is {\"items\": [1, 2]} — let me know.";
        assert_eq!(
            parse_model_output(raw),
            ParsedOutput::Json(json!({"items": [1, 2]}))
        );
    }

    #[test]
    fn empty_input_is_a_failure_not_a_panic() {
        match parse_model_output("   ") {
            ParsedOutput::Failed { reason, .. } => assert_eq!(reason, "empty response"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn plain_prose_falls_back_to_markdown() {
        let raw = "### Analysis\nNothing structured here.";
        assert_eq!(parse_model_output(raw), ParsedOutput::Markdown(raw.to_string()));
    }

    #[test]
    fn json_looking_garbage_reports_the_parse_failure() {
        match parse_model_output("{not json at all") {
            ParsedOutput::Failed { raw, .. } => assert_eq!(raw, "{not json at all"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn stringified_json_unwraps_recursively() {
        // A string containing a string containing an object.
        let inner = json!({"deep": true}).to_string();
        let middle = json!({"payload": inner}).to_string();
        let outer = json!({"result": middle});
        assert_eq!(
            unwrap_stringified(outer),
            json!({"result": {"payload": {"deep": true}}})
        );
    }

    #[test]
    fn non_json_strings_survive_unwrapping() {
        let value = json!({"note": "{unbalanced", "plain": "hello"});
        assert_eq!(unwrap_stringified(value.clone()), value);
    }

    #[test]
    fn unwrapping_applies_inside_arrays() {
        let value = json!(["[1, 2]", "text"]);
        assert_eq!(unwrap_stringified(value), json!([[1, 2], "text"]));
    }
}
