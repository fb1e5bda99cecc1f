//! Decoder for JSON-shaped call payloads.

use super::types::Parameters;
use serde_json::Value;

/// Keys that may carry the tool name, first match wins.
const NAME_KEYS: [&str; 2] = ["tool", "name"];
/// Keys that may carry the parameter object, first match wins.
const PARAMETER_KEYS: [&str; 2] = ["parameters", "params"];

/// A call decoded from a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonCall {
    pub tool_name: String,
    pub parameters: Parameters,
    /// False when the name came from the fallback.
    pub named: bool,
}

/// Decode the whole text as one JSON object.
///
/// With `block_tool_name` the object is that tool's input, taken whole.
/// Without it the name and parameters are looked up by key, and the
/// fallback names calls that carry no name.
///
/// Returns `None` for invalid or truncated JSON, and for JSON values that are
/// not objects: those are ordinary text, not broken calls.
pub fn parse(
    text: &str,
    block_tool_name: Option<&str>,
    fallback_tool: &str,
) -> Option<JsonCall> {
    let Value::Object(object) = serde_json::from_str::<Value>(text).ok()? else {
        return None;
    };

    if let Some(name) = block_tool_name {
        return Some(JsonCall {
            tool_name: name.to_string(),
            parameters: object,
            named: true,
        });
    }

    let explicit = NAME_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string);
    let named = explicit.is_some();
    let tool_name = explicit.unwrap_or_else(|| fallback_tool.to_string());

    let parameters = PARAMETER_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_object))
        .cloned()
        .unwrap_or(object);

    Some(JsonCall {
        tool_name,
        parameters,
        named,
    })
}

/// Cheap shape check used for the `looks_complete` hint.
pub fn looks_complete(text: &str) -> bool {
    let trimmed = text.trim();
    let framed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    framed && serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FALLBACK: &str = "dc_bash";

    #[test]
    fn test_name_from_tool_key_before_name_key() {
        let call = parse(r#"{"name": "b", "tool": "a", "params": {"x": 1}}"#, None, FALLBACK).unwrap();
        assert_eq!(call.tool_name, "a");
        assert!(call.named);
        assert_eq!(Value::Object(call.parameters), json!({"x": 1}));
    }

    #[test]
    fn test_parameters_key_before_params_key() {
        let call = parse(
            r#"{"name": "t", "params": {"p": 2}, "parameters": {"q": 1}}"#,
            None,
            FALLBACK,
        )
        .unwrap();
        assert_eq!(Value::Object(call.parameters), json!({"q": 1}));
    }

    #[test]
    fn test_whole_object_is_parameters_without_params_key() {
        let call = parse(r#"{"tool": "dc_bash", "command": "pwd"}"#, None, FALLBACK).unwrap();
        assert_eq!(
            Value::Object(call.parameters),
            json!({"tool": "dc_bash", "command": "pwd"})
        );
    }

    #[test]
    fn test_fallback_names_unnamed_calls() {
        let call = parse(r#"{"command": "ls"}"#, None, FALLBACK).unwrap();
        assert_eq!(call.tool_name, FALLBACK);
        assert!(!call.named);
    }

    #[test]
    fn test_block_tool_name_takes_whole_object() {
        let call = parse(
            r#"{"name": "feature-x", "params": {"a": 1}, "base": "main"}"#,
            Some("create_branch"),
            FALLBACK,
        )
        .unwrap();
        assert_eq!(call.tool_name, "create_branch");
        assert!(call.named);
        assert_eq!(
            Value::Object(call.parameters),
            json!({"name": "feature-x", "params": {"a": 1}, "base": "main"})
        );
    }

    #[test]
    fn test_non_string_name_is_skipped() {
        let call = parse(r#"{"tool": 7, "name": "real"}"#, None, FALLBACK).unwrap();
        assert_eq!(call.tool_name, "real");
    }

    #[test]
    fn test_empty_object_is_a_call() {
        let call = parse("{}", None, FALLBACK).unwrap();
        assert_eq!(call.tool_name, FALLBACK);
        assert!(call.parameters.is_empty());
    }

    #[test]
    fn test_not_a_call() {
        assert!(parse(r#"{"command": "ls""#, None, FALLBACK).is_none());
        assert!(parse("hello there", None, FALLBACK).is_none());
        assert!(parse("", None, FALLBACK).is_none());
        assert!(parse("42", None, FALLBACK).is_none());
        assert!(parse(r#"["ls"]"#, None, FALLBACK).is_none());
    }

    #[test]
    fn test_looks_complete() {
        assert!(looks_complete(r#" {"a": 1} "#));
        assert!(!looks_complete(r#"{"a": 1"#));
        assert!(!looks_complete("plain"));
        assert!(!looks_complete("42"));
    }
}
