//! Decoder for the `<function_calls>` XML call format.
//!
//! ```text
//! <function_calls><invoke name="T"><parameter name="P">V</parameter>...</invoke></function_calls>
//! ```
//!
//! Parameter values are opaque text: no entity decoding, no nested tags.

use super::types::Parameters;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const OPEN_MARKER: &str = "<function_calls>";
pub const CLOSE_MARKER: &str = "</function_calls>";

const INVOKE_CLOSE: &str = "</invoke>";
const PARAMETER_CLOSE: &str = "</parameter>";

static INVOKE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<invoke\b([^>]*)>").expect("invoke tag regex must be valid"));
static PARAMETER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<parameter\b([^>]*)>").expect("parameter tag regex must be valid")
});
static NAME_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)name\s*=\s*"([^"]*)""#).expect("name attribute regex must be valid")
});

/// True when the text carries both wrapper markers.
///
/// This is the completion rule for the XML format: once both are present the
/// payload is treated as a call and anything wrong with it is a parse error.
pub fn has_markers(text: &str) -> bool {
    text.contains(OPEN_MARKER) && text.contains(CLOSE_MARKER)
}

/// A decoded `<invoke>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoke {
    pub name: String,
    pub parameters: Parameters,
}

/// Decode a framed payload. The error string is a human-readable reason.
pub fn parse(text: &str) -> Result<Invoke, String> {
    let open = text
        .find(OPEN_MARKER)
        .ok_or_else(|| format!("missing {OPEN_MARKER} marker"))?;
    let body_start = open + OPEN_MARKER.len();
    let body_end = text[body_start..]
        .find(CLOSE_MARKER)
        .map(|pos| body_start + pos)
        .ok_or_else(|| format!("mismatched wrapper tags: {CLOSE_MARKER} before {OPEN_MARKER}"))?;
    let body = &text[body_start..body_end];

    let Some(invoke) = INVOKE_TAG.captures(body) else {
        return Err("missing invoke element".to_string());
    };
    let Some(tag) = invoke.get(0) else {
        return Err("missing invoke element".to_string());
    };
    let attrs = attr_text(&invoke);
    let name = name_attr(attrs).ok_or_else(|| "missing function name".to_string())?;

    // `<invoke name="x"/>` has no children and no closing tag.
    let (parameters, invoke_end) = if attrs.trim_end().ends_with('/') {
        (Parameters::new(), tag.end())
    } else {
        parse_parameters(body, tag.end(), &name)?
    };

    let extra = INVOKE_TAG.find_iter(&body[invoke_end..]).count();
    if extra > 0 {
        return Err(format!("multiple invokes ({}) in one call block", extra + 1));
    }

    Ok(Invoke { name, parameters })
}

/// Read `<parameter>` children from `start` up to the invoke's closing tag.
///
/// Returns the parameters and the offset just past `</invoke>`.
fn parse_parameters(
    body: &str,
    start: usize,
    invoke: &str,
) -> Result<(Parameters, usize), String> {
    let mut parameters = Parameters::new();
    let mut cursor = start;

    loop {
        let close = body[cursor..].find(INVOKE_CLOSE).map(|pos| cursor + pos);
        // A parameter tag only counts if it opens before the invoke closes.
        let next = PARAMETER_TAG.captures_at(body, cursor).filter(|caps| {
            let start = caps.get(0).map_or(usize::MAX, |m| m.start());
            close.is_none_or(|close| start < close)
        });

        let Some(caps) = next else {
            let close = close.ok_or_else(|| format!("unclosed invoke element for '{invoke}'"))?;
            return Ok((parameters, close + INVOKE_CLOSE.len()));
        };
        let Some(tag) = caps.get(0) else {
            return Err(format!("unclosed invoke element for '{invoke}'"));
        };
        let attrs = attr_text(&caps);
        let name =
            name_attr(attrs).ok_or_else(|| "parameter without a name attribute".to_string())?;

        if attrs.trim_end().ends_with('/') {
            parameters.insert(name, Value::String(String::new()));
            cursor = tag.end();
            continue;
        }

        let value_start = tag.end();
        let value_len = body[value_start..]
            .find(PARAMETER_CLOSE)
            .ok_or_else(|| format!("unclosed parameter '{name}'"))?;
        let value = &body[value_start..value_start + value_len];
        parameters.insert(name, Value::String(value.to_string()));
        cursor = value_start + value_len + PARAMETER_CLOSE.len();
    }
}

fn attr_text<'t>(caps: &regex::Captures<'t>) -> &'t str {
    caps.get(1).map_or("", |m| m.as_str())
}

fn name_attr(attrs: &str) -> Option<String> {
    NAME_ATTR
        .captures(attrs)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
