//! Parameter validation and synonym recovery for known tools.
//!
//! Models routinely emit `{"cmd": ...}` or `{"bash": ...}` where the shell
//! tool expects `command`. For the small set of tools listed here a missing
//! canonical field is recovered from a fixed list of alternates before the
//! call is rejected.

use crate::buffer::{Parameters, ParsedToolCall};
use crate::config::ToolNames;
use serde::Serialize;
use serde_json::Value;

/// Tools with known parameter requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownTool {
    /// Shell command execution (`dc_bash`).
    Shell,
    /// Pointer/keyboard control (`dc_computer`).
    Computer,
    /// File viewing and editing (`dc_str_replace_editor`).
    Editor,
}

/// Required fields and recovery sources for one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolRule {
    pub required: &'static [&'static str],
    /// Alternates for the first required field, in priority order.
    pub synonyms: &'static [&'static str],
}

impl KnownTool {
    pub fn rule(self) -> ToolRule {
        match self {
            Self::Shell => ToolRule {
                required: &["command"],
                synonyms: &["cmd", "bash", "shell", "terminal", "exec"],
            },
            Self::Computer => ToolRule {
                required: &["action"],
                synonyms: &["operation", "type", "function", "command"],
            },
            // Both fields are mandatory, nothing is guessed.
            Self::Editor => ToolRule {
                required: &["command", "path"],
                synonyms: &[],
            },
        }
    }

    /// Resolve a tool identifier against the configured names.
    pub fn from_name(name: &str, names: &ToolNames) -> Option<Self> {
        if name == names.shell {
            Some(Self::Shell)
        } else if name == names.computer {
            Some(Self::Computer)
        } else if name == names.editor {
            Some(Self::Editor)
        } else {
            None
        }
    }
}

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub ok: bool,
    pub message: String,
    /// Original parameters plus any recovered canonical keys.
    pub parameters: Parameters,
}

/// Validate `parameters` for `tool_name` using the default tool identifiers.
pub fn validate(tool_name: &str, parameters: &Parameters) -> Validation {
    validate_with(tool_name, parameters, &ToolNames::default())
}

/// Validate a parsed call using the default tool identifiers.
pub fn validate_call(call: &ParsedToolCall) -> Validation {
    validate(&call.tool_name, &call.parameters)
}

/// Validate `parameters` for `tool_name`, resolving the tool via `names`.
///
/// Unknown tools pass unchanged. Pure: the input mapping is not modified.
pub fn validate_with(tool_name: &str, parameters: &Parameters, names: &ToolNames) -> Validation {
    let Some(tool) = KnownTool::from_name(tool_name, names) else {
        return Validation {
            ok: true,
            message: format!("No parameter rules for {tool_name}"),
            parameters: parameters.clone(),
        };
    };

    let rule = tool.rule();
    let mut repaired = parameters.clone();
    let mut recovered = None;

    if let Some(&primary) = rule.required.first()
        && !is_present(&repaired, primary)
        && let Some((source, value)) = rule
            .synonyms
            .iter()
            .find_map(|key| present(&repaired, key).map(|v| (*key, v.clone())))
    {
        repaired.insert(primary.to_string(), value);
        recovered = Some((primary, source));
    }

    let missing: Vec<&str> = rule
        .required
        .iter()
        .copied()
        .filter(|key| !is_present(&repaired, key))
        .collect();

    if !missing.is_empty() {
        let fields = missing
            .iter()
            .map(|key| format!("'{key}'"))
            .collect::<Vec<_>>()
            .join(", ");
        return Validation {
            ok: false,
            message: format!("Missing required parameter {fields} for {tool_name}"),
            parameters: parameters.clone(),
        };
    }

    let message = match recovered {
        Some((primary, source)) => format!("Recovered '{primary}' from '{source}' for {tool_name}"),
        None => format!("Valid parameters for {tool_name}"),
    };
    Validation {
        ok: true,
        message,
        parameters: repaired,
    }
}

/// A key counts as present unless absent or `null`.
fn present<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a Value> {
    parameters.get(key).filter(|value| !value.is_null())
}

fn is_present(parameters: &Parameters, key: &str) -> bool {
    present(parameters, key).is_some()
}
