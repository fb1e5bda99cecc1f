//! Types shared by the tool-call buffer.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Parameter mapping of a parsed call. Keys keep insertion order.
pub type Parameters = Map<String, Value>;

/// Which wire format a call was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `<function_calls><invoke name="..">..</invoke></function_calls>`
    Xml,
    /// A bare JSON object.
    Json,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml => f.write_str("xml"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Fragments accumulated for one open content block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCall {
    pub index: usize,
    pub raw_buffer: String,
    /// Correlation id from the wire protocol. Set once, never overwritten.
    pub tool_use_id: Option<String>,
    /// Tool name announced by a `tool_use` block start. When set, the
    /// payload is that tool's input object and carries no name of its own.
    pub block_tool_name: Option<String>,
}

impl PendingCall {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn push(&mut self, fragment: &str) {
        self.raw_buffer.push_str(fragment);
    }

    /// Record the id unless one was already seen for this block.
    pub fn set_tool_use_id(&mut self, id: Option<&str>) {
        if self.tool_use_id.is_none()
            && let Some(id) = id
        {
            self.tool_use_id = Some(id.to_string());
        }
    }
}

/// Snapshot returned after each delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferState {
    pub index: usize,
    pub text: String,
    /// Best-effort guess, for display only. Never dispatch on this.
    pub looks_complete: bool,
}

/// A fully parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedToolCall {
    pub tool_name: String,
    pub parameters: Parameters,
    pub tool_use_id: Option<String>,
    pub wire_format: WireFormat,
}

/// Outcome of finalizing one content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallResult {
    /// Nothing was buffered for the index.
    Empty,
    CompleteCall(ParsedToolCall),
    /// Framed like a call but structurally broken.
    ParseError {
        reason: String,
        raw_buffer: String,
        tool_use_id: Option<String>,
    },
    /// Ordinary streamed text.
    PlainText {
        raw_buffer: String,
        tool_use_id: Option<String>,
    },
}

impl CallResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_call(&self) -> Option<&ParsedToolCall> {
        match self {
            Self::CompleteCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn tool_use_id(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::CompleteCall(call) => call.tool_use_id.as_deref(),
            Self::ParseError { tool_use_id, .. } | Self::PlainText { tool_use_id, .. } => {
                tool_use_id.as_deref()
            }
        }
    }
}
