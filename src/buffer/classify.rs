//! Two-stage classification of a finished buffer.
//!
//! Stage one looks for the XML wrapper markers. When both are present the
//! payload is a call, and any structural problem is a [`CallResult::ParseError`].
//! Only when the markers are absent does stage two try JSON; a failed JSON
//! decode means the block was plain text.

use super::json;
use super::types::{CallResult, ParsedToolCall, PendingCall, WireFormat};
use super::xml;
use tracing::{debug, warn};

/// Format detected from the wrapper markers alone.
pub fn detect(text: &str) -> Option<WireFormat> {
    xml::has_markers(text).then_some(WireFormat::Xml)
}

/// Consume a finished buffer and decide what it was.
pub fn classify(pending: PendingCall, fallback_tool: &str) -> CallResult {
    let PendingCall {
        index,
        raw_buffer,
        tool_use_id,
        block_tool_name,
    } = pending;

    if detect(&raw_buffer) == Some(WireFormat::Xml) {
        return match xml::parse(&raw_buffer) {
            Ok(invoke) => CallResult::CompleteCall(ParsedToolCall {
                tool_name: invoke.name,
                parameters: invoke.parameters,
                tool_use_id,
                wire_format: WireFormat::Xml,
            }),
            Err(reason) => {
                warn!(index, %reason, "Malformed function_calls block");
                CallResult::ParseError {
                    reason,
                    raw_buffer,
                    tool_use_id,
                }
            }
        };
    }

    match json::parse(&raw_buffer, block_tool_name.as_deref(), fallback_tool) {
        Some(call) => {
            if !call.named {
                debug!(index, tool = %call.tool_name, "JSON call without a tool name");
            }
            CallResult::CompleteCall(ParsedToolCall {
                tool_name: call.tool_name,
                parameters: call.parameters,
                tool_use_id,
                wire_format: WireFormat::Json,
            })
        }
        None => CallResult::PlainText {
            raw_buffer,
            tool_use_id,
        },
    }
}
