//! Streaming tool-call buffer.
//!
//! Fragments arrive as deltas tagged with a content-block index. Nothing is
//! parsed until the block's stop event, so a call is never dispatched from a
//! partial payload.

mod classify;
mod json;
mod types;
mod xml;


pub use classify::{classify, detect};
pub use types::{BufferState, CallResult, Parameters, ParsedToolCall, PendingCall, WireFormat};
pub use xml::{CLOSE_MARKER, OPEN_MARKER};

use crate::config::{DEFAULT_FALLBACK_TOOL, DEFAULT_MAX_ATTEMPTS};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Settings a buffer is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Threshold for [`StreamingToolCallBuffer::should_break_default`].
    pub max_attempts: u32,
    /// Tool name used for JSON payloads that do not name one.
    pub fallback_tool: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fallback_tool: DEFAULT_FALLBACK_TOOL.to_string(),
        }
    }
}

/// Accumulates fragments per content-block index and finalizes them on stop.
///
/// Intended to be owned by one response-processing routine for the lifetime
/// of one response.
#[derive(Debug, Default)]
pub struct StreamingToolCallBuffer {
    pending: HashMap<usize, PendingCall>,
    attempts: u32,
    config: BufferConfig,
}

impl StreamingToolCallBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BufferConfig) -> Self {
        Self {
            pending: HashMap::new(),
            attempts: 0,
            config,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Append a fragment to the block at `index`, opening it if needed.
    ///
    /// `tool_use_id` is recorded only if the block has none yet.
    pub fn on_delta(
        &mut self,
        index: usize,
        fragment: &str,
        tool_use_id: Option<&str>,
    ) -> BufferState {
        let pending = self.get_or_insert(index);
        pending.set_tool_use_id(tool_use_id);
        pending.push(fragment);

        let looks_complete = looks_complete(&pending.raw_buffer);
        trace!(index, len = pending.raw_buffer.len(), looks_complete, "Buffered delta");

        BufferState {
            index,
            text: pending.raw_buffer.clone(),
            looks_complete,
        }
    }

    /// Open the block at `index` with metadata from a block-start event.
    ///
    /// The announced name is authoritative: the block's JSON is taken as the
    /// tool's input, and `tool`/`name` keys inside it are ordinary parameters.
    pub fn on_block_start(&mut self, index: usize, tool_use_id: Option<&str>, tool_name: &str) {
        let pending = self.get_or_insert(index);
        pending.set_tool_use_id(tool_use_id);
        if pending.block_tool_name.is_none() && !tool_name.is_empty() {
            pending.block_tool_name = Some(tool_name.to_string());
        }
    }

    /// Finalize the block at `index`. The entry is removed whatever the outcome.
    pub fn on_stop(&mut self, index: usize) -> CallResult {
        let Some(pending) = self.pending.remove(&index) else {
            return CallResult::Empty;
        };

        let result = classify(pending, &self.config.fallback_tool);
        if let CallResult::CompleteCall(call) = &result {
            self.attempts += 1;
            debug!(
                index,
                tool = %call.tool_name,
                format = %call.wire_format,
                attempts = self.attempts,
                "Emitting tool call"
            );
        }
        result
    }

    /// Finalize every open block in ascending index order.
    pub fn finish(&mut self) -> Vec<(usize, CallResult)> {
        let mut indices = self.open_indices();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|index| (index, self.on_stop(index)))
            .collect()
    }

    /// Peek at an open block.
    pub fn pending(&self, index: usize) -> Option<&PendingCall> {
        self.pending.get(&index)
    }

    pub fn open_indices(&self) -> Vec<usize> {
        self.pending.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of complete calls produced since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once `attempts >= max_attempts`: the caller should stop issuing
    /// further tool calls this turn.
    pub fn should_break(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }

    /// [`Self::should_break`] with the configured threshold.
    pub fn should_break_default(&self) -> bool {
        self.should_break(self.config.max_attempts)
    }

    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
    }

    fn get_or_insert(&mut self, index: usize) -> &mut PendingCall {
        self.pending
            .entry(index)
            .or_insert_with(|| PendingCall::new(index))
    }
}

/// Display-only completeness guess for a partial buffer.
fn looks_complete(text: &str) -> bool {
    detect(text).is_some() || json::looks_complete(text)
}
