//! Drives a [`StreamingToolCallBuffer`] from Anthropic streaming events.
//!
//! Text and input-JSON deltas are buffered per content block; thinking and
//! signature deltas are dropped. A `content_block_stop` finalizes its block,
//! and `message_stop` drains anything still open.

pub mod events;
pub mod sse;

pub use events::{ContentBlockInfo, ContentDelta, StreamEvent};
pub use sse::{SseEvent, SseParser};

use crate::buffer::{CallResult, StreamingToolCallBuffer};
use std::collections::HashSet;
use std::io::Read;
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("API error: {error_type}: {message}")]
    Api { error_type: String, message: String },

    #[error("Invalid event at record {record}: {source}")]
    Decode {
        record: usize,
        source: serde_json::Error,
    },
}

/// Framing of a recorded event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InputFormat {
    /// `data:` frames separated by blank lines.
    Sse,
    /// One JSON event per line.
    Jsonl,
    /// Pick SSE if any line starts with `data:` or `event:`.
    #[default]
    Auto,
}

impl InputFormat {
    fn resolve(self, input: &str) -> Self {
        match self {
            Self::Auto => {
                let sse = input.lines().any(|line| {
                    let line = line.trim_start();
                    line.starts_with("data:") || line.starts_with("event:")
                });
                if sse { Self::Sse } else { Self::Jsonl }
            }
            other => other,
        }
    }
}

/// A finalized content block.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    pub index: usize,
    pub result: CallResult,
}

/// Applies stream events to a buffer.
#[derive(Debug, Default)]
pub struct StreamDriver {
    buffer: StreamingToolCallBuffer,
    /// Blocks opened by a `tool_use` start.
    tool_blocks: HashSet<usize>,
    message_id: Option<String>,
    stop_reason: Option<String>,
}

impl StreamDriver {
    pub fn new(buffer: StreamingToolCallBuffer) -> Self {
        Self {
            buffer,
            ..Self::default()
        }
    }

    pub fn buffer(&self) -> &StreamingToolCallBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut StreamingToolCallBuffer {
        &mut self.buffer
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    /// Apply one event, returning any blocks it finalized.
    pub fn handle(&mut self, event: StreamEvent) -> Result<Vec<Finalized>, StreamError> {
        match event {
            StreamEvent::MessageStart { message } => {
                debug!(id = %message.id, model = ?message.model, "Message start");
                self.message_id = Some(message.id);
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                ContentBlockInfo::Text { text } => {
                    self.buffer.on_delta(index, &text, None);
                }
                ContentBlockInfo::ToolUse { id, name } => {
                    self.buffer.on_block_start(index, Some(&id), &name);
                    self.tool_blocks.insert(index);
                }
                ContentBlockInfo::Thinking { .. } => {}
            },
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                ContentDelta::Text { text } => {
                    self.buffer.on_delta(index, &text, None);
                }
                ContentDelta::InputJson { partial_json } => {
                    self.buffer.on_delta(index, &partial_json, None);
                }
                ContentDelta::Thinking { .. } | ContentDelta::Signature { .. } => {
                    trace!(index, "Skipping thinking delta");
                }
            },
            StreamEvent::ContentBlockStop { index } => {
                return Ok(self.stop(index).into_iter().collect());
            }
            StreamEvent::MessageDelta { delta } => {
                self.stop_reason = delta.stop_reason;
            }
            StreamEvent::MessageStop => return Ok(self.finish()),
            StreamEvent::Ping => {}
            StreamEvent::Error { error } => {
                return Err(StreamError::Api {
                    error_type: error.error_type,
                    message: error.message,
                });
            }
        }
        Ok(Vec::new())
    }

    /// Finalize every block still open.
    pub fn finish(&mut self) -> Vec<Finalized> {
        let drained = self.buffer.finish();
        if !drained.is_empty() {
            warn!(count = drained.len(), "Finalizing blocks left open at stream end");
        }
        self.tool_blocks.clear();
        drained
            .into_iter()
            .filter(|(_, result)| !result.is_empty())
            .map(|(index, result)| Finalized { index, result })
            .collect()
    }

    fn stop(&mut self, index: usize) -> Option<Finalized> {
        // A tool_use block with no input deltas carries an empty object.
        if self.tool_blocks.remove(&index)
            && self
                .buffer
                .pending(index)
                .is_some_and(|p| p.raw_buffer.trim().is_empty())
        {
            self.buffer.on_delta(index, "{}", None);
        }

        let result = self.buffer.on_stop(index);
        (!result.is_empty()).then_some(Finalized { index, result })
    }
}

/// Outcome of [`replay`].
#[derive(Debug, Default)]
pub struct Replay {
    pub finalized: Vec<Finalized>,
    /// True when replay stopped early because the attempt limit was reached.
    pub halted: bool,
}

/// Decode a recorded stream into events.
///
/// Records that are not JSON are an error. JSON of an unknown event type is
/// skipped with a warning.
pub fn decode_events(input: &str, format: InputFormat) -> Result<Vec<StreamEvent>, StreamError> {
    let payloads: Vec<(usize, String)> = match format.resolve(input) {
        InputFormat::Sse => {
            let mut parser = SseParser::new();
            let mut frames = parser.feed(input);
            frames.extend(parser.finish());
            frames
                .into_iter()
                .enumerate()
                .filter(|(_, frame)| frame.data != "[DONE]")
                .map(|(n, frame)| (n + 1, frame.data))
                .collect()
        }
        InputFormat::Jsonl | InputFormat::Auto => input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| (n + 1, line.to_string()))
            .collect(),
    };

    let mut events = Vec::with_capacity(payloads.len());
    for (record, data) in payloads {
        let value: serde_json::Value = serde_json::from_str(&data)
            .map_err(|source| StreamError::Decode { record, source })?;
        match serde_json::from_value::<StreamEvent>(value) {
            Ok(event) => events.push(event),
            Err(e) => warn!(record, "Skipping unrecognized stream event: {e}"),
        }
    }
    Ok(events)
}

/// Run a recorded stream through `driver`.
///
/// Stops early once the buffer's attempt limit is reached. Blocks still open
/// at the end of the input are finalized.
pub fn replay(
    input: &str,
    format: InputFormat,
    driver: &mut StreamDriver,
) -> Result<Replay, StreamError> {
    let mut replay = Replay::default();

    for event in decode_events(input, format)? {
        replay.finalized.extend(driver.handle(event)?);
        if driver.buffer().should_break_default() {
            warn!(
                attempts = driver.buffer().attempts(),
                "Attempt limit reached, not processing further tool calls"
            );
            replay.halted = true;
            return Ok(replay);
        }
    }

    replay.finalized.extend(driver.finish());
    Ok(replay)
}

/// [`replay`] over everything readable from `reader`.
pub fn replay_reader<R: Read>(
    mut reader: R,
    format: InputFormat,
    driver: &mut StreamDriver,
) -> crate::Result<Replay> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    Ok(replay(&input, format, driver)?)
}
