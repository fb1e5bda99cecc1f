#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod buffer;
pub mod cli;
pub mod config;
pub mod error;
pub mod stream;
pub mod validate;

pub use buffer::{BufferState, CallResult, ParsedToolCall, StreamingToolCallBuffer, WireFormat};
pub use error::{Error, Result};
pub use validate::{Validation, validate};
