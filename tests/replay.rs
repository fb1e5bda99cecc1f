//! End-to-end replay of recorded Anthropic streams.

use serde_json::{Value, json};
use std::fs::File;
use std::io::Write;
use toolcall_buffer::cli::{ReplayArgs, render_lines};
use toolcall_buffer::config::Config;
use toolcall_buffer::stream::{InputFormat, StreamDriver, replay_reader};
use toolcall_buffer::{CallResult, StreamingToolCallBuffer, WireFormat};

fn sse(events: &[Value]) -> String {
    events
        .iter()
        .map(|event| {
            let kind = event["type"].as_str().unwrap_or_default();
            format!("event: {kind}\ndata: {event}\n\n")
        })
        .collect()
}

fn text_delta(index: usize, text: &str) -> Value {
    json!({"type": "content_block_delta", "index": index, "delta": {"type": "text_delta", "text": text}})
}

fn recording() -> Vec<Value> {
    vec![
        json!({"type": "message_start", "message": {"id": "msg_1", "model": "claude-sonnet-4"}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        text_delta(0, "Listing files. <function_calls><invoke name=\"dc_bash\">"),
        json!({"type": "content_block_start", "index": 1,
               "content_block": {"type": "tool_use", "id": "toolu_01", "name": "dc_str_replace_editor"}}),
        json!({"type": "content_block_delta", "index": 1,
               "delta": {"type": "input_json_delta", "partial_json": "{\"command\": \"vi"}}),
        text_delta(0, "<parameter name=\"cmd\">ls -la</parameter>"),
        json!({"type": "content_block_delta", "index": 1,
               "delta": {"type": "input_json_delta", "partial_json": "ew\"}"}}),
        json!({"type": "ping"}),
        text_delta(0, "</invoke></function_calls>"),
        json!({"type": "content_block_stop", "index": 1}),
        json!({"type": "content_block_stop", "index": 0}),
        text_delta(2, "Done."),
        json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 9}}),
        json!({"type": "message_stop"}),
    ]
}

fn replay_args(validate: bool) -> ReplayArgs {
    ReplayArgs {
        file: None,
        format: InputFormat::Auto,
        validate,
        calls_only: false,
    }
}

#[test]
fn replays_interleaved_sse_recording_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(sse(&recording()).as_bytes()).unwrap();

    let mut driver = StreamDriver::new(StreamingToolCallBuffer::new());
    let replay = replay_reader(File::open(file.path()).unwrap(), InputFormat::Auto, &mut driver)
        .unwrap();

    assert!(!replay.halted);
    assert_eq!(driver.message_id(), Some("msg_1"));
    assert_eq!(driver.stop_reason(), Some("tool_use"));
    assert!(driver.buffer().is_empty());

    let indices: Vec<usize> = replay.finalized.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![1, 0, 2]);

    let editor = replay.finalized[0].result.as_call().unwrap();
    assert_eq!(editor.tool_name, "dc_str_replace_editor");
    assert_eq!(editor.tool_use_id.as_deref(), Some("toolu_01"));
    assert_eq!(editor.wire_format, WireFormat::Json);

    let bash = replay.finalized[1].result.as_call().unwrap();
    assert_eq!(bash.tool_name, "dc_bash");
    assert_eq!(bash.wire_format, WireFormat::Xml);
    assert_eq!(bash.parameters["cmd"], "ls -la");

    assert!(matches!(
        &replay.finalized[2].result,
        CallResult::PlainText { raw_buffer, .. } if raw_buffer == "Done."
    ));
    assert_eq!(driver.buffer().attempts(), 2);
}

#[test]
fn renders_validation_alongside_calls() {
    let mut driver = StreamDriver::new(StreamingToolCallBuffer::new());
    let replay = replay_reader(sse(&recording()).as_bytes(), InputFormat::Sse, &mut driver).unwrap();

    let lines = render_lines(&replay, &replay_args(true), &Config::default()).unwrap();
    let values: Vec<Value> = lines
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(values.len(), 3);

    // The editor call lacks `path`, which cannot be recovered.
    assert_eq!(values[0]["kind"], "complete_call");
    assert_eq!(values[0]["validation"]["ok"], false);

    // `cmd` is recovered as `command` for the shell tool.
    assert_eq!(values[1]["index"], 0);
    assert_eq!(values[1]["validation"]["ok"], true);
    assert_eq!(values[1]["validation"]["parameters"]["command"], "ls -la");

    assert_eq!(values[2]["kind"], "plain_text");
    assert!(values[2].get("validation").is_none());
}

#[test]
fn calls_only_hides_plain_text() {
    let mut driver = StreamDriver::new(StreamingToolCallBuffer::new());
    let replay = replay_reader(sse(&recording()).as_bytes(), InputFormat::Auto, &mut driver).unwrap();

    let args = ReplayArgs {
        calls_only: true,
        ..replay_args(false)
    };
    let lines = render_lines(&replay, &args, &Config::default()).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| !line.contains("validation")));
}

#[test]
fn jsonl_recording_halts_at_configured_limit() {
    let config = Config::parse("max_attempts = 1").unwrap();
    let input: String = recording()
        .iter()
        .map(|event| format!("{event}\n"))
        .collect();

    let mut driver = StreamDriver::new(StreamingToolCallBuffer::with_config(config.buffer_config()));
    let replay = replay_reader(input.as_bytes(), InputFormat::Jsonl, &mut driver).unwrap();

    assert!(replay.halted);
    assert_eq!(replay.finalized.len(), 1);
    assert_eq!(replay.finalized[0].index, 1);
    // Index 0 was still open when replay stopped.
    assert!(driver.buffer().pending(0).is_some());
}

#[test]
fn upstream_error_event_fails_replay() {
    let input = sse(&[
        text_delta(0, "partial"),
        json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
    ]);
    let mut driver = StreamDriver::new(StreamingToolCallBuffer::new());
    let err = replay_reader(input.as_bytes(), InputFormat::Auto, &mut driver).unwrap_err();
    assert!(err.to_string().contains("Overloaded"));
}
