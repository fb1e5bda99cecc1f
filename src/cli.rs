//! Command-line front end: replay recorded streams and check parameters.

use crate::buffer::{CallResult, Parameters, StreamingToolCallBuffer};
use crate::config::Config;
use crate::stream::{self, InputFormat, Replay, StreamDriver};
use crate::validate::{Validation, validate_with};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "toolcall-buffer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/toolcall-buffer/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded event stream and print each finalized block as JSON
    Replay(ReplayArgs),
    /// Validate and repair parameters for a tool
    Validate(ValidateArgs),
    /// Show the effective configuration
    Config {
        /// Print the config file path only
        #[arg(long)]
        path: bool,
    },
}

#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Recording to read ("-" or omitted for stdin)
    pub file: Option<PathBuf>,

    /// Framing of the recording
    #[arg(short, long, default_value = "auto", value_enum)]
    pub format: InputFormat,

    /// Attach parameter validation to complete calls
    #[arg(long)]
    pub validate: bool,

    /// Omit plain-text blocks from the output
    #[arg(long)]
    pub calls_only: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Tool identifier (e.g. dc_bash)
    pub tool: String,

    /// Parameters as a JSON object
    pub parameters: String,
}

/// One output line of `replay`.
#[derive(Debug, Serialize)]
struct ReplayLine<'a> {
    index: usize,
    #[serde(flatten)]
    result: &'a CallResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<Validation>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    match run_inner(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("toolcall_buffer=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_inner(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Replay(args) => {
            let buffer = StreamingToolCallBuffer::with_config(config.buffer_config());
            let mut driver = StreamDriver::new(buffer);
            let replay = match args.file.as_deref() {
                Some(path) if path != Path::new("-") => {
                    let file = File::open(path)
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    stream::replay_reader(file, args.format, &mut driver)?
                }
                _ => stream::replay_reader(io::stdin().lock(), args.format, &mut driver)?,
            };
            if replay.halted {
                tracing::warn!(
                    max_attempts = config.max_attempts,
                    "Stopped after reaching the tool call limit"
                );
            }
            for line in render_lines(&replay, &args, &config)? {
                writeln!(stdout, "{line}")?;
            }
        }
        Commands::Validate(args) => {
            let parameters: Parameters = serde_json::from_str(&args.parameters)
                .context("parameters must be a JSON object")?;
            let validation = validate_with(&args.tool, &parameters, &config.tools);
            writeln!(stdout, "{}", serde_json::to_string(&validation)?)?;
            if !validation.ok {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Config { path } => {
            if path {
                let path = cli.config.unwrap_or_else(Config::default_path);
                writeln!(stdout, "{}", path.display())?;
            } else {
                write!(stdout, "{}", toml::to_string_pretty(&config)?)?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Render one JSON line per finalized block.
pub fn render_lines(replay: &Replay, args: &ReplayArgs, config: &Config) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(replay.finalized.len());
    for finalized in &replay.finalized {
        let call = finalized.result.as_call();
        if args.calls_only && call.is_none() {
            continue;
        }
        let validation = call
            .filter(|_| args.validate)
            .map(|call| validate_with(&call.tool_name, &call.parameters, &config.tools));
        let line = ReplayLine {
            index: finalized.index,
            result: &finalized.result,
            validation,
        };
        lines.push(serde_json::to_string(&line)?);
    }
    Ok(lines)
}
