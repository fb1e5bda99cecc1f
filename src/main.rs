use clap::Parser;
use std::process::ExitCode;
use toolcall_buffer::cli::Cli;

fn main() -> ExitCode {
    toolcall_buffer::cli::run(Cli::parse())
}
