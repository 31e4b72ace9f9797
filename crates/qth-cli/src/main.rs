//! CLI entrypoint for the `qth` MQTT client.
//!
//! The binary delegates to [`qth_cli::run`], which parses arguments, loads
//! configuration, connects to the broker, and runs the requested command.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    qth_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
