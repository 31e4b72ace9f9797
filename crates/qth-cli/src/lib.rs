//! Command-line runtime for the `qth` client.
//!
//! The runtime parses arguments, layers configuration, initialises logging,
//! connects to the broker, and hands the invocation to `qth-core` or the
//! listing renderer. Configuration loading, standard input, and the broker
//! connection are all injected so tests can run the whole pipeline against
//! an in-memory broker.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use qth_config::Config;
use qth_core::{LineSource, ReaderLines, Transport, TransportError};

mod cli;
mod command;
mod config;
mod errors;
mod ls;
pub mod telemetry;
mod transport;

use cli::Cli;
use command::Invocation;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;

/// Bundles the output streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader, I: LineSource> {
    io: IoStreams<'a, W, E>,
    loader: &'a L,
    input: &'a mut I,
}

impl<W, E, L, I> CliRunner<'_, W, E, L, I>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
    I: LineSource,
{
    fn run<A, T, C>(&mut self, args: A, connect: C) -> ExitCode
    where
        A: IntoIterator<Item = OsString>,
        T: Transport,
        C: FnOnce(&Config) -> Result<T, TransportError>,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(&error),
        };

        match self.execute(cli, connect) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "Error: {error}");
                ExitCode::FAILURE
            }
        }
    }

    /// Prints clap's help, version, or usage error and maps its exit code.
    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render();
        let _ = if error.use_stderr() {
            write!(self.io.stderr, "{rendered}")
        } else {
            write!(self.io.stdout, "{rendered}")
        };
        u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
    }

    fn execute<T, C>(&mut self, cli: Cli, connect: C) -> Result<(), AppError>
    where
        T: Transport,
        C: FnOnce(&Config) -> Result<T, TransportError>,
    {
        let config = self.loader.load(&cli.options.config_arguments()?)?;
        telemetry::initialise(&config)?;
        let invocation = Invocation::from_cli(cli, &config)?;

        let mut transport = connect(&config).map_err(|source| AppError::Connect {
            endpoint: config.broker(),
            source,
        })?;
        match invocation {
            Invocation::Command(command) => {
                qth_core::execute(&command, &mut transport, &mut *self.input, &mut *self.io.stdout)?;
            }
            Invocation::List(request) => {
                ls::list(&request, &mut transport, &mut *self.io.stdout)?;
            }
        }
        Ok(())
    }
}

/// Runs the CLI using the provided arguments and output handles, reading
/// values from standard input and talking to a real broker.
#[must_use]
pub fn run<A, W, E>(args: A, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    A: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut input = ReaderLines::stdin();
    run_with(
        args,
        IoStreams::new(stdout, stderr),
        &OrthoConfigLoader,
        &mut input,
        transport::connect,
    )
}

/// Runs the CLI with injected configuration, input, and connection.
pub(crate) fn run_with<A, W, E, L, I, T, C>(
    args: A,
    io: IoStreams<'_, W, E>,
    loader: &L,
    input: &mut I,
    connect: C,
) -> ExitCode
where
    A: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    I: LineSource,
    T: Transport,
    C: FnOnce(&Config) -> Result<T, TransportError>,
{
    CliRunner { io, loader, input }.run(args, connect)
}

#[cfg(test)]
mod tests;
