//! Command-line interface definitions for the `qth` client.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use qth_config::{BrokerEndpoint, BrokerParseError, LogFormat};
use qth_core::JsonFormat;

/// A utility for interacting with a Qth-compliant MQTT-based home
/// automation system.
#[derive(Parser, Debug)]
#[command(
    name = "qth",
    version,
    disable_help_subcommand = true,
    subcommand_negates_reqs = true
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) options: GlobalOptions,
    /// Explicit command; without one the command is chosen from the topic's
    /// registered behaviour.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
    /// Topic to act on.
    #[arg(value_name = "TOPIC", required = true)]
    pub(crate) topic: Option<String>,
    /// JSON value to write, or `-` to read one value per line from stdin.
    #[arg(value_name = "VALUE", allow_negative_numbers = true)]
    pub(crate) value: Option<String>,
}

/// Options accepted before or after any subcommand.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct GlobalOptions {
    /// Configuration file read before the environment and flags.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config_path: Option<PathBuf>,
    /// MQTT broker URL, for example `mqtt://broker:1883`.
    #[arg(long, global = true, value_name = "URL")]
    pub(crate) broker: Option<String>,
    /// Hostname of the MQTT broker.
    #[arg(short = 'H', long, global = true)]
    pub(crate) host: Option<String>,
    /// TCP port of the MQTT broker.
    #[arg(short = 'P', long, global = true)]
    pub(crate) port: Option<u16>,
    /// MQTT keep-alive interval in seconds.
    #[arg(short = 'K', long, global = true, value_name = "SECONDS")]
    pub(crate) keep_alive: Option<u64>,
    /// MQTT client ID; generated when absent.
    #[arg(short = 'C', long, global = true)]
    pub(crate) client_id: Option<String>,
    /// Seconds to wait for each directory listing.
    #[arg(
        short = 'T',
        long,
        global = true,
        value_name = "SECONDS",
        value_parser = parse_seconds
    )]
    pub(crate) meta_timeout: Option<Duration>,
    /// Seconds to wait for each value, or 0 to wait forever.
    #[arg(
        short = 't',
        long,
        global = true,
        value_name = "SECONDS",
        value_parser = parse_seconds
    )]
    pub(crate) timeout: Option<Duration>,
    /// Number of values to handle before exiting, or 0 for no limit.
    #[arg(short = 'c', long, global = true, conflicts_with_all = ["once", "unlimited"])]
    pub(crate) count: Option<u32>,
    /// Alias for `--count=1`.
    #[arg(short = '1', global = true, conflicts_with = "unlimited")]
    pub(crate) once: bool,
    /// Alias for `--count=0`.
    #[arg(short = '0', global = true)]
    pub(crate) unlimited: bool,
    /// Pretty-print JSON values.
    #[arg(
        short = 'p',
        long = "pretty-print",
        visible_alias = "pretty",
        global = true,
        conflicts_with_all = ["verbatim", "quiet"]
    )]
    pub(crate) pretty: bool,
    /// Show JSON values exactly as received.
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub(crate) verbatim: bool,
    /// Do not print received values.
    #[arg(short = 'q', long, global = true)]
    pub(crate) quiet: bool,
    /// Never let the supplied value change the automatically chosen command.
    #[arg(short = 's', long, global = true, conflicts_with = "force")]
    pub(crate) strict: bool,
    /// Act on the topic regardless of its registered behaviour.
    #[arg(short = 'f', long, global = true)]
    pub(crate) force: bool,
    /// Act as the topic's registered owner, reversing the expected
    /// direction.
    #[arg(short = 'r', long, global = true)]
    pub(crate) register: bool,
    /// Tracing filter directive, for example `qth_core=debug`.
    #[arg(long, global = true, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Log output format.
    #[arg(long, global = true, value_name = "FORMAT", value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
}

impl GlobalOptions {
    /// Arguments for the configuration loader, restating every connection
    /// and logging flag in its long `--name=value` form.
    ///
    /// `--broker` supplies the host and port unless `--host` or `--port`
    /// name their own.
    pub(crate) fn config_arguments(&self) -> Result<Vec<OsString>, BrokerParseError> {
        let endpoint = self
            .broker
            .as_deref()
            .map(str::parse::<BrokerEndpoint>)
            .transpose()?;
        let host = self
            .host
            .as_deref()
            .or_else(|| endpoint.as_ref().map(BrokerEndpoint::host));
        let port = self
            .port
            .or_else(|| endpoint.as_ref().map(BrokerEndpoint::port));

        let mut arguments = vec![OsString::from("qth")];
        if let Some(path) = self.config_path.as_ref() {
            arguments.push(OsString::from("--config-path"));
            arguments.push(path.clone().into_os_string());
        }
        arguments.extend(host.map(|value| long_flag("host", value)));
        arguments.extend(port.map(|value| long_flag("port", value)));
        arguments.extend(self.keep_alive.map(|value| long_flag("keep-alive", value)));
        arguments.extend(
            self.client_id
                .as_deref()
                .map(|value| long_flag("client-id", value)),
        );
        arguments.extend(
            self.meta_timeout
                .map(|value| long_flag("meta-timeout-ms", value.as_millis())),
        );
        arguments.extend(
            self.log_filter
                .as_deref()
                .map(|value| long_flag("log-filter", value)),
        );
        arguments.extend(self.log_format.map(|value| long_flag("log-format", value)));
        Ok(arguments)
    }

    /// Count requested through `-c`, `-1`, or `-0`.
    pub(crate) fn count(&self) -> Option<u32> {
        if self.once {
            Some(1)
        } else if self.unlimited {
            Some(0)
        } else {
            self.count
        }
    }

    /// Display style selected through `-p`, `-v`, or `-q`.
    pub(crate) const fn json_format(&self) -> JsonFormat {
        if self.pretty {
            JsonFormat::Pretty
        } else if self.verbatim {
            JsonFormat::Verbatim
        } else if self.quiet {
            JsonFormat::Quiet
        } else {
            JsonFormat::SingleLine
        }
    }
}

/// Explicit commands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Print the value of a property.
    Get {
        /// Property topic.
        topic: String,
    },
    /// Set the value of a property.
    Set {
        /// Property topic.
        topic: String,
        /// JSON value, or `-` for one value per line of stdin.
        #[arg(allow_negative_numbers = true)]
        value: Option<String>,
    },
    /// Delete a property.
    Delete {
        /// Property topic.
        topic: String,
    },
    /// Print events as they arrive.
    Watch {
        /// Event topic.
        topic: String,
    },
    /// Send an event.
    Send {
        /// Event topic.
        topic: String,
        /// JSON value, or `-` for one value per line of stdin.
        #[arg(allow_negative_numbers = true)]
        value: Option<String>,
    },
    /// List a directory.
    Ls(LsArgs),
}

/// Arguments of the `ls` command.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct LsArgs {
    /// List subdirectories recursively.
    #[arg(short = 'R', long, conflicts_with = "json")]
    pub(crate) recursive: bool,
    /// Show one line per behaviour.
    #[arg(short = 'l', long, conflicts_with = "json")]
    pub(crate) long: bool,
    /// Show the raw listing as JSON.
    #[arg(short = 'j', long)]
    pub(crate) json: bool,
    /// Directory to list; the root when omitted.
    #[arg(value_name = "PATH")]
    pub(crate) path: Option<String>,
}

fn long_flag(name: &str, value: impl Display) -> OsString {
    OsString::from(format!("--{name}={value}"))
}

fn parse_seconds(text: &str) -> Result<Duration, String> {
    let seconds: f64 = text
        .trim()
        .parse()
        .map_err(|error| format!("'{text}' is not a number of seconds: {error}"))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|error| format!("'{text}' is not a usable number of seconds: {error}"))
}

fn parse_log_format(text: &str) -> Result<LogFormat, String> {
    text.parse()
        .map_err(|_| format!("unknown log format '{text}' (expected 'compact' or 'json')"))
}
