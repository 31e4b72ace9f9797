//! Translation of parsed arguments into a core command or a listing.

use qth_config::Config;
use qth_core::{CommandConfig, CommandKind, QthError, ValueSource, json};

use crate::cli::{Cli, CliCommand, GlobalOptions};
use crate::ls::{ListRequest, LsFormat};

/// Value argument that selects standard input.
const STDIN_MARKER: &str = "-";

/// What a single `qth` invocation will do once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Invocation {
    Command(CommandConfig),
    List(ListRequest),
}

impl Invocation {
    /// Builds the invocation for `cli`, validating any value argument so
    /// malformed JSON is reported before a connection is attempted.
    pub(crate) fn from_cli(cli: Cli, config: &Config) -> Result<Self, QthError> {
        let options = cli.options;
        let (kind, topic, value) = match cli.command {
            Some(CliCommand::Ls(args)) => {
                let format = if args.json {
                    LsFormat::Json
                } else if args.long {
                    LsFormat::Long
                } else {
                    LsFormat::Short
                };
                return Ok(Self::List(ListRequest {
                    path: ListRequest::directory_path(args.path.as_deref()),
                    recursive: args.recursive,
                    format,
                    json_format: options.json_format(),
                    meta_timeout: config.meta_timeout(),
                }));
            }
            Some(CliCommand::Get { topic }) => (CommandKind::Get, topic, None),
            Some(CliCommand::Set { topic, value }) => (CommandKind::Set, topic, value),
            Some(CliCommand::Delete { topic }) => (CommandKind::Delete, topic, None),
            Some(CliCommand::Watch { topic }) => (CommandKind::Watch, topic, None),
            Some(CliCommand::Send { topic, value }) => (CommandKind::Send, topic, value),
            None => (CommandKind::Auto, cli.topic.unwrap_or_default(), cli.value),
        };

        let source = value_source(value)?;
        Ok(Self::Command(command_config(kind, topic, source, &options, config)))
    }
}

fn value_source(value: Option<String>) -> Result<ValueSource, QthError> {
    match value {
        None => Ok(ValueSource::None),
        Some(marker) if marker == STDIN_MARKER => Ok(ValueSource::Stdin),
        Some(text) => {
            json::validate(&text).map_err(|source| QthError::InvalidValue { source })?;
            Ok(ValueSource::Argument(text))
        }
    }
}

fn command_config(
    kind: CommandKind,
    topic: String,
    value: ValueSource,
    options: &GlobalOptions,
    config: &Config,
) -> CommandConfig {
    let mut command = CommandConfig::new(kind, topic)
        .with_value(value)
        .with_meta_timeout(config.meta_timeout())
        .with_force(options.force)
        .with_strict(options.strict)
        .with_registering(options.register)
        .with_format(options.json_format());
    if let Some(count) = options.count() {
        command = command.with_count(count);
    }
    if let Some(timeout) = options.timeout {
        command = command.with_timeout(timeout);
    }
    command
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use clap::Parser;
    use qth_core::JsonFormat;
    use rstest::rstest;

    fn invocation(args: &[&str]) -> Result<Invocation, QthError> {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("arguments parse");
        Invocation::from_cli(cli, &Config::default())
    }

    fn command(args: &[&str]) -> CommandConfig {
        match invocation(args).expect("invocation builds") {
            Invocation::Command(command) => command,
            Invocation::List(request) => panic!("expected a command, got {request:?}"),
        }
    }

    #[rstest]
    #[case(&["qth", "a/b"], CommandKind::Auto, ValueSource::None)]
    #[case(&["qth", "a/b", "12"], CommandKind::Auto, ValueSource::Argument(String::from("12")))]
    #[case(&["qth", "get", "a/b"], CommandKind::Get, ValueSource::None)]
    #[case(&["qth", "set", "a/b", "-"], CommandKind::Set, ValueSource::Stdin)]
    #[case(&["qth", "set", "a/b"], CommandKind::Set, ValueSource::None)]
    #[case(&["qth", "delete", "a/b"], CommandKind::Delete, ValueSource::None)]
    #[case(&["qth", "watch", "a/b"], CommandKind::Watch, ValueSource::None)]
    #[case(&["qth", "send", "a/b", "\"hi\""], CommandKind::Send, ValueSource::Argument(String::from("\"hi\"")))]
    fn maps_commands(
        #[case] args: &[&str],
        #[case] kind: CommandKind,
        #[case] value: ValueSource,
    ) {
        let built = command(args);
        assert_eq!(built.kind(), kind);
        assert_eq!(built.topic(), "a/b");
        assert_eq!(built.value(), &value);
    }

    #[test]
    fn carries_options() {
        let built = command(&["qth", "watch", "a/b", "-0", "-t", "3", "-f", "-r", "-v"]);
        assert_eq!(built.count(), Some(0));
        assert_eq!(built.timeout(), Some(Duration::from_secs(3)));
        assert!(built.force());
        assert!(built.registering());
        assert!(!built.strict());
        assert_eq!(built.format(), JsonFormat::Verbatim);
        assert_eq!(built.meta_timeout(), Config::default().meta_timeout());
    }

    #[test]
    fn unset_options_stay_unset() {
        let built = command(&["qth", "a/b"]);
        assert_eq!(built.count(), None);
        assert_eq!(built.timeout(), None);
    }

    #[test]
    fn invalid_value_is_rejected_before_connecting() {
        let error = invocation(&["qth", "set", "a/b", "{"]).expect_err("value rejected");
        assert_eq!(
            error.to_string(),
            "Value must be valid JSON: EOF while parsing an object\n{\n^"
        );
    }

    #[rstest]
    #[case(&["qth", "ls"], "", false, LsFormat::Short)]
    #[case(&["qth", "ls", "-R", "house"], "house/", true, LsFormat::Short)]
    #[case(&["qth", "ls", "-l", "house/"], "house/", false, LsFormat::Long)]
    #[case(&["qth", "ls", "-j", "-p"], "", false, LsFormat::Json)]
    fn maps_listings(
        #[case] args: &[&str],
        #[case] path: &str,
        #[case] recursive: bool,
        #[case] format: LsFormat,
    ) {
        let Invocation::List(request) = invocation(args).expect("invocation builds") else {
            panic!("expected a listing");
        };
        assert_eq!(request.path, path);
        assert_eq!(request.recursive, recursive);
        assert_eq!(request.format, format);
    }
}
