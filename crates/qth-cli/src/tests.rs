use super::*;

use std::cell::Cell;
use std::time::Duration;

use qth_config::BrokerEndpoint;
use qth_core::testing::{Call, FakeBroker, ScriptedLines};
use rstest::{fixture, rstest};

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn test_config() -> Config {
    Config {
        meta_timeout_ms: 50,
        ..Config::default()
    }
}

fn build_args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("qth")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn run_cli_with<T, C>(args: &[&str], input: &mut ScriptedLines, connect: C) -> Outcome
where
    T: Transport,
    C: FnOnce(&Config) -> Result<T, TransportError>,
{
    let loader = StaticConfigLoader {
        config: test_config(),
    };
    run_cli_loading(args, &loader, input, connect)
}

fn run_cli_loading<L, T, C>(
    args: &[&str],
    loader: &L,
    input: &mut ScriptedLines,
    connect: C,
) -> Outcome
where
    L: ConfigLoader,
    T: Transport,
    C: FnOnce(&Config) -> Result<T, TransportError>,
{
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with(
        build_args(args),
        IoStreams::new(&mut stdout, &mut stderr),
        loader,
        input,
        connect,
    );
    Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

fn run_cli(args: &[&str], broker: &mut FakeBroker) -> Outcome {
    run_cli_with(args, &mut ScriptedLines::default(), move |_: &Config| {
        Ok::<_, TransportError>(broker)
    })
}

#[fixture]
fn house() -> FakeBroker {
    FakeBroker::new()
        .with_listing("", r#"{"house": [{"behaviour": "DIRECTORY"}]}"#)
        .with_listing(
            "house/",
            r#"{
                "temp": [{"behaviour": "PROPERTY-1:N"}],
                "lamp": [{"behaviour": "PROPERTY-N:1"}],
                "doorbell": [{"behaviour": "EVENT-1:N"}],
                "speaker": [{"behaviour": "EVENT-N:1"}]
            }"#,
        )
        .with_retained("house/temp", "21.5")
}

#[rstest]
fn auto_command_prints_property(mut house: FakeBroker) {
    let outcome = run_cli(&["house/temp"], &mut house);
    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout, "21.5\n");
    assert!(outcome.stderr.is_empty());
}

#[rstest]
fn set_publishes_retained_value(mut house: FakeBroker) {
    let outcome = run_cli(&["set", "house/lamp", "true"], &mut house);
    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(house.retained("house/lamp").as_deref(), Some("true"));
}

#[rstest]
fn pretty_printing_applies_to_values(house: FakeBroker) {
    let mut broker = house.with_retained("house/temp", "{\"c\": [1, 2]}");
    let outcome = run_cli(&["get", "-p", "house/temp"], &mut broker);
    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout, "{\n  \"c\": [\n    1,\n    2\n  ]\n}\n");
}

#[rstest]
fn stdin_values_are_sent_in_order(mut house: FakeBroker) {
    let mut input = ScriptedLines::lines(["1\n", "\n", "[true]\n"]);
    let broker = &mut house;
    let outcome = run_cli_with(&["send", "house/speaker", "-"], &mut input, move |_: &Config| {
        Ok::<_, TransportError>(broker)
    });
    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let payloads: Vec<String> = house
        .publications()
        .into_iter()
        .map(|(_, payload, _)| payload)
        .collect();
    assert_eq!(payloads, vec!["1", "null", "[true]"]);
}

#[test]
fn invalid_value_fails_without_connecting() {
    let connected = Cell::new(false);
    let outcome = run_cli_with(
        &["set", "house/lamp", "{"],
        &mut ScriptedLines::default(),
        |_: &Config| {
            connected.set(true);
            Ok::<_, TransportError>(FakeBroker::new())
        },
    );
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(
        outcome.stderr,
        "Error: Value must be valid JSON: EOF while parsing an object\n{\n^\n"
    );
    assert!(!connected.get());
}

#[rstest]
fn command_failures_are_reported(mut house: FakeBroker) {
    let outcome = run_cli(&["get", "house/doorbell"], &mut house);
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(
        outcome.stderr,
        "Error: Topic does not have behaviour 'PROPERTY-1:N'.\n"
    );
    assert!(outcome.stdout.is_empty());
}

#[test]
fn connection_failures_name_the_broker() {
    let outcome = run_cli_with(&["get", "a/b"], &mut ScriptedLines::default(), |_: &Config| {
        Err::<FakeBroker, _>(TransportError::Connection(String::from("refused")))
    });
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(
        outcome.stderr,
        "Error: Could not connect to MQTT broker at mqtt://localhost:1883: connection lost: refused\n"
    );
}

#[test]
fn connection_options_reach_the_transport() {
    let mut seen = None;
    let outcome = run_cli_loading(
        &["-H", "broker.lan", "-P", "1999", "-C", "panel", "-K", "30", "-f", "get", "a/b"],
        &OrthoConfigLoader,
        &mut ScriptedLines::default(),
        |config: &Config| {
            seen = Some(config.clone());
            Ok::<_, TransportError>(FakeBroker::new().with_retained("a/b", "1"))
        },
    );
    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let config = seen.expect("connection attempted");
    assert_eq!(config.broker(), BrokerEndpoint::new("broker.lan", 1999));
    assert_eq!(config.client_id(), Some("panel"));
    assert_eq!(config.keep_alive(), Duration::from_secs(30));
}

#[rstest]
fn listing_runs_through_the_resolver(mut house: FakeBroker) {
    let outcome = run_cli(&["ls", "-R"], &mut house);
    assert_eq!(outcome.exit, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(
        outcome.stdout,
        "[root]:\nhouse/\n\nhouse/:\ntemp\nlamp\ndoorbell\nspeaker\n"
    );
    assert!(house.calls().iter().any(|call| matches!(
        call,
        Call::Subscribe(topics) if topics.iter().any(|topic| topic == "meta/ls/house/")
    )));
}

#[test]
fn unsupported_broker_url_fails_before_connecting() {
    let outcome = run_cli_with(
        &["--broker", "http://hub", "a/b"],
        &mut ScriptedLines::default(),
        |_: &Config| Err::<FakeBroker, _>(TransportError::Connection(String::from("unused"))),
    );
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(
        outcome.stderr,
        "Error: invalid broker URL: unsupported broker scheme 'http'\n"
    );
}

#[rstest]
#[case(&["-s", "-f", "a/b"])]
#[case(&["-q", "-v", "a/b"])]
#[case(&["ls", "-R", "-j"])]
#[case(&["get"])]
fn argument_errors_exit_with_usage_status(#[case] args: &[&str]) {
    let mut broker = FakeBroker::new();
    let outcome = run_cli(args, &mut broker);
    assert_eq!(outcome.exit, ExitCode::from(2));
    assert!(!outcome.stderr.is_empty());
    assert!(outcome.stdout.is_empty());
    assert!(broker.calls().is_empty());
}

#[test]
fn version_is_printed_to_stdout() {
    let mut broker = FakeBroker::new();
    let outcome = run_cli(&["-V"], &mut broker);
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, format!("qth {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_commands() {
    let mut broker = FakeBroker::new();
    let outcome = run_cli(&["--help"], &mut broker);
    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    for command in ["get", "set", "delete", "watch", "send", "ls"] {
        assert!(outcome.stdout.contains(command), "help omits {command}");
    }
}

#[test]
fn malformed_log_filter_is_reported() {
    let outcome = run_cli_loading(
        &["--log-filter", "qth_core=loud", "a/b"],
        &OrthoConfigLoader,
        &mut ScriptedLines::default(),
        |_: &Config| Ok::<_, TransportError>(FakeBroker::new()),
    );
    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(
        outcome
            .stderr
            .starts_with("Error: failed to initialise logging: invalid log filter:"),
        "stderr: {}",
        outcome.stderr
    );
}
