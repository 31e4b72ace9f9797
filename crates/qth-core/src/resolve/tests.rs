use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::behaviour::Behaviour;
use crate::error::{ErrorCategory, QthError};
use crate::testing::{Call, FakeBroker, Operation};
use crate::transport::TransportError;

const META_TIMEOUT: Duration = Duration::from_millis(250);
const ROOT: &str = r#"{"lights/":[{"behaviour":"DIRECTORY"}],"temp":[{"behaviour":"PROPERTY-1:N"}]}"#;
const FOO: &str = r#"{"foo/":[{"behaviour":"DIRECTORY"}]}"#;
const BAR: &str = r#"{"bar/":[{"behaviour":"DIRECTORY"}]}"#;
const BAZ: &str = r#"{"baz":[{"behaviour":"PROPERTY-1:N"}]}"#;

fn levels(topics: &[&str]) -> Vec<String> {
    topics.iter().map(|topic| (*topic).to_owned()).collect()
}

#[fixture]
fn nested() -> FakeBroker {
    FakeBroker::new()
        .with_listing("", FOO)
        .with_listing("foo/", BAR)
        .with_listing("foo/bar/", BAZ)
}

#[fixture]
fn home() -> FakeBroker {
    FakeBroker::new()
        .with_listing("", r#"{"home":[{"behaviour":"DIRECTORY"}]}"#)
        .with_listing(
            "home/",
            r#"{
                "lamp": [{"behaviour": "PROPERTY-N:1", "description": "Lamp on/off"}],
                "temp": [{"behaviour": "PROPERTY-1:N"}],
                "doorbell": [{"behaviour": "EVENT-1:N"}],
                "rooms": [{"behaviour": "DIRECTORY"}],
                "combo": [{"behaviour": "DIRECTORY"}, {"behaviour": "EVENT-N:1"}],
                "odd": [{"behaviour": "EVENT-1:N"}, {"behaviour": "PROPERTY-1:N"}]
            }"#,
        )
}

// ---------------------------------------------------------------------------
// Directory resolution
// ---------------------------------------------------------------------------

#[test]
fn root_listing_is_returned_verbatim() {
    let mut broker = FakeBroker::new().with_listing("", ROOT);
    let directory = resolve(&mut broker, "", META_TIMEOUT).expect("root resolves");
    assert_eq!(directory.text(), ROOT);
    assert_eq!(directory.path(), "");
    assert!(directory.listing().has_subdirectory("lights"));
}

#[rstest]
fn nested_directory_returns_leaf_listing(mut nested: FakeBroker) {
    let directory = resolve(&mut nested, "foo/bar/", META_TIMEOUT).expect("path resolves");
    assert_eq!(directory.into_text(), BAZ);
}

#[rstest]
fn every_level_is_subscribed_in_one_batch_and_released(mut nested: FakeBroker) {
    resolve(&mut nested, "foo/bar/", META_TIMEOUT).expect("path resolves");
    let all = levels(&["meta/ls/", "meta/ls/foo/", "meta/ls/foo/bar/"]);
    assert_eq!(nested.calls().first(), Some(&Call::Subscribe(all.clone())));
    assert_eq!(nested.calls().last(), Some(&Call::Unsubscribe(all)));
    assert_eq!(nested.subscriptions().count(), 0);
}

#[test]
fn deep_paths_batch_and_release_every_level() {
    let mut broker = FakeBroker::new();
    let mut path = String::new();
    for depth in 0..24 {
        let segment = format!("d{depth}");
        broker = broker.with_listing(
            &path,
            &format!(r#"{{"{segment}/":[{{"behaviour":"DIRECTORY"}}]}}"#),
        );
        path.push_str(&segment);
        path.push('/');
    }
    broker = broker.with_listing(&path, BAZ);

    let directory = resolve(&mut broker, &path, META_TIMEOUT).expect("deep path resolves");
    assert_eq!(directory.text(), BAZ);

    let Some(Call::Subscribe(subscribed)) = broker.calls().first() else {
        panic!("resolution must start with a subscribe: {:?}", broker.calls());
    };
    assert_eq!(subscribed.len(), 25);
    assert_eq!(subscribed.last(), Some(&format!("meta/ls/{path}")));
    assert_eq!(
        broker.calls().last(),
        Some(&Call::Unsubscribe(subscribed.clone()))
    );
    assert_eq!(broker.subscriptions().count(), 0);
}

#[test]
fn bare_ancestor_keys_are_accepted() {
    let mut broker = FakeBroker::new()
        .with_listing("", r#"{"foo":[{"behaviour":"DIRECTORY"}]}"#)
        .with_listing("foo/", BAZ);
    let directory = resolve(&mut broker, "foo/", META_TIMEOUT).expect("path resolves");
    assert_eq!(directory.text(), BAZ);
}

#[test]
fn latest_leaf_snapshot_wins() {
    let newer = r#"{"qux":[{"behaviour":"EVENT-1:N"}]}"#;
    let mut broker = FakeBroker::new()
        .with_listing("foo/", BAZ)
        .with_live("meta/ls/foo/", newer)
        .with_live("meta/ls/", FOO);
    let directory = resolve(&mut broker, "foo/", META_TIMEOUT).expect("path resolves");
    assert_eq!(directory.text(), newer);
}

#[test]
fn unrelated_messages_are_ignored() {
    let mut broker = FakeBroker::new()
        .with_live("some/other/topic", "not even json")
        .with_live("meta/ls/", ROOT);
    let directory = resolve(&mut broker, "", META_TIMEOUT).expect("root resolves");
    assert_eq!(directory.text(), ROOT);
}

#[rstest]
#[case::ancestor_is_property(r#"{"foo":[{"behaviour":"PROPERTY-1:N"}]}"#, BAZ)]
#[case::ancestor_missing_segment(r#"{"other/":[{"behaviour":"DIRECTORY"}]}"#, BAZ)]
#[case::ancestor_not_a_listing(r#"["foo"]"#, BAZ)]
#[case::leaf_not_a_listing(FOO, r#"{"baz":"PROPERTY-1:N"}"#)]
#[case::leaf_is_scalar(FOO, "42")]
fn inconsistent_hierarchy_is_not_found(#[case] root: &str, #[case] leaf: &str) {
    let mut broker = FakeBroker::new()
        .with_listing("", root)
        .with_listing("foo/", leaf);
    let error = resolve(&mut broker, "foo/", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::DirectoryNotFound { ref path } if path == "foo/"));
    assert_eq!(error.category(), ErrorCategory::ProtocolViolation);
    assert_eq!(error.to_string(), "Directory not found.");
    assert!(matches!(broker.calls().last(), Some(Call::Unsubscribe(_))));
}

#[test]
fn unparsable_snapshot_reports_annotated_error() {
    let mut broker = FakeBroker::new().with_listing("", FOO).with_listing("foo/", "{");
    let error = resolve(&mut broker, "foo/", META_TIMEOUT).expect_err("should fail");
    assert_eq!(error.category(), ErrorCategory::Validation);
    assert_eq!(
        error.to_string(),
        "Couldn't parse directory listing: EOF while parsing an object\n{\n^"
    );
    assert!(matches!(broker.calls().last(), Some(Call::Unsubscribe(_))));
}

#[test]
fn silent_level_times_out() {
    let mut broker = FakeBroker::new().with_listing("foo/", BAZ);
    let error = resolve(&mut broker, "foo/", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::ListingTimeout { .. }));
    assert_eq!(error.category(), ErrorCategory::Timeout);
    assert!(broker.calls().contains(&Call::Receive(META_TIMEOUT)));
    assert!(matches!(broker.calls().last(), Some(Call::Unsubscribe(_))));
}

#[rstest]
#[case("foo")]
#[case("foo/bar")]
fn non_directory_paths_are_rejected_without_traffic(#[case] path: &str) {
    let mut broker = FakeBroker::new().with_listing("", ROOT);
    let error = resolve(&mut broker, path, META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::InvalidDirectoryPath { .. }));
    assert_eq!(error.category(), ErrorCategory::Usage);
    assert!(broker.calls().is_empty());
}

#[test]
fn subscribe_failure_still_unsubscribes() {
    let mut broker = FakeBroker::new()
        .with_listing("", ROOT)
        .failing(Operation::Subscribe, TransportError::Connection(String::from("gone")));
    let error = resolve(&mut broker, "", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::ListingSubscribe { .. }));
    assert_eq!(error.category(), ErrorCategory::Transport);
    assert!(matches!(broker.calls().last(), Some(Call::Unsubscribe(_))));
}

#[test]
fn receive_failure_is_a_transport_error() {
    let mut broker = FakeBroker::new()
        .with_listing("", ROOT)
        .failing(Operation::Receive, TransportError::Connection(String::from("reset")));
    let error = resolve(&mut broker, "", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::ListingReceive { .. }));
    assert_eq!(
        error.to_string(),
        "MQTT error while fetching directory listing: connection lost: reset"
    );
}

#[test]
fn unsubscribe_failure_does_not_fail_resolution() {
    let mut broker = FakeBroker::new()
        .with_listing("", ROOT)
        .failing(Operation::Unsubscribe, TransportError::Rejected(String::from("busy")));
    assert!(resolve(&mut broker, "", META_TIMEOUT).is_ok());
}

// ---------------------------------------------------------------------------
// Behaviour verification and detection
// ---------------------------------------------------------------------------

#[rstest]
#[case("home/lamp", Behaviour::PropertyManyToOne)]
#[case("home/temp", Behaviour::PropertyOneToMany)]
#[case("home/combo", Behaviour::Directory)]
#[case("home/combo", Behaviour::EventManyToOne)]
fn verify_accepts_declared_behaviours(
    mut home: FakeBroker,
    #[case] topic: &str,
    #[case] behaviour: Behaviour,
) {
    verify(&mut home, topic, &behaviour, META_TIMEOUT).expect("behaviour declared");
}

#[rstest]
fn verify_rejects_other_behaviours(mut home: FakeBroker) {
    let error = verify(&mut home, "home/lamp", &Behaviour::PropertyOneToMany, META_TIMEOUT)
        .expect_err("should fail");
    assert_eq!(error.to_string(), "Topic does not have behaviour 'PROPERTY-1:N'.");
    assert_eq!(error.category(), ErrorCategory::ProtocolViolation);
}

#[rstest]
fn verify_rejects_unlisted_topics(mut home: FakeBroker) {
    let error =
        verify(&mut home, "home/garage", &Behaviour::PropertyOneToMany, META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::TopicNotFound { ref topic } if topic == "home/garage"));
    assert_eq!(error.to_string(), "Topic does not exist.");
}

#[rstest]
#[case("home/lamp", Behaviour::PropertyManyToOne)]
#[case("home/doorbell", Behaviour::EventOneToMany)]
#[case("home/combo", Behaviour::EventManyToOne)]
fn detect_returns_sole_behaviour(
    mut home: FakeBroker,
    #[case] topic: &str,
    #[case] expected: Behaviour,
) {
    assert_eq!(detect(&mut home, topic, META_TIMEOUT).expect("detects"), expected);
}

#[rstest]
fn detect_reports_directories(mut home: FakeBroker) {
    let error = detect(&mut home, "home/rooms", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::TopicIsDirectory { .. }));
    assert_eq!(error.to_string(), "Topic is a directory.");
}

#[rstest]
fn detect_reports_multiple_behaviours(mut home: FakeBroker) {
    let error = detect(&mut home, "home/odd", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::MultipleBehaviours { .. }));
    assert_eq!(error.to_string(), "Topic has more than one behaviour.");
}

#[rstest]
fn detect_propagates_missing_directories(mut home: FakeBroker) {
    let error = detect(&mut home, "garden/hose", META_TIMEOUT).expect_err("should fail");
    assert!(matches!(error, QthError::DirectoryNotFound { .. }));
}

#[rstest]
fn lookups_are_never_cached(mut home: FakeBroker) {
    detect(&mut home, "home/lamp", META_TIMEOUT).expect("detects");
    detect(&mut home, "home/lamp", META_TIMEOUT).expect("detects");
    let batches = home
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::Subscribe(_)))
        .count();
    assert_eq!(batches, 2);
}
