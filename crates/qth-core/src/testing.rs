//! In-memory doubles for exercising commands without a broker.
//!
//! [`FakeBroker`] keeps retained messages per topic, replays them when a
//! topic is subscribed, and records every call so tests can assert on the
//! traffic a command produced. [`ScriptedLines`] stands in for standard
//! input.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::time::Duration;

use crate::command::{LinePoll, LineSource};
use crate::topic::LISTING_ROOT;
use crate::transport::{DeliveryToken, Message, QoS, Transport, TransportError};

/// A transport operation recorded by [`FakeBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Topics passed to one subscribe request.
    Subscribe(Vec<String>),
    /// Topics passed to one unsubscribe request.
    Unsubscribe(Vec<String>),
    /// A publication.
    Publish {
        /// Destination topic.
        topic: String,
        /// Payload as text.
        payload: String,
        /// Retain flag.
        retain: bool,
    },
    /// A wait for delivery confirmation.
    AwaitDelivery(Duration),
    /// A receive with its timeout.
    Receive(Duration),
    /// A keepalive pulse.
    Keepalive,
}

/// Operations whose failure can be injected into [`FakeBroker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    /// [`Transport::subscribe`].
    Subscribe,
    /// [`Transport::unsubscribe`].
    Unsubscribe,
    /// [`Transport::publish`].
    Publish,
    /// [`Transport::await_delivery`].
    AwaitDelivery,
    /// [`Transport::receive`].
    Receive,
    /// [`Transport::keepalive`].
    Keepalive,
}

/// Scripted, single-threaded stand-in for an MQTT broker connection.
#[derive(Debug, Default)]
pub struct FakeBroker {
    retained: BTreeMap<String, Vec<u8>>,
    subscriptions: BTreeSet<String>,
    inbox: VecDeque<Message>,
    live: VecDeque<Option<Message>>,
    failures: BTreeMap<Operation, TransportError>,
    calls: Vec<Call>,
    next_token: u64,
}

impl FakeBroker {
    /// Creates a broker with nothing retained.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains `payload` on `topic`.
    #[must_use]
    pub fn with_retained(mut self, topic: &str, payload: &str) -> Self {
        self.retained
            .insert(topic.to_owned(), payload.as_bytes().to_vec());
        self
    }

    /// Retains `listing` as the directory listing for `path`.
    #[must_use]
    pub fn with_listing(self, path: &str, listing: &str) -> Self {
        self.with_retained(&format!("{LISTING_ROOT}{path}"), listing)
    }

    /// Queues a message delivered after any retained snapshots, whether or
    /// not its topic is subscribed.
    #[must_use]
    pub fn with_live(mut self, topic: &str, payload: &str) -> Self {
        self.live.push_back(Some(Message::new(topic, payload)));
        self
    }

    /// Queues a receive call that times out before the next live message.
    #[must_use]
    pub fn with_idle_receive(mut self) -> Self {
        self.live.push_back(None);
        self
    }

    /// Makes every call to `operation` fail with `error`.
    #[must_use]
    pub fn failing(mut self, operation: Operation, error: TransportError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Topics currently subscribed.
    pub fn subscriptions(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(String::as_str)
    }

    /// Payload currently retained on `topic`, as text.
    #[must_use]
    pub fn retained(&self, topic: &str) -> Option<String> {
        self.retained
            .get(topic)
            .map(|payload| String::from_utf8_lossy(payload).into_owned())
    }

    /// Publications made so far as `(topic, payload, retain)`.
    #[must_use]
    pub fn publications(&self) -> Vec<(String, String, bool)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Publish {
                    topic,
                    payload,
                    retain,
                } => Some((topic.clone(), payload.clone(), *retain)),
                _ => None,
            })
            .collect()
    }

    /// Whether any subscribe request included `topic`.
    #[must_use]
    pub fn was_subscribed(&self, topic: &str) -> bool {
        self.calls.iter().any(|call| {
            matches!(call, Call::Subscribe(topics) if topics.iter().any(|candidate| candidate == topic))
        })
    }

    /// Number of keepalive pulses received.
    #[must_use]
    pub fn keepalives(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Keepalive))
            .count()
    }

    fn check(&self, operation: Operation) -> Result<(), TransportError> {
        self.failures.get(&operation).cloned().map_or(Ok(()), Err)
    }
}

impl Transport for FakeBroker {
    fn subscribe(&mut self, topics: &[String], _qos: QoS) -> Result<(), TransportError> {
        self.calls.push(Call::Subscribe(topics.to_vec()));
        self.check(Operation::Subscribe)?;
        for topic in topics {
            self.subscriptions.insert(topic.clone());
            if let Some(payload) = self.retained.get(topic) {
                self.inbox
                    .push_back(Message::new(topic.clone(), payload.clone()));
            }
        }
        Ok(())
    }

    fn unsubscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        self.calls.push(Call::Unsubscribe(topics.to_vec()));
        self.check(Operation::Unsubscribe)?;
        for topic in topics {
            self.subscriptions.remove(topic);
        }
        self.inbox
            .retain(|message| self.subscriptions.contains(&message.topic));
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        _qos: QoS,
        retain: bool,
    ) -> Result<DeliveryToken, TransportError> {
        self.calls.push(Call::Publish {
            topic: topic.to_owned(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        self.check(Operation::Publish)?;
        if retain {
            if payload.is_empty() {
                self.retained.remove(topic);
            } else {
                self.retained.insert(topic.to_owned(), payload.to_vec());
            }
        }
        self.next_token += 1;
        Ok(DeliveryToken::new(self.next_token))
    }

    fn await_delivery(
        &mut self,
        _token: DeliveryToken,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.calls.push(Call::AwaitDelivery(timeout));
        self.check(Operation::AwaitDelivery)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        self.calls.push(Call::Receive(timeout));
        self.check(Operation::Receive)?;
        if let Some(message) = self.inbox.pop_front() {
            return Ok(Some(message));
        }
        Ok(self.live.pop_front().flatten())
    }

    fn keepalive(&mut self) -> Result<(), TransportError> {
        self.calls.push(Call::Keepalive);
        self.check(Operation::Keepalive)
    }
}

/// Standard input replaced by a fixed sequence of poll results.
///
/// Once the script is exhausted every poll reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    script: VecDeque<LinePoll>,
}

impl ScriptedLines {
    /// Script that yields each of `lines` in turn, terminator included.
    #[must_use]
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines
                .into_iter()
                .map(|line| LinePoll::Line(line.into()))
                .collect(),
        }
    }

    /// Appends `count` polls that find no input.
    #[must_use]
    pub fn then_idle(mut self, count: usize) -> Self {
        self.script
            .extend(std::iter::repeat_with(|| LinePoll::Pending).take(count));
        self
    }

    /// Appends one line.
    #[must_use]
    pub fn then_line(mut self, line: &str) -> Self {
        self.script.push_back(LinePoll::Line(line.to_owned()));
        self
    }

    /// Appends a read failure.
    #[must_use]
    pub fn then_failure(mut self, kind: io::ErrorKind) -> Self {
        self.script
            .push_back(LinePoll::Failed(io::Error::new(kind, "scripted failure")));
        self
    }
}

impl LineSource for ScriptedLines {
    fn poll_line(&mut self, _wait: Duration) -> LinePoll {
        self.script.pop_front().unwrap_or(LinePoll::Closed)
    }
}
