//! Seam between the core and the publish/subscribe transport.
//!
//! The core drives the transport synchronously: every call either completes
//! or fails within the bound the caller supplies. Implementations own the
//! connection; the core only borrows it for the duration of a command.

use std::time::Duration;

use thiserror::Error;

/// Delivery guarantee requested for a subscription or publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Acknowledged, possibly duplicated.
    AtLeastOnce,
    /// Acknowledged exactly once.
    ExactlyOnce,
}

/// A message delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Exact topic the message was published to.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl Message {
    /// Builds a message from a topic and payload.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Handle identifying one publication until its delivery is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryToken(u64);

impl DeliveryToken {
    /// Wraps a transport-specific sequence number.
    #[must_use]
    pub const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Transport-specific sequence number.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

/// Failures reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection to the broker failed or was closed.
    #[error("connection lost: {0}")]
    Connection(String),
    /// The client refused or could not queue the request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// Delivery was not confirmed in time.
    #[error("delivery not confirmed within {0:?}")]
    DeliveryTimeout(Duration),
}

/// Synchronous publish/subscribe operations used by the core.
pub trait Transport {
    /// Subscribes to every topic in `topics` in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be issued.
    fn subscribe(&mut self, topics: &[String], qos: QoS) -> Result<(), TransportError>;

    /// Removes subscriptions for every topic in `topics`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be issued.
    fn unsubscribe(&mut self, topics: &[String]) -> Result<(), TransportError>;

    /// Publishes `payload` to `topic`, returning a token for
    /// [`Transport::await_delivery`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the publication cannot be issued.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<DeliveryToken, TransportError>;

    /// Blocks until the publication identified by `token` is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::DeliveryTimeout`] when `timeout` elapses
    /// first, or another variant when the connection fails.
    fn await_delivery(
        &mut self,
        token: DeliveryToken,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Waits up to `timeout` for the next message on any subscription.
    ///
    /// Returns `Ok(None)` when nothing arrives in time.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the connection fails.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError>;

    /// Services connection liveness while the caller is otherwise idle.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the connection has failed.
    fn keepalive(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn subscribe(&mut self, topics: &[String], qos: QoS) -> Result<(), TransportError> {
        (**self).subscribe(topics, qos)
    }

    fn unsubscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        (**self).unsubscribe(topics)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<DeliveryToken, TransportError> {
        (**self).publish(topic, payload, qos, retain)
    }

    fn await_delivery(
        &mut self,
        token: DeliveryToken,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        (**self).await_delivery(token, timeout)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        (**self).receive(timeout)
    }

    fn keepalive(&mut self) -> Result<(), TransportError> {
        (**self).keepalive()
    }
}
