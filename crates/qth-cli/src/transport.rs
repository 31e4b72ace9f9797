//! MQTT transport backed by the `rumqttc` synchronous client.
//!
//! The client's event loop only advances while it is polled, so every
//! blocking operation here pumps the [`Connection`] until the awaited packet
//! shows up or the deadline passes. Publications that arrive while waiting
//! for something else are queued for [`Transport::receive`]. Requests go
//! through the client's bounded channel without blocking; a full channel is
//! drained by polling before the request is retried.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use qth_config::Config;
use qth_core::{DeliveryToken, Message, QoS, Transport, TransportError};
use rumqttc::{
    Client, ClientError, Connection, Event, MqttOptions, Outgoing, Packet, RecvTimeoutError, SubscribeFilter,
    SubscribeReasonCode,
};
use tracing::{debug, trace};

/// Bound on the wait for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on the wait for SUBACK and UNSUBACK.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a keepalive pulse drives the event loop.
const KEEPALIVE_POLL: Duration = Duration::from_millis(10);
/// How long dropping the transport waits for DISCONNECT to go out.
const DISCONNECT_GRACE: Duration = Duration::from_millis(200);
/// Requests buffered between the client handle and its event loop.
const REQUEST_CAPACITY: usize = 16;

/// A connected MQTT session.
pub(crate) struct MqttTransport {
    client: Client,
    connection: Connection,
    inbox: VecDeque<Message>,
    deliveries: BTreeMap<u64, Delivery>,
    issued: u64,
    sent: u64,
    acks: Acks,
}

/// Progress of one publication.
#[derive(Debug, Clone, Copy)]
struct Delivery {
    qos: rumqttc::QoS,
    packet_id: Option<u16>,
    confirmed: bool,
}

/// Acknowledgements of the subscribe or unsubscribe request in flight.
#[derive(Debug, Default)]
struct Acks {
    connected: bool,
    subscribed: Option<Vec<SubscribeReasonCode>>,
    unsubscribed: usize,
}

/// Connects to the broker named by `config` and waits for CONNACK.
pub(crate) fn connect(config: &Config) -> Result<MqttTransport, TransportError> {
    let options = mqtt_options(config)?;
    debug!(
        client_id = %options.client_id(),
        broker = %config.broker(),
        "connecting"
    );
    let mut transport = MqttTransport::new(options, REQUEST_CAPACITY);

    let deadline = Instant::now() + CONNECT_TIMEOUT;
    while !transport.acks.connected {
        if Instant::now() >= deadline {
            return Err(TransportError::Connection(String::from(
                "timed out waiting for the broker to accept the connection",
            )));
        }
        transport.poll(deadline)?;
    }
    Ok(transport)
}

fn mqtt_options(config: &Config) -> Result<MqttOptions, TransportError> {
    let client_id = match config.client_id() {
        Some(id) if id.is_empty() || id.starts_with(' ') => {
            return Err(TransportError::Rejected(format!("invalid client ID '{id}'")));
        }
        Some(id) => id.to_owned(),
        None => generated_client_id(),
    };
    let mut options = MqttOptions::new(client_id, config.host.as_str(), config.port);
    options
        .set_keep_alive(keep_alive_interval(config.keep_alive()))
        .set_clean_session(true);
    Ok(options)
}

fn generated_client_id() -> String {
    let nanos = time::OffsetDateTime::now_utc().nanosecond();
    format!("qth-cli-{}-{nanos}", std::process::id())
}

/// Keep-alive intervals are whole seconds; zero disables pings.
fn keep_alive_interval(requested: Duration) -> Duration {
    if requested.is_zero() || requested >= Duration::from_secs(1) {
        requested
    } else {
        Duration::from_secs(1)
    }
}

const fn mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

impl MqttTransport {
    fn new(options: MqttOptions, capacity: usize) -> Self {
        let (client, connection) = Client::new(options, capacity);
        Self {
            client,
            connection,
            inbox: VecDeque::new(),
            deliveries: BTreeMap::new(),
            issued: 0,
            sent: 0,
            acks: Acks::default(),
        }
    }

    /// Queues a request on the client, polling the event loop while the
    /// request channel is full.
    fn submit(
        &mut self,
        limit: Duration,
        request: impl Fn(&Client) -> Result<(), ClientError>,
    ) -> Result<(), TransportError> {
        let deadline = Instant::now() + limit;
        loop {
            match request(&self.client) {
                Ok(()) => return Ok(()),
                Err(ClientError::TryRequest(_)) if Instant::now() < deadline => {
                    self.poll(deadline)?;
                }
                Err(error) => return Err(TransportError::Rejected(error.to_string())),
            }
        }
    }

    /// Drives the event loop once, waiting at most until `deadline`.
    ///
    /// Returns whether an event was handled.
    fn poll(&mut self, deadline: Instant) -> Result<bool, TransportError> {
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.connection.recv_timeout(wait) {
            Ok(Ok(event)) => {
                self.record(event);
                Ok(true)
            }
            Ok(Err(error)) => Err(TransportError::Connection(error.to_string())),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Connection(String::from(
                "event loop stopped",
            ))),
        }
    }

    fn record(&mut self, event: Event) {
        trace!(?event, "mqtt event");
        match event {
            Event::Incoming(Packet::ConnAck(_)) => self.acks.connected = true,
            Event::Incoming(Packet::Publish(publish)) => {
                self.inbox
                    .push_back(Message::new(publish.topic, publish.payload.to_vec()));
            }
            Event::Incoming(Packet::SubAck(ack)) => self.acks.subscribed = Some(ack.return_codes),
            Event::Incoming(Packet::UnsubAck(_)) => self.acks.unsubscribed += 1,
            Event::Incoming(Packet::PubAck(ack)) => {
                self.confirm(ack.pkid, rumqttc::QoS::AtLeastOnce);
            }
            Event::Incoming(Packet::PubComp(ack)) => {
                self.confirm(ack.pkid, rumqttc::QoS::ExactlyOnce);
            }
            Event::Outgoing(Outgoing::Publish(packet_id)) => {
                // Publications leave in the order they were issued.
                self.sent += 1;
                if let Some(delivery) = self.deliveries.get_mut(&self.sent) {
                    delivery.packet_id = Some(packet_id);
                    delivery.confirmed = delivery.qos == rumqttc::QoS::AtMostOnce;
                }
            }
            _ => {}
        }
    }

    fn confirm(&mut self, packet_id: u16, qos: rumqttc::QoS) {
        if let Some(delivery) = self.deliveries.values_mut().find(|delivery| {
            !delivery.confirmed && delivery.qos == qos && delivery.packet_id == Some(packet_id)
        }) {
            delivery.confirmed = true;
        }
    }

    /// Pumps events until `done` holds, failing with `timeout` otherwise.
    fn wait_until(
        &mut self,
        limit: Duration,
        done: impl Fn(&Self) -> bool,
        timeout: impl FnOnce() -> TransportError,
    ) -> Result<(), TransportError> {
        let deadline = Instant::now() + limit;
        while !done(&*self) {
            if Instant::now() >= deadline {
                return Err(timeout());
            }
            self.poll(deadline)?;
        }
        Ok(())
    }
}

impl Transport for MqttTransport {
    fn subscribe(&mut self, topics: &[String], qos: QoS) -> Result<(), TransportError> {
        let filters: Vec<SubscribeFilter> = topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), mqtt_qos(qos)))
            .collect();
        self.acks.subscribed = None;
        self.submit(REQUEST_TIMEOUT, |client| {
            client.try_subscribe_many(filters.clone())
        })?;
        self.wait_until(
            REQUEST_TIMEOUT,
            |session| session.acks.subscribed.is_some(),
            || TransportError::Rejected(String::from("subscription was not acknowledged")),
        )?;

        let refused = self
            .acks
            .subscribed
            .take()
            .unwrap_or_default()
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure));
        if refused {
            return Err(TransportError::Rejected(String::from(
                "broker refused the subscription",
            )));
        }
        Ok(())
    }

    fn unsubscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        self.acks.unsubscribed = 0;
        for topic in topics {
            self.submit(REQUEST_TIMEOUT, |client| {
                client.try_unsubscribe(topic.clone())
            })?;
        }
        let expected = topics.len();
        self.wait_until(
            REQUEST_TIMEOUT,
            |session| session.acks.unsubscribed >= expected,
            || TransportError::Rejected(String::from("unsubscription was not acknowledged")),
        )?;

        // Anything still queued for those topics arrived before the UNSUBACK.
        self.inbox
            .retain(|message| !topics.iter().any(|topic| *topic == message.topic));
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<DeliveryToken, TransportError> {
        let level = mqtt_qos(qos);
        self.submit(REQUEST_TIMEOUT, |client| {
            client.try_publish(topic, level, retain, payload.to_vec())
        })?;
        self.issued += 1;
        self.deliveries.insert(
            self.issued,
            Delivery {
                qos: level,
                packet_id: None,
                confirmed: false,
            },
        );
        Ok(DeliveryToken::new(self.issued))
    }

    fn await_delivery(
        &mut self,
        token: DeliveryToken,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let sequence = token.sequence();
        self.wait_until(
            timeout,
            |session| {
                session
                    .deliveries
                    .get(&sequence)
                    .is_none_or(|delivery| delivery.confirmed)
            },
            || TransportError::DeliveryTimeout(timeout),
        )?;
        self.deliveries.remove(&sequence);
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.inbox.pop_front() {
                return Ok(Some(message));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            self.poll(deadline)?;
        }
    }

    fn keepalive(&mut self) -> Result<(), TransportError> {
        let deadline = Instant::now() + KEEPALIVE_POLL;
        while Instant::now() < deadline && self.poll(deadline)? {}
        Ok(())
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if self.submit(DISCONNECT_GRACE, Client::try_disconnect).is_err() {
            return;
        }
        let deadline = Instant::now() + DISCONNECT_GRACE;
        while Instant::now() < deadline {
            match self.connection.recv_timeout(DISCONNECT_GRACE) {
                Ok(Ok(Event::Outgoing(Outgoing::Disconnect))) | Ok(Err(_)) | Err(_) => break,
                Ok(Ok(_)) => {}
            }
        }
    }
}
