use std::time::Duration;

use tracing::debug;

use crate::error::QthError;
use crate::json;
use crate::resolve::verify;
use crate::transport::{QoS, Transport, TransportError};

use super::input::{LinePoll, LineSource, trim_terminator};
use super::{
    CommandConfig, CommandKind, INDEFINITE_WAIT_SLICE, INPUT_POLL_INTERVAL, Plan, ValueSource,
    expected_behaviour,
};

const NULL: &str = "null";

/// Runs the write loop for a `set`, `delete`, or `send` plan.
///
/// Property writes are retained and event writes are not. A value from the
/// command line is written once; values from `input` are written one per
/// line until the count is reached or input ends, with empty lines written
/// as `null`. The transport is kept alive while waiting for input.
///
/// # Errors
///
/// Fails on verification failure, invalid JSON, input failure, and when a
/// publication is not issued or acknowledged in time. Nothing is retried.
pub fn write_values<T, I>(
    config: &CommandConfig,
    plan: &Plan,
    transport: &mut T,
    input: &mut I,
) -> Result<(), QthError>
where
    T: Transport + ?Sized,
    I: LineSource + ?Sized,
{
    let topic = config.topic();
    if plan.needs_verification(config) {
        let desired = expected_behaviour(plan.kind(), config.registering());
        verify(transport, topic, &desired, config.meta_timeout())?;
    }

    let writer = Writer {
        topic,
        retain: plan.kind().is_property(),
        timeout: plan.timeout(config),
    };
    let mut values = Values::new(plan);
    let mut remaining = plan.count(config);

    while let Some(payload) = values.next(transport, input)? {
        writer.publish(transport, &payload)?;
        if remaining > 0 {
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
    }
    Ok(())
}

/// Payloads to publish, in order.
enum Values {
    Fixed(Option<String>),
    Lines,
}

impl Values {
    fn new(plan: &Plan) -> Self {
        match (plan.kind(), plan.value()) {
            (CommandKind::Delete, _) => Self::Fixed(Some(String::new())),
            (_, ValueSource::Stdin) => Self::Lines,
            (_, ValueSource::Argument(value)) => Self::Fixed(Some(value.clone())),
            (_, ValueSource::None | ValueSource::Null) => Self::Fixed(Some(String::from(NULL))),
        }
    }

    fn next<T, I>(&mut self, transport: &mut T, input: &mut I) -> Result<Option<String>, QthError>
    where
        T: Transport + ?Sized,
        I: LineSource + ?Sized,
    {
        match self {
            Self::Fixed(value) => {
                let Some(payload) = value.take() else {
                    return Ok(None);
                };
                if !payload.is_empty() {
                    json::validate(&payload).map_err(|source| QthError::InvalidValue { source })?;
                }
                Ok(Some(payload))
            }
            Self::Lines => {
                let Some(line) = read_line(transport, input)? else {
                    return Ok(None);
                };
                let body = trim_terminator(&line);
                if body.is_empty() {
                    return Ok(Some(String::from(NULL)));
                }
                json::validate(body).map_err(|source| QthError::InvalidValue { source })?;
                Ok(Some(body.to_owned()))
            }
        }
    }
}

/// Waits for the next line of input, pulsing the transport between polls.
fn read_line<T, I>(transport: &mut T, input: &mut I) -> Result<Option<String>, QthError>
where
    T: Transport + ?Sized,
    I: LineSource + ?Sized,
{
    loop {
        match input.poll_line(INPUT_POLL_INTERVAL) {
            LinePoll::Line(line) => return Ok(Some(line)),
            LinePoll::Pending => transport
                .keepalive()
                .map_err(|source| QthError::Keepalive { source })?,
            LinePoll::Closed => return Ok(None),
            LinePoll::Failed(error) => return Err(QthError::read_input(error)),
        }
    }
}

struct Writer<'a> {
    topic: &'a str,
    retain: bool,
    timeout: Duration,
}

impl Writer<'_> {
    fn publish<T>(&self, transport: &mut T, payload: &str) -> Result<(), QthError>
    where
        T: Transport + ?Sized,
    {
        let token = transport
            .publish(self.topic, payload.as_bytes(), QoS::ExactlyOnce, self.retain)
            .map_err(|source| self.publish_error(source))?;

        let confirmed = if self.timeout.is_zero() {
            loop {
                match transport.await_delivery(token, INDEFINITE_WAIT_SLICE) {
                    Err(TransportError::DeliveryTimeout(_)) => {}
                    other => break other,
                }
            }
        } else {
            transport.await_delivery(token, self.timeout)
        };
        confirmed.map_err(|source| self.publish_error(source))?;

        debug!(topic = self.topic, retain = self.retain, bytes = payload.len(), "published");
        Ok(())
    }

    fn publish_error(&self, source: TransportError) -> QthError {
        let topic = self.topic.to_owned();
        match source {
            TransportError::DeliveryTimeout(_) => QthError::DeliveryTimeout { topic },
            other => QthError::Publish {
                topic,
                source: other,
            },
        }
    }
}
