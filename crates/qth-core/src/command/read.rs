use std::io::Write;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::QthError;
use crate::json;
use crate::resolve::verify;
use crate::transport::{Message, QoS, Transport};

use super::{CommandConfig, INDEFINITE_WAIT_SLICE, Plan, expected_behaviour};

/// Runs the read loop for a `get` or `watch` plan.
///
/// Each received value is validated, formatted, and written to `output`
/// followed by a newline. The topic subscription is always removed before
/// returning; failing to remove it is logged and otherwise ignored.
///
/// # Errors
///
/// Fails on verification or subscription failure, on timeouts, on messages
/// from other topics, on empty payloads, on invalid JSON, and when `output`
/// cannot be written.
pub fn read_values<T, W>(
    config: &CommandConfig,
    plan: &Plan,
    transport: &mut T,
    output: &mut W,
) -> Result<(), QthError>
where
    T: Transport + ?Sized,
    W: Write + ?Sized,
{
    let topic = config.topic();
    if plan.needs_verification(config) {
        let desired = expected_behaviour(plan.kind(), config.registering());
        verify(transport, topic, &desired, config.meta_timeout())?;
    }

    let topics = [topic.to_owned()];
    transport
        .subscribe(&topics, QoS::ExactlyOnce)
        .map_err(|source| QthError::Subscribe {
            topic: topic.to_owned(),
            source,
        })?;
    debug!(topic, kind = %plan.kind(), "subscribed");

    let reader = Reader {
        topic,
        property: plan.kind().is_property(),
        timeout: plan.timeout(config),
        format: config.format(),
    };
    let outcome = reader.run(transport, output, plan.count(config));

    if let Err(error) = transport.unsubscribe(&topics) {
        warn!(topic, %error, "failed to unsubscribe");
    }
    outcome
}

struct Reader<'a> {
    topic: &'a str,
    property: bool,
    timeout: Duration,
    format: json::JsonFormat,
}

impl Reader<'_> {
    fn run<T, W>(&self, transport: &mut T, output: &mut W, count: u32) -> Result<(), QthError>
    where
        T: Transport + ?Sized,
        W: Write + ?Sized,
    {
        let mut remaining = count;
        loop {
            let message = self.next_message(transport)?;
            let rendered = self.render(&message)?;
            writeln!(output, "{rendered}")
                .and_then(|()| output.flush())
                .map_err(QthError::write_output)?;

            if remaining > 0 {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(());
                }
            }
        }
    }

    fn next_message<T>(&self, transport: &mut T) -> Result<Message, QthError>
    where
        T: Transport + ?Sized,
    {
        let receive_error = |source| QthError::Receive { source };
        if self.timeout.is_zero() {
            loop {
                if let Some(message) = transport
                    .receive(INDEFINITE_WAIT_SLICE)
                    .map_err(receive_error)?
                {
                    return Ok(message);
                }
            }
        }

        transport
            .receive(self.timeout)
            .map_err(receive_error)?
            .ok_or_else(|| {
                let topic = self.topic.to_owned();
                if self.property {
                    QthError::PropertyTimeout { topic }
                } else {
                    QthError::EventTimeout { topic }
                }
            })
    }

    fn render(&self, message: &Message) -> Result<String, QthError> {
        if message.topic != self.topic {
            return Err(QthError::UnexpectedTopic {
                expected: self.topic.to_owned(),
                received: message.topic.clone(),
            });
        }

        if message.payload.is_empty() {
            let topic = self.topic.to_owned();
            return Err(if self.property {
                QthError::PropertyDeleted { topic }
            } else {
                QthError::EmptyEvent { topic }
            });
        }

        let (text, value) =
            json::parse_bytes(&message.payload).map_err(|source| QthError::InvalidPayload {
                topic: self.topic.to_owned(),
                source,
            })?;
        Ok(json::render(text, &value, self.format))
    }
}
