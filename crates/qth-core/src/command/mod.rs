//! The `get`, `set`, `delete`, `watch`, `send`, and automatic commands.
//!
//! A command is described by an immutable [`CommandConfig`]. Automatic
//! commands are first settled into a concrete [`Plan`] from the topic's
//! declared behaviour; every other kind maps to a plan directly. Plans then
//! run through either the read loop or the write loop.

mod auto;
mod input;
mod read;
mod write;

use std::io::Write;
use std::time::Duration;

use strum::{Display, EnumString};

use crate::behaviour::Behaviour;
use crate::error::QthError;
use crate::json::JsonFormat;
use crate::transport::Transport;

pub use auto::dispatch_auto;
pub use input::{LinePoll, LineSource, ReaderLines, trim_terminator};
pub use read::read_values;
pub use write::write_values;

/// Wait used for value reads when no timeout is configured.
pub const DEFAULT_VALUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Slice of time a zero ("wait forever") timeout is broken into.
pub const INDEFINITE_WAIT_SLICE: Duration = Duration::from_secs(1);

/// Longest wait on standard input between transport keepalive pulses.
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Command requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CommandKind {
    /// Choose a command from the topic's declared behaviour.
    Auto,
    /// Read a property.
    Get,
    /// Write a property.
    Set,
    /// Clear a property.
    Delete,
    /// Read events.
    Watch,
    /// Write events.
    Send,
}

impl CommandKind {
    /// Whether the command subscribes and prints values.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Get | Self::Watch)
    }

    /// Whether the command publishes values.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Set | Self::Delete | Self::Send)
    }

    /// Whether the command acts on a property rather than an event.
    #[must_use]
    pub const fn is_property(self) -> bool {
        matches!(self, Self::Get | Self::Set | Self::Delete)
    }
}

/// Where a written value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueSource {
    /// No value was supplied.
    #[default]
    None,
    /// The JSON literal `null`, substituted for a missing value.
    Null,
    /// A value given on the command line.
    Argument(String),
    /// One value per line of standard input.
    Stdin,
}

impl ValueSource {
    /// Whether the caller supplied anything at all.
    #[must_use]
    pub const fn is_supplied(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Everything a command needs to know, fixed before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    kind: CommandKind,
    topic: String,
    value: ValueSource,
    count: Option<u32>,
    timeout: Option<Duration>,
    meta_timeout: Duration,
    force: bool,
    strict: bool,
    registering: bool,
    format: JsonFormat,
}

impl CommandConfig {
    /// Configuration for running `kind` against `topic` with defaults for
    /// everything else.
    #[must_use]
    pub fn new(kind: CommandKind, topic: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
            value: ValueSource::None,
            count: None,
            timeout: None,
            meta_timeout: Duration::from_secs(1),
            force: false,
            strict: false,
            registering: false,
            format: JsonFormat::SingleLine,
        }
    }

    /// Sets the value source.
    #[must_use]
    pub fn with_value(mut self, value: ValueSource) -> Self {
        self.value = value;
        self
    }

    /// Sets the number of values to read or write; 0 means unlimited.
    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the wait for values (reads) or acknowledgement (writes); zero
    /// means wait indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the wait for each directory listing snapshot.
    #[must_use]
    pub const fn with_meta_timeout(mut self, meta_timeout: Duration) -> Self {
        self.meta_timeout = meta_timeout;
        self
    }

    /// Skips behaviour verification.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Disables value-driven correction of automatic commands.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Frames the command as the registered owner of the topic, which
    /// reverses the direction verification expects.
    #[must_use]
    pub const fn with_registering(mut self, registering: bool) -> Self {
        self.registering = registering;
        self
    }

    /// Sets how received values are printed.
    #[must_use]
    pub const fn with_format(mut self, format: JsonFormat) -> Self {
        self.format = format;
        self
    }

    /// Requested command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Target topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Supplied value source.
    #[must_use]
    pub const fn value(&self) -> &ValueSource {
        &self.value
    }

    /// Explicit repetition count, if one was given.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        self.count
    }

    /// Explicit value timeout, if one was given.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Wait for each directory listing snapshot.
    #[must_use]
    pub const fn meta_timeout(&self) -> Duration {
        self.meta_timeout
    }

    /// Whether behaviour verification is skipped.
    #[must_use]
    pub const fn force(&self) -> bool {
        self.force
    }

    /// Whether automatic commands keep the kind the behaviour implies.
    #[must_use]
    pub const fn strict(&self) -> bool {
        self.strict
    }

    /// Whether the command acts as the topic's registered owner.
    #[must_use]
    pub const fn registering(&self) -> bool {
        self.registering
    }

    /// Display style for received values.
    #[must_use]
    pub const fn format(&self) -> JsonFormat {
        self.format
    }
}

/// A concrete command with its value source settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    kind: CommandKind,
    value: ValueSource,
    verified: bool,
}

impl Plan {
    /// Plans a non-automatic command directly from its configuration.
    ///
    /// Write commands without a value write `null`.
    ///
    /// # Errors
    ///
    /// Fails for [`CommandKind::Auto`], which needs [`dispatch_auto`], and
    /// for read commands given a value.
    pub fn from_config(config: &CommandConfig) -> Result<Self, QthError> {
        match config.kind() {
            CommandKind::Auto => Err(QthError::AutoNotDispatched),
            kind => Self::settle(kind, config.value().clone(), || {
                expected_behaviour(kind, config.registering())
            }),
        }
    }

    /// Applies the value rules shared by every command kind.
    fn settle(
        kind: CommandKind,
        value: ValueSource,
        behaviour: impl FnOnce() -> Behaviour,
    ) -> Result<Self, QthError> {
        let settled = match (kind, value) {
            (CommandKind::Set | CommandKind::Send, ValueSource::None) => ValueSource::Null,
            (CommandKind::Get | CommandKind::Watch, supplied) if supplied.is_supplied() => {
                return Err(QthError::UnexpectedValue {
                    behaviour: behaviour(),
                });
            }
            (_, other) => other,
        };
        Ok(Self {
            kind,
            value: settled,
            verified: false,
        })
    }

    /// Marks the topic's behaviour as already established, so the loops do
    /// not verify it again.
    const fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Whether the loops should check the topic's behaviour first.
    #[must_use]
    pub const fn needs_verification(&self, config: &CommandConfig) -> bool {
        !self.verified && !config.force()
    }

    /// Settled command kind.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Settled value source.
    #[must_use]
    pub const fn value(&self) -> &ValueSource {
        &self.value
    }

    /// Number of values to handle, 0 meaning unlimited.
    #[must_use]
    pub fn count(&self, config: &CommandConfig) -> u32 {
        if self.kind == CommandKind::Delete {
            return 1;
        }
        config.count().unwrap_or(match self.kind {
            CommandKind::Get if config.registering() => 0,
            CommandKind::Watch => 0,
            CommandKind::Set | CommandKind::Send if self.value == ValueSource::Stdin => 0,
            _ => 1,
        })
    }

    /// Wait for each value or acknowledgement, zero meaning indefinitely.
    #[must_use]
    pub fn timeout(&self, config: &CommandConfig) -> Duration {
        config.timeout().unwrap_or(match self.kind {
            CommandKind::Get
                if config.registering() || config.count().is_some_and(|count| count != 1) =>
            {
                Duration::ZERO
            }
            CommandKind::Watch => Duration::ZERO,
            _ => DEFAULT_VALUE_TIMEOUT,
        })
    }
}

/// Behaviour a command expects its topic to declare.
///
/// Reads expect the one-to-many behaviour and writes the many-to-one
/// behaviour, each reversed when registering.
#[must_use]
pub const fn expected_behaviour(kind: CommandKind, registering: bool) -> Behaviour {
    let one_to_many = kind.is_read() != registering;
    if kind.is_property() {
        Behaviour::property(one_to_many)
    } else {
        Behaviour::event(one_to_many)
    }
}

/// Runs the command described by `config` to completion.
///
/// Values read are written to `output`, one per line. Values to write are
/// taken from `config` or, for [`ValueSource::Stdin`], from `input`.
///
/// # Errors
///
/// Returns the first [`QthError`] raised by dispatch, verification, or the
/// read or write loop.
pub fn execute<T, I, W>(
    config: &CommandConfig,
    transport: &mut T,
    input: &mut I,
    output: &mut W,
) -> Result<(), QthError>
where
    T: Transport + ?Sized,
    I: LineSource + ?Sized,
    W: Write + ?Sized,
{
    let plan = match config.kind() {
        CommandKind::Auto => dispatch_auto(config, transport)?,
        _ => Plan::from_config(config)?,
    };
    if plan.kind().is_read() {
        read_values(config, &plan, transport, output)
    } else {
        write_values(config, &plan, transport, input)
    }
}
