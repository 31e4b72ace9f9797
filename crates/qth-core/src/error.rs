//! Error taxonomy for Qth commands.
//!
//! Every failure is fatal to the command that raised it. Messages are the
//! user-facing text the CLI prints; [`QthError::category`] groups them for
//! callers that need to branch on the kind of failure.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::behaviour::Behaviour;
use crate::json::JsonError;
use crate::transport::TransportError;

/// Broad classification of a [`QthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The transport failed to subscribe, publish, or receive.
    Transport,
    /// A bounded wait elapsed.
    Timeout,
    /// Broker data contradicted the Qth conventions or the caller's intent.
    ProtocolViolation,
    /// Malformed JSON in a value, an input line, or a payload.
    Validation,
    /// The command was asked to do something it cannot do.
    Usage,
    /// Local standard input or output failed.
    Io,
}

/// Errors raised by the resolvers and the command engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QthError {
    // -- usage --------------------------------------------------------------
    /// A directory path was neither empty nor terminated by `/`.
    #[error("Path is not a valid directory name (must end in '/' or be empty).")]
    InvalidDirectoryPath {
        /// Offending path.
        path: String,
    },
    /// An automatic command was run without first choosing a concrete one.
    #[error("Automatic commands must be dispatched before they run.")]
    AutoNotDispatched,
    /// A read command was given a value to send.
    #[error("Unexpected value for topic with behaviour '{behaviour}'.")]
    UnexpectedValue {
        /// Behaviour that selected the read command.
        behaviour: Behaviour,
    },

    // -- transport ----------------------------------------------------------
    /// Directory listing subscriptions could not be issued.
    #[error("Could not subscribe to directory listings: {source}")]
    ListingSubscribe {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The transport failed while waiting for listings.
    #[error("MQTT error while fetching directory listing: {source}")]
    ListingReceive {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The topic subscription could not be issued.
    #[error("Could not subscribe to topic: {source}")]
    Subscribe {
        /// Topic being subscribed.
        topic: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The transport failed while waiting for a value.
    #[error("Unable to receive MQTT message: {source}")]
    Receive {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// A publication could not be issued or was not acknowledged.
    #[error("Couldn't send MQTT message: {source}")]
    Publish {
        /// Topic being written.
        topic: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// The connection failed while waiting for standard input.
    #[error("Connection failed while waiting for input: {source}")]
    Keepalive {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    // -- timeouts -----------------------------------------------------------
    /// A directory listing level never delivered a snapshot.
    #[error("Timeout while fetching directory listing.")]
    ListingTimeout {
        /// Directory being resolved.
        path: String,
    },
    /// A publication was not acknowledged in time.
    #[error("Timeout while waiting for MQTT message to send.")]
    DeliveryTimeout {
        /// Topic being written.
        topic: String,
    },
    /// No value arrived for a property.
    #[error("Timeout (property may not have been set).")]
    PropertyTimeout {
        /// Property topic.
        topic: String,
    },
    /// No event arrived.
    #[error("Timeout.")]
    EventTimeout {
        /// Event topic.
        topic: String,
    },

    // -- protocol violations ------------------------------------------------
    /// Some level of the path is missing, is not a directory, or holds a
    /// payload that is not a directory listing.
    #[error("Directory not found.")]
    DirectoryNotFound {
        /// Directory being resolved.
        path: String,
    },
    /// The leaf is not listed in its parent directory.
    #[error("Topic does not exist.")]
    TopicNotFound {
        /// Topic being resolved.
        topic: String,
    },
    /// The leaf does not declare the required behaviour.
    #[error("Topic does not have behaviour '{behaviour}'.")]
    MissingBehaviour {
        /// Topic being verified.
        topic: String,
        /// Behaviour that was required.
        behaviour: Behaviour,
    },
    /// The leaf declares only `DIRECTORY`.
    #[error("Topic is a directory.")]
    TopicIsDirectory {
        /// Topic being detected.
        topic: String,
    },
    /// The leaf declares several non-directory behaviours.
    #[error("Topic has more than one behaviour.")]
    MultipleBehaviours {
        /// Topic being detected.
        topic: String,
    },
    /// The leaf declares a behaviour no command can act on.
    #[error("Topic has unsupported behaviour '{behaviour}'.")]
    UnsupportedBehaviour {
        /// Topic being dispatched.
        topic: String,
        /// Declared behaviour.
        behaviour: Behaviour,
    },
    /// A message arrived for a topic other than the one subscribed.
    #[error("Received message from unexpected topic.")]
    UnexpectedTopic {
        /// Topic that was subscribed.
        expected: String,
        /// Topic the message carried.
        received: String,
    },
    /// A property read returned the empty payload used for deletion.
    #[error("Property was deleted.")]
    PropertyDeleted {
        /// Property topic.
        topic: String,
    },
    /// An event carried an empty payload.
    #[error("Empty (non-JSON) event payload received.")]
    EmptyEvent {
        /// Event topic.
        topic: String,
    },

    // -- validation ---------------------------------------------------------
    /// A directory listing snapshot was not valid JSON.
    #[error("Couldn't parse directory listing: {source}")]
    InvalidListing {
        /// Listing topic that delivered the snapshot.
        topic: String,
        /// Annotated parse failure.
        #[source]
        source: JsonError,
    },
    /// A value to publish was not valid JSON.
    #[error("Value must be valid JSON: {source}")]
    InvalidValue {
        /// Annotated parse failure.
        #[source]
        source: JsonError,
    },
    /// A received payload was not valid JSON.
    #[error("Not a valid JSON value: {source}")]
    InvalidPayload {
        /// Topic that delivered the payload.
        topic: String,
        /// Annotated parse failure.
        #[source]
        source: JsonError,
    },

    // -- local io -----------------------------------------------------------
    /// Standard input could not be read.
    #[error("Couldn't read value from standard input: {source}")]
    ReadInput {
        /// Underlying I/O failure.
        #[source]
        source: Arc<io::Error>,
    },
    /// A value could not be written to the output stream.
    #[error("Couldn't write value: {source}")]
    WriteOutput {
        /// Underlying I/O failure.
        #[source]
        source: Arc<io::Error>,
    },
}

impl QthError {
    /// Classifies this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDirectoryPath { .. }
            | Self::AutoNotDispatched
            | Self::UnexpectedValue { .. } => ErrorCategory::Usage,
            Self::ListingSubscribe { .. }
            | Self::ListingReceive { .. }
            | Self::Subscribe { .. }
            | Self::Receive { .. }
            | Self::Publish { .. }
            | Self::Keepalive { .. } => ErrorCategory::Transport,
            Self::ListingTimeout { .. }
            | Self::DeliveryTimeout { .. }
            | Self::PropertyTimeout { .. }
            | Self::EventTimeout { .. } => ErrorCategory::Timeout,
            Self::DirectoryNotFound { .. }
            | Self::TopicNotFound { .. }
            | Self::MissingBehaviour { .. }
            | Self::TopicIsDirectory { .. }
            | Self::MultipleBehaviours { .. }
            | Self::UnsupportedBehaviour { .. }
            | Self::UnexpectedTopic { .. }
            | Self::PropertyDeleted { .. }
            | Self::EmptyEvent { .. } => ErrorCategory::ProtocolViolation,
            Self::InvalidListing { .. } | Self::InvalidValue { .. } | Self::InvalidPayload { .. } => {
                ErrorCategory::Validation
            }
            Self::ReadInput { .. } | Self::WriteOutput { .. } => ErrorCategory::Io,
        }
    }

    pub(crate) fn read_input(source: io::Error) -> Self {
        Self::ReadInput {
            source: Arc::new(source),
        }
    }

    pub(crate) fn write_output(source: io::Error) -> Self {
        Self::WriteOutput {
            source: Arc::new(source),
        }
    }
}
