//! Client-side core of the Qth conventions for MQTT.
//!
//! Qth organises topics into directories described by retained listing
//! messages under `meta/ls/`. Each leaf declares a behaviour: a property or
//! an event, flowing one-to-many or many-to-one. This crate resolves those
//! listings, checks behaviours against what a command intends to do, and
//! runs the read and write loops behind `get`, `set`, `delete`, `watch`, and
//! `send`.
//!
//! The broker connection is abstracted behind [`Transport`]; command-line
//! parsing and connection setup live in the `qth-cli` crate.

pub mod behaviour;
pub mod command;
pub mod error;
pub mod json;
pub mod listing;
pub mod resolve;
pub mod text;
pub mod topic;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use behaviour::Behaviour;
pub use command::{
    CommandConfig, CommandKind, LinePoll, LineSource, Plan, ReaderLines, ValueSource,
    dispatch_auto, execute, read_values, write_values,
};
pub use error::{ErrorCategory, QthError};
pub use json::{JsonError, JsonFormat};
pub use listing::{DirectoryListing, ListingEntry};
pub use resolve::{Directory, detect, resolve, verify};
pub use text::{TextLocation, annotate, locate};
pub use transport::{DeliveryToken, Message, QoS, Transport, TransportError};
