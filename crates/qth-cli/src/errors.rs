//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use qth_config::{BrokerEndpoint, BrokerParseError};
use qth_core::{QthError, TransportError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid broker URL: {0}")]
    Broker(#[from] BrokerParseError),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("Could not connect to MQTT broker at {endpoint}: {source}")]
    Connect {
        endpoint: BrokerEndpoint,
        source: TransportError,
    },
    #[error("{0}")]
    Command(#[from] QthError),
    #[error("Couldn't write listing: {0}")]
    WriteListing(io::Error),
}
