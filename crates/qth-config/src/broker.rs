//! Broker URLs accepted by `--broker`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_PORT;

/// Network location of the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    host: String,
    port: u16,
}

impl BrokerEndpoint {
    /// Builds an endpoint from a host name and TCP port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port of the broker.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "mqtt://{}:{}", self.host, self.port)
    }
}

impl FromStr for BrokerEndpoint {
    type Err = BrokerParseError;

    /// Accepts `mqtt://host[:port]` or `tcp://host[:port]`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "mqtt" | "tcp" => {
                let host = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| BrokerParseError::MissingHost(input.to_owned()))?;
                Ok(Self::new(host, url.port().unwrap_or(DEFAULT_PORT)))
            }
            other => Err(BrokerParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Errors encountered while parsing a [`BrokerEndpoint`] from text.
#[derive(Debug, Error)]
pub enum BrokerParseError {
    /// Scheme was not recognised.
    #[error("unsupported broker scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing broker host in '{0}'")]
    MissingHost(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
