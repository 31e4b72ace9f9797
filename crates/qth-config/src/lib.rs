//! Shared configuration for the Qth command-line client.
//!
//! [`Config`] is layered by `ortho_config`: the defaults below, then any
//! discovered configuration file, then `QTH_*` environment variables, then
//! command-line flags.

mod broker;
pub mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use broker::{BrokerEndpoint, BrokerParseError};
pub use defaults::{
    DEFAULT_HOST, DEFAULT_KEEP_ALIVE_SECS, DEFAULT_LOG_FILTER, DEFAULT_META_TIMEOUT_MS,
    DEFAULT_PORT, default_host, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Connection and logging settings for a single `qth` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "QTH")]
pub struct Config {
    /// Host name or address of the MQTT broker.
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port of the MQTT broker.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Seconds between MQTT keep-alive pings; zero disables them.
    #[ortho_config(default = DEFAULT_KEEP_ALIVE_SECS)]
    pub keep_alive: u64,
    /// Explicit MQTT client identifier; generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Milliseconds to wait for each directory listing snapshot.
    #[ortho_config(default = DEFAULT_META_TIMEOUT_MS)]
    pub meta_timeout_ms: u64,
    /// `tracing` filter directive.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            keep_alive: DEFAULT_KEEP_ALIVE_SECS,
            client_id: None,
            meta_timeout_ms: DEFAULT_META_TIMEOUT_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Broker endpoint assembled from the host and port.
    #[must_use]
    pub fn broker(&self) -> BrokerEndpoint {
        BrokerEndpoint::new(self.host.as_str(), self.port)
    }

    /// Interval between keep-alive pings.
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive)
    }

    /// Configured client identifier, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Bound on each wait for a directory listing snapshot.
    #[must_use]
    pub const fn meta_timeout(&self) -> Duration {
        Duration::from_millis(self.meta_timeout_ms)
    }

    /// Log filter expression used to initialise telemetry.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format used to initialise telemetry.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
