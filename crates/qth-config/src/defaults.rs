//! Compiled-in configuration values, the lowest configuration layer.

use crate::logging::LogFormat;

/// Broker host used when no other layer names one.
pub const DEFAULT_HOST: &str = "localhost";

/// Standard unencrypted MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// Seconds between MQTT keep-alive pings.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 10;

/// Milliseconds to wait for each directory listing snapshot.
pub const DEFAULT_META_TIMEOUT_MS: u64 = 1000;

/// Default log filter expression.
///
/// Kept quiet so that values written to stdout are the only visible output.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Owned broker host used by the configuration defaults.
#[must_use]
pub fn default_host() -> String {
    String::from(DEFAULT_HOST)
}

/// Owned log filter value used by the configuration defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    String::from(DEFAULT_LOG_FILTER)
}

/// Log format used unless `--log-format` or `QTH_LOG_FORMAT` says otherwise.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
