//! Formats for the diagnostics `qth` writes to stderr.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rendering of `qth` diagnostic events, chosen with `--log-format` or
/// `QTH_LOG_FORMAT`. Values printed on stdout are never affected.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Timestamp, level, target and message on one terminal line.
    #[default]
    Compact,
    /// One JSON object per event with the event fields flattened.
    Json,
}

/// Error returned when `--log-format` names neither `compact` nor `json`.
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("compact", LogFormat::Compact)]
    #[case("JSON", LogFormat::Json)]
    fn names_are_case_insensitive(#[case] text: &str, #[case] expected: LogFormat) {
        assert_eq!(text.parse::<LogFormat>(), Ok(expected));
    }

    #[test]
    fn displays_as_flag_value() {
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
