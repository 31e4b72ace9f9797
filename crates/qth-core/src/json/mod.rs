//! Strict JSON parsing with annotated errors, and display formatting.
//!
//! Parsing is delegated to `serde_json`; this module adds the requirement
//! that a document is consumed in full and converts parser positions into
//! byte offsets so failures can be rendered with [`crate::text::annotate`].

use serde_json::Value;
use serde_json::error::Category;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::text;

const EXTRA_INPUT: &str = "unexpected extra input";
const EMPTY_INPUT: &str = "EOF while parsing a value";
const INVALID_UTF8: &str = "invalid UTF-8 sequence";

/// Display styles for JSON values written to the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum JsonFormat {
    /// Compact single-line rendering.
    #[default]
    SingleLine,
    /// Indented multi-line rendering.
    Pretty,
    /// The input text, byte for byte.
    Verbatim,
    /// Nothing at all.
    Quiet,
}

/// A JSON document that failed to parse.
///
/// Displays as the parser message followed by the offending text with a
/// caret marking the failure position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{annotated}")]
pub struct JsonError {
    offset: usize,
    message: String,
    annotated: String,
}

impl JsonError {
    fn new(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let bare = message.into();
        let annotated = text::annotate(text, offset, &bare);
        Self {
            offset,
            message: bare,
            annotated,
        }
    }

    /// Byte offset of the failure within the parsed text.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parser message without location information.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Parses `text` as exactly one JSON value.
///
/// Whitespace may surround the value; anything else after it is rejected as
/// unexpected extra input.
///
/// # Errors
///
/// Returns [`JsonError`] describing the first syntax error.
pub fn parse(text: &str) -> Result<Value, JsonError> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(error)) => return Err(from_serde(text, &error)),
        None => return Err(JsonError::new(text, text.len(), EMPTY_INPUT)),
    };

    let consumed = stream.byte_offset();
    let rest = text.get(consumed..).unwrap_or_default();
    let trailing = rest.trim_start_matches(is_json_whitespace);
    if trailing.is_empty() {
        Ok(value)
    } else {
        let offset = consumed + (rest.len() - trailing.len());
        Err(JsonError::new(text, offset, EXTRA_INPUT))
    }
}

/// Parses a raw payload, rejecting bytes that are not UTF-8.
///
/// # Errors
///
/// Returns [`JsonError`] for invalid UTF-8 or invalid JSON.
pub fn parse_bytes(bytes: &[u8]) -> Result<(&str, Value), JsonError> {
    match std::str::from_utf8(bytes) {
        Ok(text) => parse(text).map(|value| (text, value)),
        Err(error) => {
            let lossy = String::from_utf8_lossy(bytes);
            Err(JsonError::new(&lossy, error.valid_up_to(), INVALID_UTF8))
        }
    }
}

/// Checks that `text` is a single valid JSON value.
///
/// # Errors
///
/// Returns the same [`JsonError`] that [`parse`] would.
pub fn validate(text: &str) -> Result<(), JsonError> {
    parse(text).map(drop)
}

/// Renders valid JSON `text` in the requested style.
///
/// [`JsonFormat::Verbatim`] and [`JsonFormat::Quiet`] never parse the input.
///
/// # Errors
///
/// Returns [`JsonError`] when a re-serialising style is requested for text
/// that is not valid JSON.
pub fn format(text: &str, style: JsonFormat) -> Result<String, JsonError> {
    match style {
        JsonFormat::Verbatim => Ok(text.to_owned()),
        JsonFormat::Quiet => Ok(String::new()),
        JsonFormat::SingleLine | JsonFormat::Pretty => {
            let value = parse(text)?;
            Ok(render(text, &value, style))
        }
    }
}

/// Renders an already parsed value, using `text` for the verbatim style.
#[must_use]
pub fn render(text: &str, value: &Value, style: JsonFormat) -> String {
    match style {
        JsonFormat::SingleLine => value.to_string(),
        JsonFormat::Pretty => format!("{value:#}"),
        JsonFormat::Verbatim => text.to_owned(),
        JsonFormat::Quiet => String::new(),
    }
}

const fn is_json_whitespace(character: char) -> bool {
    matches!(character, ' ' | '\t' | '\n' | '\r')
}

fn from_serde(text: &str, error: &serde_json::Error) -> JsonError {
    let line_start = line_start_offset(text, error.line());
    // serde_json reports the column just past the byte it rejected, except at
    // end of input where the column is the input length.
    let offset = match error.classify() {
        Category::Eof => line_start + error.column(),
        Category::Io | Category::Syntax | Category::Data => {
            (line_start + error.column()).saturating_sub(1)
        }
    };
    JsonError::new(text, offset.min(text.len()), bare_message(error))
}

fn line_start_offset(text: &str, line: usize) -> usize {
    if line <= 1 {
        return 0;
    }
    text.match_indices('\n')
        .nth(line - 2)
        .map_or(text.len(), |(index, _)| index + 1)
}

fn bare_message(error: &serde_json::Error) -> String {
    let rendered = error.to_string();
    let message = rendered
        .rfind(" at line ")
        .and_then(|index| rendered.get(..index))
        .unwrap_or(&rendered);
    if message == "trailing characters" {
        String::from(EXTRA_INPUT)
    } else {
        message.to_owned()
    }
}
