//! Line and column lookup for byte offsets, and caret annotation of errors.

/// Position of a byte offset within its enclosing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLocation {
    /// Offset of the first byte of the line.
    pub line_start: usize,
    /// Offset just past the line and any newlines that terminate it.
    pub line_end: usize,
    /// Distance of the target offset from `line_start`.
    pub column: usize,
}

/// Finds the line containing `offset` in `text`.
///
/// An offset pointing at a newline belongs to the line that newline
/// terminates. Offsets at or past the end of `text` map to an empty location
/// at the end of the text.
#[must_use]
pub fn locate(text: &str, offset: usize) -> TextLocation {
    let bytes = text.as_bytes();
    let len = bytes.len();
    if offset >= len {
        return TextLocation {
            line_start: len,
            line_end: len,
            column: 0,
        };
    }

    let is_newline = |index: usize| bytes.get(index) == Some(&b'\n');

    let mut cursor = offset;
    while cursor > 0 && is_newline(cursor) {
        cursor -= 1;
    }
    while cursor > 0 && !is_newline(cursor) {
        cursor -= 1;
    }
    if is_newline(cursor) {
        cursor += 1;
    }
    let line_start = cursor;

    let mut line_end = offset;
    let mut seen_newline = false;
    while let Some(&byte) = bytes.get(line_end) {
        if byte == b'\n' {
            seen_newline = true;
        } else if seen_newline {
            break;
        }
        line_end += 1;
    }

    TextLocation {
        line_start,
        line_end,
        column: offset.saturating_sub(line_start),
    }
}

/// Renders `message` followed by `text` with a caret under `offset`.
///
/// The caret row is inserted immediately after the offending line; the rest
/// of the text follows it unchanged. Trailing newlines are removed from the
/// result.
#[must_use]
pub fn annotate(text: &str, offset: usize, message: &str) -> String {
    let location = locate(text, offset);
    let (line, rest) = split_at_boundary(text, location.line_end);

    let mut out = String::with_capacity(message.len() + text.len() + location.column + 4);
    out.push_str(message);
    out.push('\n');
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
    }
    out.extend(std::iter::repeat_n('-', location.column));
    out.push_str("^\n");
    out.push_str(rest);

    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out
}

fn split_at_boundary(text: &str, index: usize) -> (&str, &str) {
    if text.is_char_boundary(index) {
        text.split_at(index)
    } else {
        (text, "")
    }
}
