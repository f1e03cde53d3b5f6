//! Line wrapping
//!
//! A record renders as `prefix + payload`. When that is wider than the
//! viewport the payload is cut into chunks of `width - prefix width`
//! printable characters; the first chunk follows the prefix and every
//! later chunk is indented by the prefix width so payloads line up:
//!
//! ```text
//! api | GET /health 20
//!       0 OK
//! ```

use crate::ansi::{printable_width, split_at_width};

/// Wrap one payload line behind `prefix`
///
/// Always returns at least one line. If the prefix alone fills the
/// width, chunks are one character wide.
pub fn wrap_line(prefix: &str, payload: &str, width: usize) -> Vec<String> {
    let prefix_width = printable_width(prefix);
    if prefix_width + printable_width(payload) <= width {
        return vec![format!("{}{}", prefix, payload)];
    }

    let chunk = width.saturating_sub(prefix_width).max(1);
    let indent = " ".repeat(prefix_width);

    let mut lines = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let (head, tail) = split_at_width(rest, chunk);
        let lead = if lines.is_empty() { prefix } else { indent.as_str() };
        lines.push(format!("{}{}", lead, head));
        rest = tail;
    }

    if lines.is_empty() {
        lines.push(prefix.to_string());
    }
    lines
}

/// Wrap multi-line text behind `prefix`
///
/// The first text line follows the prefix; the others are indented by
/// the prefix width, then each is wrapped on its own.
pub fn wrap_block<'a>(
    prefix: &str,
    text_lines: impl IntoIterator<Item = &'a str>,
    width: usize,
) -> Vec<String> {
    let indent = " ".repeat(printable_width(prefix));
    let mut lines = Vec::new();

    for (i, text) in text_lines.into_iter().enumerate() {
        let lead = if i == 0 { prefix } else { indent.as_str() };
        lines.extend(wrap_line(lead, text, width));
    }

    if lines.is_empty() {
        lines.push(prefix.to_string());
    }
    lines
}
