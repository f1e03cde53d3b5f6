//! ANSI escape handling
//!
//! Splits text into printable runs and escape sequences. Only the
//! printable runs count toward width; escapes are carried along with the
//! text they sit in so slicing never cuts one in half.

use ansi_parser::{AnsiParser, Output};

/// A run of text that is either all printable or one escape sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Escape(&'a str),
}

/// Byte offset of `part` inside `whole`; `part` must be a subslice
fn offset_in(whole: &str, part: &str) -> usize {
    part.as_ptr() as usize - whole.as_ptr() as usize
}

/// Split `s` into printable and escape segments, in order
///
/// The parser yields printable blocks as slices of the input, so whatever
/// lies between two blocks is escape bytes.
pub(crate) fn segments(s: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;

    for block in s.ansi_parse() {
        if let Output::TextBlock(text) = block {
            let start = offset_in(s, text);
            if start > pos {
                out.push(Segment::Escape(&s[pos..start]));
            }
            if !text.is_empty() {
                out.push(Segment::Text(text));
            }
            pos = start + text.len();
        }
    }

    if pos < s.len() {
        out.push(Segment::Escape(&s[pos..]));
    }
    out
}

/// Number of characters that occupy a column, escapes excluded
pub fn printable_width(s: &str) -> usize {
    segments(s)
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.chars().count(),
            Segment::Escape(_) => 0,
        })
        .sum()
}

/// Split after `width` printable characters
///
/// Escapes that precede the first character of the tail stay with the
/// head. Returns `(s, "")` when `s` is not wider than `width`.
pub fn split_at_width(s: &str, width: usize) -> (&str, &str) {
    let mut remaining = width;

    for segment in segments(s) {
        if let Segment::Text(text) = segment {
            let chars = text.chars().count();
            if chars <= remaining {
                remaining -= chars;
                continue;
            }
            let cut = text
                .char_indices()
                .nth(remaining)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            return s.split_at(offset_in(s, text) + cut);
        }
    }

    (s, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";

    #[test]
    fn test_plain_width() {
        assert_eq!(printable_width(""), 0);
        assert_eq!(printable_width("hello"), 5);
        assert_eq!(printable_width("größe"), 5);
    }

    #[test]
    fn test_escapes_are_zero_width() {
        let colored = format!("{}api{}", RED, RESET);
        assert_eq!(printable_width(&colored), 3);
        assert_eq!(printable_width(&format!("{}{}", RED, RESET)), 0);
        assert_eq!(printable_width("\x1b[1;38;5;200mbold\x1b[0m!"), 5);
    }

    #[test]
    fn test_segments_cover_input() {
        let s = format!("a{}bc{}", RED, RESET);
        let segs = segments(&s);
        assert_eq!(
            segs,
            vec![
                Segment::Text("a"),
                Segment::Escape(RED),
                Segment::Text("bc"),
                Segment::Escape(RESET),
            ]
        );
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(split_at_width("abcdef", 4), ("abcd", "ef"));
        assert_eq!(split_at_width("abc", 4), ("abc", ""));
        assert_eq!(split_at_width("abc", 0), ("", "abc"));
    }

    #[test]
    fn test_split_keeps_escapes_whole() {
        let s = format!("{}abc{}def", RED, RESET);
        let (head, tail) = split_at_width(&s, 3);
        assert_eq!(head, format!("{}abc{}", RED, RESET));
        assert_eq!(tail, "def");
        assert_eq!(printable_width(head), 3);
    }

    #[test]
    fn test_split_multibyte() {
        let (head, tail) = split_at_width("añb", 2);
        assert_eq!(head, "añ");
        assert_eq!(tail, "b");
    }
}
