//! Handshake line parsing
//!
//! The first line a beam sends is `key=value` pairs joined by `;`:
//!
//! ```text
//! label=api;pid=4242;host=dev-box
//! ```
//!
//! `label` is required. Other keys are kept but have no meaning to the
//! server. Empty segments (a trailing `;`) are skipped.

use std::collections::BTreeMap;

use crate::error::HandshakeError;

/// Key naming the stream
pub const LABEL_KEY: &str = "label";

/// Parsed handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Identifier of the stream, unique among live connections
    pub label: String,
    /// Every other key sent by the beam
    pub extra: BTreeMap<String, String>,
}

/// Parse a handshake line, with or without its line terminator
pub fn parse_handshake(line: &[u8]) -> Result<Handshake, HandshakeError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = std::str::from_utf8(line).map_err(|_| HandshakeError::InvalidUtf8)?;

    let mut label = None;
    let mut extra = BTreeMap::new();

    for segment in line.split(';') {
        if segment.trim().is_empty() {
            continue;
        }

        let mut parts = segment.split('=');
        let (key, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => (key.trim(), value.trim()),
            _ => return Err(HandshakeError::MalformedSegment(segment.to_string())),
        };

        if key.is_empty() {
            return Err(HandshakeError::MalformedSegment(segment.to_string()));
        }

        if key == LABEL_KEY {
            label = Some(value.to_string());
        } else {
            extra.insert(key.to_string(), value.to_string());
        }
    }

    match label {
        Some(label) if !label.is_empty() => Ok(Handshake { label, extra }),
        _ => Err(HandshakeError::MissingLabel),
    }
}
