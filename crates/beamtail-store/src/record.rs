//! A single ingested log line

use bytes::Bytes;
use std::borrow::Cow;
use std::sync::Arc;

/// One log line attributed to the beam that sent it
///
/// Cloning is cheap: the label and payload are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: u64,
    label: Arc<str>,
    payload: Bytes,
}

impl Record {
    pub(crate) fn new(index: u64, label: Arc<str>, payload: Bytes) -> Self {
        Self {
            index,
            label,
            payload,
        }
    }

    /// Absolute insertion index, unique for the lifetime of the store
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raw line bytes without the trailing newline
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload as text, invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
