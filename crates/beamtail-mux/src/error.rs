//! Error types for the ingestion multiplexer

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Faults reported on the error stream
///
/// Only [`MuxError::Bind`] is fatal; it is returned from
/// [`Acceptor::bind`](crate::Acceptor::bind) instead of being sent on the bus.
#[derive(Error, Debug)]
pub enum MuxError {
    /// Listening socket could not be created
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// accept() failed while the listener was still open
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// First line was not a valid handshake
    #[error("handshake from {peer} rejected: {source}")]
    Handshake {
        peer: String,
        #[source]
        source: HandshakeError,
    },

    /// No handshake line arrived in time
    #[error("handshake from {peer} timed out after {timeout:?}")]
    HandshakeTimeout { peer: String, timeout: Duration },

    /// Another live connection already uses this label
    #[error("label '{label}' from {peer} is already connected")]
    DuplicateLabel { label: String, peer: String },

    /// Reading the log stream failed (EOF is not an error)
    #[error("reading stream '{label}' failed: {source}")]
    Read {
        label: String,
        #[source]
        source: io::Error,
    },
}

impl MuxError {
    /// Label the error refers to, if the beam got far enough to name one
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::DuplicateLabel { label, .. } | Self::Read { label, .. } => Some(label),
            _ => None,
        }
    }
}

/// Why a handshake line was rejected
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Connection ended before a full line arrived
    #[error("connection closed before handshake")]
    Closed,

    #[error("handshake exceeds {max} bytes")]
    TooLong { max: usize },

    #[error("handshake is not valid UTF-8")]
    InvalidUtf8,

    /// A segment without exactly one `=`
    #[error("malformed segment '{0}', expected key=value")]
    MalformedSegment(String),

    #[error("missing required key 'label'")]
    MissingLabel,

    #[error("failed to read handshake: {0}")]
    Io(#[from] io::Error),
}

/// Result type for multiplexer operations
pub type Result<T> = std::result::Result<T, MuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_label() {
        let dup = MuxError::DuplicateLabel {
            label: "svcA".to_string(),
            peer: "tcp 127.0.0.1:4000".to_string(),
        };
        assert_eq!(dup.label(), Some("svcA"));
        assert_eq!(
            dup.to_string(),
            "label 'svcA' from tcp 127.0.0.1:4000 is already connected"
        );

        let handshake = MuxError::Handshake {
            peer: "unix#1".to_string(),
            source: HandshakeError::MissingLabel,
        };
        assert_eq!(handshake.label(), None);
        assert_eq!(
            handshake.to_string(),
            "handshake from unix#1 rejected: missing required key 'label'"
        );
    }
}
