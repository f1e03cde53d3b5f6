//! Per-connection protocol handler
//!
//! ```text
//! Handshaking ──ok──→ Streaming ──EOF──→ Closed  (Unsubscribe)
//!      │                  │
//!      └─reject──→ Closed └─read error──→ Closed  (Error only)
//! ```
//!
//! A rejected handshake never registers a label. The stream is dropped,
//! and with it the connection, whenever the session returns.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::bus::BusSender;
use crate::error::{HandshakeError, MuxError};
use crate::handshake::{parse_handshake, Handshake};
use crate::registry::LabelRegistry;

/// Longest accepted handshake line, terminator included
const MAX_HANDSHAKE_BYTES: u64 = 4096;

/// Longest record; longer lines are split into several records
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Initial line buffer size
const LINE_BUFFER_SIZE: usize = 1024;

/// One beam connection
pub struct Session<S> {
    reader: BufReader<S>,
    peer: String,
    registry: Arc<LabelRegistry>,
    bus: BusSender,
    handshake_timeout: Duration,
    max_record_bytes: usize,
}

impl<S> Session<S>
where
    S: AsyncRead + Unpin,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        registry: Arc<LabelRegistry>,
        bus: BusSender,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            reader: BufReader::new(stream),
            peer: peer.into(),
            registry,
            bus,
            handshake_timeout,
            max_record_bytes: MAX_RECORD_BYTES,
        }
    }

    /// Split records longer than `max` bytes (minimum 1)
    pub fn with_max_record_bytes(mut self, max: usize) -> Self {
        self.max_record_bytes = max.max(1);
        self
    }

    /// Drive the connection until it closes
    pub async fn run(mut self) {
        let handshake = match self.handshake().await {
            Ok(handshake) => handshake,
            Err(e) => {
                log::warn!("Closing {}: {}", self.peer, e);
                self.bus.error(e);
                return;
            }
        };

        let label = handshake.label;
        if !self.registry.try_register(&label, &self.peer) {
            log::warn!("Rejecting {}: label '{}' is already connected", self.peer, label);
            self.bus.error(MuxError::DuplicateLabel {
                label,
                peer: self.peer,
            });
            return;
        }

        log::info!(
            "Beam '{}' connected from {} ({} extra keys)",
            label,
            self.peer,
            handshake.extra.len()
        );
        self.bus.subscribe(&label);

        self.stream(label).await;
    }

    /// Read and parse the first line within the handshake deadline
    async fn handshake(&mut self) -> Result<Handshake, MuxError> {
        let mut line = Vec::with_capacity(128);
        let mut limited = (&mut self.reader).take(MAX_HANDSHAKE_BYTES);
        let read = limited.read_until(b'\n', &mut line);
        let outcome = tokio::time::timeout(self.handshake_timeout, read).await;

        let result = match outcome {
            Err(_) => {
                return Err(MuxError::HandshakeTimeout {
                    peer: self.peer.clone(),
                    timeout: self.handshake_timeout,
                });
            }
            Ok(Err(e)) => Err(HandshakeError::Io(e)),
            Ok(Ok(_)) if line.last() != Some(&b'\n') => {
                if line.len() as u64 >= MAX_HANDSHAKE_BYTES {
                    Err(HandshakeError::TooLong {
                        max: MAX_HANDSHAKE_BYTES as usize,
                    })
                } else {
                    Err(HandshakeError::Closed)
                }
            }
            Ok(Ok(_)) => parse_handshake(&line),
        };

        result.map_err(|source| MuxError::Handshake {
            peer: self.peer.clone(),
            source,
        })
    }

    /// Forward every line as a message until the stream ends
    async fn stream(&mut self, label: String) {
        let shared_label: Arc<str> = Arc::from(label.as_str());
        let mut line = Vec::with_capacity(LINE_BUFFER_SIZE);
        let mut count: u64 = 0;

        loop {
            line.clear();
            let mut limited = (&mut self.reader).take(self.max_record_bytes as u64);
            match limited.read_until(b'\n', &mut line).await {
                Ok(0) => {
                    log::info!("Beam '{}' disconnected after {} lines", label, count);
                    self.registry.deregister(&label);
                    self.bus.unsubscribe(&label);
                    return;
                }
                Ok(_) => {
                    if line.last() == Some(&b'\n') {
                        line.pop();
                    } else if line.len() >= self.max_record_bytes {
                        log::debug!("Splitting oversized record from beam '{}'", label);
                        // a terminator right at the cut ends this record
                        if let Ok(rest) = self.reader.fill_buf().await {
                            if rest.first() == Some(&b'\n') {
                                self.reader.consume(1);
                            }
                        }
                    }
                    count += 1;

                    let data = Bytes::copy_from_slice(&line);
                    if !self.bus.message(Arc::clone(&shared_label), data).await {
                        log::debug!("Consumer gone, closing beam '{}'", label);
                        self.registry.deregister(&label);
                        return;
                    }
                }
                Err(e) => {
                    // No Unsubscribe here: the consumer only learns of the
                    // disconnect through the error.
                    log::warn!("Read from beam '{}' failed: {}", label, e);
                    self.registry.deregister(&label);
                    self.bus.error(MuxError::Read { label, source: e });
                    return;
                }
            }
        }
    }
}
