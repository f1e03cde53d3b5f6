//! Beamtail ingestion multiplexer
//!
//! Beams connect over a UNIX or TCP socket, send one handshake line naming
//! their label, then stream newline-delimited log lines. Each connection
//! runs as its own task; everything that happens is reported to a single
//! consumer through the [`EventBus`].
//!
//! # Wire protocol
//!
//! ```text
//! label=api;pid=4242\n      handshake, `label` is required, other keys ignored
//! GET /health 200\n         one record per line
//! ...
//! <close>                   end of stream
//! ```
//!
//! # Architecture
//!
//! ```text
//! Acceptor ──accept──→ Session (one task per connection)
//!                          │
//!                          ├──→ LabelRegistry (reject duplicate labels)
//!                          │
//!                          └──→ EventBus: Subscribe / Message / Unsubscribe / Error
//!                                   │
//!                                   ▼
//!                              consumer (UI, store writer)
//! ```

mod acceptor;
mod bus;
mod error;
mod handshake;
mod registry;
mod session;

pub use acceptor::{Acceptor, Shutdown};
pub use bus::{BusReceiver, BusSender, Event, EventBus, MessageEvent};
pub use error::{HandshakeError, MuxError, Result};
pub use handshake::{parse_handshake, Handshake, LABEL_KEY};
pub use registry::LabelRegistry;
pub use session::{Session, MAX_RECORD_BYTES};
