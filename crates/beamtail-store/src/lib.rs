//! Beamtail log store
//!
//! In-memory history of every line ingested from beams. Records are kept
//! in a fixed-capacity ring: once `capacity` further lines arrive, the
//! oldest record is overwritten. Nothing is persisted.
//!
//! # Example
//!
//! ```
//! use beamtail_store::LogStore;
//!
//! let store = LogStore::with_capacity(2);
//! store.insert("api", "starting");
//! store.insert("api", "listening on :8080");
//! store.insert("worker", "ready");
//!
//! let tail: Vec<_> = store.tail(10).iter().map(|r| r.text().into_owned()).collect();
//! assert_eq!(tail, vec!["listening on :8080", "ready"]);
//! ```

mod record;
mod ring;

pub use record::Record;
pub use ring::{LogStore, DEFAULT_CAPACITY};
