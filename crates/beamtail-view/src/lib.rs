//! Beamtail views
//!
//! Render-ready pages over a [`LogStore`](beamtail_store::LogStore):
//!
//! - [`TailPager`] follows the newest records, updating its page one
//!   record at a time
//! - [`RecordFormatter`] browses history, pretty-printing the selected
//!   record and keeping its neighbours compact
//!
//! All width math goes through [`printable_width`], which ignores ANSI
//! escape sequences, so colored labels and colored payloads wrap the same
//! as plain text.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beamtail_store::LogStore;
//! use beamtail_view::{LabelStyle, TailPager};
//!
//! let store = Arc::new(LogStore::with_capacity(100));
//! let mut pager = TailPager::new(Arc::clone(&store), LabelStyle::plain(" | "));
//! pager.reset(20, 4);
//!
//! store.insert("api", "GET /health 200 OK");
//! pager.advance();
//!
//! assert_eq!(pager.text(), "api | GET /health 20\n      0 OK");
//! ```

mod ansi;
mod formatter;
mod pager;
mod pretty;
mod style;
mod wrap;

pub use ansi::{printable_width, split_at_width};
pub use formatter::RecordFormatter;
pub use pager::TailPager;
pub use pretty::pretty_print;
pub use style::LabelStyle;
pub use wrap::{wrap_block, wrap_line};
