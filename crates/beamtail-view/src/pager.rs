//! Live tailing page
//!
//! The page is the last `height` wrapped lines of the newest records.
//! New records are appended at the bottom and the same number of lines
//! drop off the top, so following a busy stream only wraps the records
//! that arrive.

use std::collections::VecDeque;
use std::sync::Arc;

use beamtail_store::{LogStore, Record};

use crate::style::LabelStyle;
use crate::wrap::wrap_line;

/// A record with lines on the page
#[derive(Debug, Clone, Copy)]
struct Span {
    index: u64,
    /// Lines of this record still visible
    lines: usize,
}

/// Page that follows the newest records of a store
#[derive(Debug)]
pub struct TailPager {
    store: Arc<LogStore>,
    style: LabelStyle,
    width: usize,
    height: usize,
    lines: VecDeque<String>,
    /// Records on the page, oldest first
    spans: VecDeque<Span>,
    /// First record not rendered yet
    next_index: u64,
}

impl TailPager {
    /// Create an empty pager; call [`TailPager::reset`] to size it
    pub fn new(store: Arc<LogStore>, style: LabelStyle) -> Self {
        Self {
            store,
            style,
            width: 0,
            height: 0,
            lines: VecDeque::new(),
            spans: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Clear the page and render the newest `height` records
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.lines.clear();
        self.spans.clear();

        let live = self.store.live_range();
        let start = live.end.saturating_sub(height as u64).max(live.start);
        for record in self.store.window(start, live.end) {
            self.push(&record);
        }
        self.next_index = live.end;
    }

    /// Full render for a new viewport size
    ///
    /// Wrap points depend on the width, so nothing of the old page is kept.
    pub fn rerender(&mut self, width: usize, height: usize) {
        log::debug!("Rerendering tail page at {}x{}", width, height);
        self.reset(width, height);
    }

    /// Render the records inserted since the last call
    ///
    /// While tailing this is called once per inserted record and renders
    /// exactly one. If more records than fit on the page were missed, or
    /// the next one to render has been overwritten, the page is rebuilt
    /// instead.
    ///
    /// Returns how many lines at the bottom of the page are new.
    pub fn advance(&mut self) -> usize {
        let live = self.store.live_range();
        if self.next_index >= live.end {
            return 0;
        }

        let missed = live.end - self.next_index;
        if missed > self.height as u64 || self.next_index < live.start {
            log::debug!("Tail pager missed {} records, rebuilding page", missed);
            self.reset(self.width, self.height);
            return self.lines.len();
        }

        let mut added = 0;
        for record in self.store.window(self.next_index, live.end) {
            added += self.push(&record);
        }
        self.next_index = live.end;
        added.min(self.lines.len())
    }

    /// Wrap one record onto the bottom of the page, returning its line count
    fn push(&mut self, record: &Record) -> usize {
        let prefix = self.style.prefix(record.label());
        let wrapped = wrap_line(&prefix, &record.text(), self.width);
        let count = wrapped.len();

        self.lines.extend(wrapped);
        self.spans.push_back(Span {
            index: record.index(),
            lines: count,
        });
        self.trim();
        count
    }

    /// Drop lines from the top until the page fits
    fn trim(&mut self) {
        while self.lines.len() > self.height {
            self.lines.pop_front();
            if let Some(top) = self.spans.front_mut() {
                top.lines -= 1;
                if top.lines == 0 {
                    self.spans.pop_front();
                }
            }
        }
    }

    /// Current page, lines joined with `\n`
    pub fn text(&self) -> String {
        let lines: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        lines.join("\n")
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The bottom `n` lines of the page
    pub fn last_lines(&self, n: usize) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .skip(self.lines.len().saturating_sub(n))
            .map(String::as_str)
    }

    /// Index of the oldest record with a line on the page
    pub fn window_start(&self) -> u64 {
        self.spans.front().map_or(self.next_index, |span| span.index)
    }

    /// Number of records with at least one line on the page
    pub fn items_shown(&self) -> usize {
        self.spans.len()
    }
}
