//! Browse mode over the store
//!
//! One record is selected and pretty-printed; the records after it fill
//! the rest of the page in compact form. Moving down keeps the window
//! where it is until the selected record would fall off the bottom, then
//! whole records are dropped from the top. Moving up past the top moves
//! the window start to the selection and the bottom is cut instead.

use std::sync::Arc;

use beamtail_store::{LogStore, Record};

use crate::pretty::pretty_print;
use crate::style::LabelStyle;
use crate::wrap::{wrap_block, wrap_line};

/// Random-access page with one expanded record
#[derive(Debug)]
pub struct RecordFormatter {
    store: Arc<LogStore>,
    style: LabelStyle,
    width: usize,
    page_size: usize,
    selected: Option<u64>,
    window_start: u64,
    lines: Vec<String>,
}

impl RecordFormatter {
    pub fn new(store: Arc<LogStore>, style: LabelStyle, width: usize, page_size: usize) -> Self {
        Self {
            store,
            style,
            width,
            page_size,
            selected: None,
            window_start: 0,
            lines: Vec::new(),
        }
    }

    /// Select `index` and build the page starting at it
    ///
    /// Indices older than the live window are moved up to the oldest live
    /// record. An index that was never written is rejected: the previous
    /// selection and page are kept and `false` is returned.
    pub fn load(&mut self, index: u64) -> bool {
        self.select(index, |_, selected| selected)
    }

    /// Select the record after the current one
    pub fn next(&mut self) -> bool {
        match self.selected {
            Some(selected) => self.select(selected.saturating_add(1), |start, _| start),
            None => false,
        }
    }

    /// Select the record before the current one
    pub fn previous(&mut self) -> bool {
        match self.selected {
            Some(selected) => {
                self.select(selected.saturating_sub(1), |start, selected| start.min(selected))
            }
            None => false,
        }
    }

    /// Rebuild the page for a new viewport size
    pub fn resize(&mut self, width: usize, page_size: usize) {
        self.width = width;
        self.page_size = page_size;
        if let Some(selected) = self.selected {
            let start = self.window_start;
            self.select(selected, |_, _| start);
        }
    }

    /// Validate `index` and rebuild with the window start `anchor` picks
    /// from (current start, new selection)
    fn select(&mut self, index: u64, anchor: impl FnOnce(u64, u64) -> u64) -> bool {
        let live = self.store.live_range();
        if index >= live.end {
            log::debug!("Rejecting selection of unwritten record {}", index);
            return false;
        }

        let index = index.max(live.start);
        let Some(record) = self.store.at(index) else {
            log::debug!("Rejecting selection of empty slot {}", index);
            return false;
        };

        let start = anchor(self.window_start, index).min(index);
        self.selected = Some(index);
        self.build(start, &record);
        true
    }

    fn build(&mut self, start: u64, selected: &Record) {
        let index = selected.index();
        let page_size = self.page_size as u64;

        // every record takes at least one line, so nothing further up fits
        let start = start
            .max((index + 1).saturating_sub(page_size))
            .max(self.store.live_range().start);
        let mut blocks: Vec<(u64, Vec<String>)> = self
            .store
            .window(start, index)
            .iter()
            .map(|record| (record.index(), self.compact(record)))
            .collect();
        blocks.push((index, self.expanded(selected)));

        let mut total: usize = blocks.iter().map(|(_, lines)| lines.len()).sum();
        let mut skip = 0;
        while total > self.page_size && skip + 1 < blocks.len() {
            total -= blocks[skip].1.len();
            skip += 1;
        }
        self.window_start = blocks[skip].0;

        let mut lines: Vec<String> = blocks
            .into_iter()
            .skip(skip)
            .flat_map(|(_, lines)| lines)
            .collect();

        if lines.len() < self.page_size {
            let span = page_size.min(self.store.capacity() as u64);
            for record in self.store.window(index + 1, index + 1 + span) {
                lines.extend(self.compact(&record));
                if lines.len() >= self.page_size {
                    break;
                }
            }
        }
        lines.truncate(self.page_size);
        self.lines = lines;
    }

    fn compact(&self, record: &Record) -> Vec<String> {
        let prefix = self.style.prefix(record.label());
        wrap_line(&prefix, &record.text(), self.width)
    }

    fn expanded(&self, record: &Record) -> Vec<String> {
        let prefix = self.style.prefix(record.label());
        let text = record.text();
        match pretty_print(&text) {
            Some(pretty) => wrap_block(&prefix, pretty.iter().map(String::as_str), self.width),
            None => wrap_line(&prefix, &text, self.width),
        }
    }

    /// Current page, lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn selected(&self) -> Option<u64> {
        self.selected
    }

    /// Index of the top record on the page
    pub fn window_start(&self) -> u64 {
        self.window_start
    }
}
