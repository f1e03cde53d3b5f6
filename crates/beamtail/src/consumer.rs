//! Drains the event bus into the store and the live tail

use std::io::{self, Write};
use std::sync::Arc;

use beamtail_mux::{BusReceiver, Event, MessageEvent};
use beamtail_store::LogStore;
use beamtail_view::{LabelStyle, TailPager};

use crate::roster::Roster;

/// Single consumer of the bus
///
/// Every message is inserted into the store and the pager is advanced;
/// the page lines it adds are written to `out`. Connects, disconnects and
/// errors are written as notices.
pub struct Consumer<W> {
    store: Arc<LogStore>,
    pager: TailPager,
    roster: Roster,
    out: W,
}

impl<W: Write> Consumer<W> {
    pub fn new(store: Arc<LogStore>, style: LabelStyle, width: usize, height: usize, out: W) -> Self {
        let mut pager = TailPager::new(Arc::clone(&store), style);
        pager.reset(width, height);
        Self {
            store,
            pager,
            roster: Roster::new(),
            out,
        }
    }

    /// Handle events until every sender is gone or writing fails
    pub async fn run(&mut self, receiver: &mut BusReceiver) -> io::Result<()> {
        while let Some(event) = receiver.next_event().await {
            self.handle(event)?;
        }
        log::info!("Event bus closed");
        Ok(())
    }

    pub fn handle(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Message(message) => self.message(message)?,
            Event::Subscribe(label) => {
                self.roster.subscribe(&label);
                log::info!("Subscribed '{}' ({} active)", label, self.roster.active_count());
                writeln!(self.out, "-- {} connected", label)?;
            }
            Event::Unsubscribe(label) => {
                self.roster.unsubscribe(&label);
                log::info!("Unsubscribed '{}' ({} active)", label, self.roster.active_count());
                writeln!(self.out, "-- {} disconnected", label)?;
            }
            Event::Error(error) => {
                log::warn!("Beam error: {}", error);
                self.roster.record_error(&error);
                writeln!(self.out, "-- error: {}", error)?;
            }
        }
        self.out.flush()
    }

    fn message(&mut self, message: MessageEvent) -> io::Result<()> {
        self.store.insert(message.label, message.data);
        let added = self.pager.advance();
        for line in self.pager.last_lines(added) {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn pager(&self) -> &TailPager {
        &self.pager
    }
}
