//! Every beam seen since startup
//!
//! Beams stay listed after they go away, flagged as disconnected. A label
//! that connects again is flagged live again.

use beamtail_mux::MuxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub label: String,
    pub disconnected: bool,
    /// How many times this label has connected
    pub sessions: u32,
}

#[derive(Debug, Default)]
pub struct Roster {
    subscribers: Vec<Subscriber>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, label: &str) {
        match self.find_mut(label) {
            Some(subscriber) => {
                subscriber.disconnected = false;
                subscriber.sessions += 1;
            }
            None => self.subscribers.push(Subscriber {
                label: label.to_string(),
                disconnected: false,
                sessions: 1,
            }),
        }
    }

    pub fn unsubscribe(&mut self, label: &str) {
        self.mark_disconnected(label);
    }

    /// Note the disconnect a read error implies
    ///
    /// A failed read is reported without an Unsubscribe. Other errors do
    /// not change a subscriber: a duplicate label leaves the first holder
    /// connected.
    pub fn record_error(&mut self, error: &MuxError) {
        if let MuxError::Read { label, .. } = error {
            self.mark_disconnected(label);
        }
    }

    fn mark_disconnected(&mut self, label: &str) {
        match self.find_mut(label) {
            Some(subscriber) => subscriber.disconnected = true,
            None => log::warn!("Disconnect for unknown beam '{}'", label),
        }
    }

    fn find_mut(&mut self, label: &str) -> Option<&mut Subscriber> {
        self.subscribers.iter_mut().find(|s| s.label == label)
    }

    pub fn get(&self, label: &str) -> Option<&Subscriber> {
        self.subscribers.iter().find(|s| s.label == label)
    }

    /// All subscribers in order of first connection
    pub fn all(&self) -> &[Subscriber] {
        &self.subscribers
    }

    pub fn active_count(&self) -> usize {
        self.subscribers.iter().filter(|s| !s.disconnected).count()
    }
}
