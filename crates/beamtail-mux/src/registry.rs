//! Registry of labels with a live connection
//!
//! Uniqueness is the only contract: a label can be registered once, and
//! becomes available again after it is deregistered.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Thread-safe set of active labels
#[derive(Debug, Default)]
pub struct LabelRegistry {
    /// label -> peer description of the connection holding it
    active: Mutex<HashMap<String, String>>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `label` for `peer`
    ///
    /// Returns false, leaving the current holder untouched, when the label
    /// is already active.
    pub fn try_register(&self, label: &str, peer: &str) -> bool {
        let mut active = self.active.lock();
        if active.contains_key(label) {
            return false;
        }
        active.insert(label.to_string(), peer.to_string());
        true
    }

    /// Release `label`; unknown labels are ignored
    pub fn deregister(&self, label: &str) {
        self.active.lock().remove(label);
    }

    pub fn contains(&self, label: &str) -> bool {
        self.active.lock().contains_key(label)
    }

    /// Number of active labels
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
