//! # Sender Tracking Table
//!
//! Records which peers are known to hold each pool-resident transaction so
//! the broadcast loop never sends a transaction back to a peer that gave it
//! to us.
//!
//! Entries are created on first successful admission and deleted when the
//! pool reports the transaction removed. The table is keyed by content hash
//! over the transaction's whole pool lifetime, so a missed removal is a leak.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use super::{SenderId, TxKey};

/// Thread-safe `TxKey → {SenderId}` map.
#[derive(Debug, Default)]
pub struct SenderTable {
    senders: Mutex<HashMap<TxKey, HashSet<SenderId>>>,
}

impl SenderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `peer` is recorded as a sender of `key`.
    pub fn is_sender(&self, key: &TxKey, peer: SenderId) -> bool {
        self.senders
            .lock()
            .get(key)
            .is_some_and(|set| set.contains(&peer))
    }

    /// Records `peer` as a sender of `key`.
    ///
    /// Returns `true` if this is the first sender recorded for the key.
    pub fn add_sender(&self, key: TxKey, peer: SenderId) -> bool {
        let mut senders = self.senders.lock();
        match senders.get_mut(&key) {
            Some(set) => {
                set.insert(peer);
                false
            }
            None => {
                senders.insert(key, HashSet::from([peer]));
                true
            }
        }
    }

    /// Forgets every sender of `key`. Untracked keys are ignored.
    pub fn remove_all(&self, key: &TxKey) {
        self.senders.lock().remove(key);
    }

    /// Whether any sender is recorded for `key`.
    pub fn is_tracked(&self, key: &TxKey) -> bool {
        self.senders.lock().contains_key(key)
    }

    /// Number of tracked transactions.
    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.lock().is_empty()
    }
}
