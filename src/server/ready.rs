//! Readiness set for one poll cycle.
//!
//! Holds the channels to service in the current cycle, at most once each.
//! Entries are popped as they are processed, so a cycle never handles the
//! same event twice.

use mio::event::Event;
use mio::Token;
use std::collections::{HashSet, VecDeque};

/// One channel ready for servicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub token: Token,
    /// The peer has shut down its write half; a read will reach end-of-stream.
    pub read_closed: bool,
}

#[derive(Debug, Default)]
pub struct ReadySet {
    entries: VecDeque<Readiness>,
    queued: HashSet<Token>,
}

impl ReadySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `token`, merging with an entry already queued for it.
    pub fn push(&mut self, token: Token, read_closed: bool) {
        if self.queued.insert(token) {
            self.entries.push_back(Readiness { token, read_closed });
        } else if read_closed {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.token == token) {
                entry.read_closed = true;
            }
        }
    }

    pub fn push_event(&mut self, event: &Event) {
        self.push(event.token(), event.is_read_closed());
    }

    /// Moves every entry of `other` into this set.
    pub fn absorb(&mut self, other: &mut ReadySet) {
        while let Some(entry) = other.pop() {
            self.push(entry.token, entry.read_closed);
        }
    }

    pub fn pop(&mut self) -> Option<Readiness> {
        let entry = self.entries.pop_front()?;
        self.queued.remove(&entry.token);
        Some(entry)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
