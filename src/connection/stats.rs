//! Connection statistics shared between the reactor and its observers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the reactor thread and readable from anywhere.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently open peer connections
    pub active_connections: AtomicU64,
    /// Total number of peer connections closed
    pub connections_closed: AtomicU64,
    /// Reads handed to the routing handler
    pub reads_dispatched: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Live multiplexer registrations, listener included
    pub registrations: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read_dispatched(&self, count: usize) {
        self.reads_dispatched.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn registered(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn deregistered(&self) {
        self.registrations.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn live_registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }
}
