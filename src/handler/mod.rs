//! Routing Handler Module
//!
//! The reactor does not interpret bytes. Everything it reads is handed,
//! inline on the reactor thread, to a [`RoutingHandler`] which owns framing,
//! decoding, and dispatch.
//!
//! ## Contract
//!
//! - Called once per successful non-empty read, never concurrently.
//! - `data` is exactly the bytes of that read, at most the buffer capacity.
//!   It borrows the reactor's buffer and is gone once `handle` returns, so
//!   partial frames must be copied out by the handler.
//! - Must not block: the reactor thread drives every client.
//!
//! ## Example
//!
//! ```
//! use kvreactor::{PeerConnection, RoutingHandler};
//! use std::io::Write;
//!
//! struct Echo;
//!
//! impl RoutingHandler for Echo {
//!     fn handle(&mut self, connection: &mut PeerConnection, data: &[u8]) {
//!         let _ = connection.write_all(data);
//!     }
//! }
//! ```

use crate::connection::PeerConnection;
use tracing::{debug, trace};

/// Receives raw inbound bytes from the reactor.
pub trait RoutingHandler {
    fn handle(&mut self, connection: &mut PeerConnection, data: &[u8]);
}

impl<F> RoutingHandler for F
where
    F: FnMut(&mut PeerConnection, &[u8]),
{
    fn handle(&mut self, connection: &mut PeerConnection, data: &[u8]) {
        self(connection, data)
    }
}

/// Handler that only records what arrives. Used when no router is plugged in.
#[derive(Debug, Default)]
pub struct TracingHandler {
    deliveries: u64,
}

impl TracingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deliveries seen so far.
    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }
}

impl RoutingHandler for TracingHandler {
    fn handle(&mut self, connection: &mut PeerConnection, data: &[u8]) {
        self.deliveries += 1;
        debug!(
            client = %connection.peer_addr(),
            id = connection.id(),
            bytes = data.len(),
            "Received data"
        );
        trace!(client = %connection.peer_addr(), data = %String::from_utf8_lossy(data));
    }
}
