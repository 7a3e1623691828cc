//! Peer Connection
//!
//! One accepted client socket, tracked by the reactor from accept to close.
//!
//! ## Lifecycle
//!
//! ```text
//! accept ──> REGISTERED_FOR_READ ──(data)──> handler ──┐
//!                   ▲                                  │
//!                   └──────────────────────────────────┘
//!                   │
//!             (end-of-stream / read error)
//!                   ▼
//!                CLOSED (deregistered, dropped)
//! ```
//!
//! There is no write-pending state: the reactor never writes. Handlers that
//! reply do so through the [`std::io::Write`] impl, on a non-blocking socket.

use mio::net::TcpStream;
use mio::Token;
use std::io::{self, Write};
use std::net::SocketAddr;

/// A client connection owned by the reactor.
#[derive(Debug)]
pub struct PeerConnection {
    stream: TcpStream,
    token: Token,
    peer_addr: SocketAddr,
}

impl PeerConnection {
    pub(crate) fn new(stream: TcpStream, token: Token, peer_addr: SocketAddr) -> Self {
        Self {
            stream,
            token,
            peer_addr,
        }
    }

    /// Identifier unique among the reactor's live connections.
    pub fn id(&self) -> usize {
        self.token.0
    }

    /// Address of the remote client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The raw non-blocking socket.
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub(crate) fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

impl Write for PeerConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
