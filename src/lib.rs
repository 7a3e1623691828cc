//! # kvreactor - Network Ingress for a Key-Value Store
//!
//! kvreactor accepts client connections and delivers the raw bytes they send
//! to a routing handler. It does not parse, store or reply on its own: it is
//! the ingress layer in front of whatever component owns the protocol.
//!
//! ## Features
//!
//! - **Single-Threaded**: One thread drives every client, no locks in the core
//! - **Readiness-Multiplexed**: Built on mio (epoll/kqueue)
//! - **Bounded Memory**: One fixed-size read buffer shared by all clients
//! - **Deterministic Teardown**: Every channel is closed exactly once on stop
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              kvreactor                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│  Reactor    │───>│  Routing    │                  │
//! │  │ (Listener)  │    │  Loop       │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘                  │
//! │                            │                                            │
//! │                            ▼                                            │
//! │  ┌─────────────┐    ┌─────────────────────────────────────────────┐    │
//! │  │ Application │    │           PeerConnections                   │    │
//! │  │ Context     │    │  ┌────────┐ ┌────────┐ ┌────────┐           │    │
//! │  │ is_running()│    │  │ peer 2 │ │ peer 3 │ │ ...    │           │    │
//! │  └─────────────┘    │  └────────┘ └────────┘ └────────┘           │    │
//! │                     └─────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use kvreactor::{PeerConnection, Reactor, RunState, ServerSettings};
//! use std::thread;
//!
//! let state = RunState::new();
//! let handler = |connection: &mut PeerConnection, data: &[u8]| {
//!     println!("{}: {:?}", connection.peer_addr(), String::from_utf8_lossy(data));
//! };
//!
//! let reactor = Reactor::new(ServerSettings::default(), state.clone(), handler).bind()?;
//! let wakeup = reactor.wakeup();
//! let server = thread::spawn(move || reactor.run());
//!
//! // ... later
//! state.stop();
//! wakeup.wake()?;
//! server.join().unwrap()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`server`]: The reactor, its read buffer and readiness set
//! - [`connection`]: Peer connections and connection statistics
//! - [`handler`]: The routing handler contract
//! - [`context`]: The run/stop query
//! - [`config`]: Server settings

pub mod config;
pub mod connection;
pub mod context;
pub mod handler;
pub mod server;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ParsedArgs, ServerSettings};
pub use connection::{ConnectionStats, PeerConnection};
pub use context::{ApplicationContext, RunState};
pub use handler::{RoutingHandler, TracingHandler};
pub use server::{BoundReactor, Reactor, ReactorError, Wakeup};

/// The default port kvreactor listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host kvreactor binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of kvreactor
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
