//! Server Module
//!
//! The readiness-multiplexed connection reactor: one thread, one poller,
//! one read buffer, any number of clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Reactor                              │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ mio::Poll   │───>│  ReadySet   │───>│ accept/read │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │         ▲                                     │             │
//! │         │ Wakeup                              ▼             │
//! │                                      ┌─────────────────┐    │
//! │                                      │   ReadBuffer    │    │
//! │                                      └────────┬────────┘    │
//! └───────────────────────────────────────────────┼─────────────┘
//!                                                 ▼
//!                                          RoutingHandler
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use kvreactor::{PeerConnection, Reactor, RunState, ServerSettings};
//!
//! let state = RunState::new();
//! let handler = |connection: &mut PeerConnection, data: &[u8]| {
//!     println!("{} sent {} bytes", connection.peer_addr(), data.len());
//! };
//!
//! Reactor::new(ServerSettings::default(), state, handler).start()?;
//! # Ok::<(), kvreactor::ReactorError>(())
//! ```

pub mod buffer;
pub mod reactor;
pub mod ready;

pub use buffer::ReadBuffer;
pub use reactor::{BoundReactor, Reactor, ReactorError, Wakeup};
pub use ready::{Readiness, ReadySet};
