//! Connection Module
//!
//! Per-client state owned by the reactor, plus the counters it keeps while
//! serving clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Reactor                              │
//! │                                                             │
//! │   HashMap<Token, PeerConnection>      Arc<ConnectionStats>  │
//! │   ┌──────┐ ┌──────┐ ┌──────┐          accepted / active     │
//! │   │peer 2│ │peer 3│ │ ...  │          reads / bytes         │
//! │   └──────┘ └──────┘ └──────┘          registrations         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod peer;
pub mod stats;

pub use peer::PeerConnection;
pub use stats::ConnectionStats;
