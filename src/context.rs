//! Application Context
//!
//! The reactor never owns the process lifecycle. It only asks, once per poll
//! cycle, whether it may keep running. Whoever owns the lifecycle hands it a
//! read-only [`ApplicationContext`]; [`RunState`] is the flag-backed one the
//! server binary uses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// "May I continue running?" query consulted by the reactor.
pub trait ApplicationContext {
    /// Returns `true` while the reactor should keep serving.
    fn is_running(&self) -> bool;
}

impl<F> ApplicationContext for F
where
    F: Fn() -> bool,
{
    fn is_running(&self) -> bool {
        self()
    }
}

/// Shared run/stop flag. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    /// Creates a state that reports running.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Requests shutdown. Observed by the reactor after its current poll returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationContext for RunState {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}
