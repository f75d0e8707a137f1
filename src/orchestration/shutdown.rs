//! # Stop Signals
//!
//! Cooperative cancellation shared between the orchestrator and the threads
//! it owns. A signal is a one-shot latch: once cancelled it stays cancelled.
//! Waiting on it replaces plain sleeps so every wait ends as soon as the
//! signal fires.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct SignalState {
    cancelled: AtomicBool,
    /// Dropping the sender disconnects every waiter at once
    trigger: Mutex<Option<Sender<()>>>,
    waiter: Receiver<()>,
}

/// Cloneable one-shot cancellation latch
#[derive(Debug, Clone)]
pub struct StopSignal {
    state: Arc<SignalState>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (trigger, waiter) = channel::bounded(0);
        Self {
            state: Arc::new(SignalState {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                waiter,
            }),
        }
    }

    /// Fire the signal. Returns `true` for the call that actually fired it.
    pub fn cancel(&self) -> bool {
        let trigger = self.state.trigger.lock().take();
        let fired = trigger.is_some();
        if fired {
            self.state.cancelled.store(true, Ordering::Release);
        }
        // Flag is visible before waiters disconnect
        drop(trigger);
        fired
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Block for up to `timeout`. Returns `true` if the signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.state.waiter.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            // Nothing is ever sent on the channel
            Ok(()) | Err(RecvTimeoutError::Timeout) => self.is_cancelled(),
        }
    }

    /// Block until `deadline`. Returns `true` if the signal fired.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        self.wait_timeout(deadline.saturating_duration_since(Instant::now()))
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
