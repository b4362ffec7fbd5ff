//! One-shot "authentication finished" latch.
//!
//! Invariants:
//! - Once completed, the latch stays completed; `wait()` returns immediately.
//! - Waiters that start after completion still observe it.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Completion latch signalled after the first successful login.
#[derive(Debug, Default)]
pub struct AuthCompletion {
    done: AtomicBool,
    notify: Notify,
}

impl AuthCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark authentication as finished (idempotent).
    pub fn complete(&self) {
        let was_done = self.done.swap(true, Ordering::SeqCst);
        if !was_done {
            self.notify.notify_waiters();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Wait until [`complete`](Self::complete) has been called.
    ///
    /// The `notified()` future is created before the flag is checked so a
    /// completion racing with this call is not missed.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_complete() {
            return;
        }
        notified.await;
    }
}
