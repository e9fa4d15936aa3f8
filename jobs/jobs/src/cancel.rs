use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A cloneable flag a caller sets to stop a poll loop.
///
/// Threads pausing on the token are woken as soon as it is cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.lock() = true;
        self.inner.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Blocks for `duration` or until cancelled. Returns `true` if cancelled.
    ///
    /// A duration past the range of `Instant` waits for cancellation alone.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            return self.wait_for_cancel();
        };
        let mut cancelled = self.lock();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match self.inner.wakeup.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    fn wait_for_cancel(&self) -> bool {
        let mut cancelled = self.lock();
        while !*cancelled {
            cancelled = self
                .inner
                .wakeup
                .wait(cancelled)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        // The guarded value is a plain flag, so a poisoned lock is still usable.
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// How the poll loop waits between status checks.
pub trait Pause: Send + Sync {
    /// Returns `true` when the wait ended because of cancellation.
    fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool;
}

/// Sleeps on the cancellation token's condition variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellablePause;

impl Pause for CancellablePause {
    fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        cancel.wait_timeout(duration)
    }
}
