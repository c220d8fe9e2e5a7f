//! Broadcast stop signal for long-lived background tasks
//!
//! Every task holds a clone; [`ShutdownSignal::wait_timeout`] doubles as the
//! task's sleep so a stop request interrupts it immediately.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Inner {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiting task.
    pub fn trigger(&self) {
        let mut stopped = self.inner.stopped.lock();
        *stopped = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Sleep for up to `timeout`. Returns true if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.inner.stopped.lock();
        while !*stopped {
            if self
                .inner
                .condvar
                .wait_until(&mut stopped, deadline)
                .timed_out()
            {
                break;
            }
        }
        *stopped
    }
}
