//! Notifiable one-shot event used by result holders and scheduler termination.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A settable flag that blocked threads can wait on.
///
/// Waiting with `None` blocks until the event is set; waiting with
/// `Some(timeout)` gives up once the monotonic deadline passes.
#[derive(Debug, Default)]
pub struct Event {
    set: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    /// Create an unset event.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Set the event and wake every waiter. Returns false if it was already set.
    pub fn set(&self) -> bool {
        let mut set = self.set.lock();
        if *set {
            return false;
        }
        *set = true;
        self.condvar.notify_all();
        true
    }

    /// Whether the event has been set.
    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Block until the event is set or the timeout elapses.
    ///
    /// Returns whether the event was set on return.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut set = self.set.lock();
        while !*set {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut set, deadline).timed_out() {
                        break;
                    }
                }
                None => self.condvar.wait(&mut set),
            }
        }
        *set
    }
}
