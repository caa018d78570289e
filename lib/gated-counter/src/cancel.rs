use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::log::{error, info};
use crate::sync::counter::Shared;

struct Waiters {
    next_id: u64,
    list: Vec<(u64, Weak<Shared>)>,
}

struct Inner {
    cancelled: AtomicBool,
    waiters: Mutex<Waiters>,
}

/// A one-shot signal that aborts every cancellable wait observing it.
///
/// Clones share the same signal. Once cancelled, a token stays cancelled.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                waiters: Mutex::new(Waiters {
                    next_id: 0,
                    list: Vec::new(),
                }),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Sets the signal and wakes every counter with a waiter registered on this token.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // The waiters lock is released before any counter lock is taken.
        let targets: Vec<Arc<Shared>> = self
            .inner
            .waiters
            .lock()
            .list
            .iter()
            .filter_map(|(_, shared)| shared.upgrade())
            .collect();
        info!("cancel token fired, waking {} counter(s)", targets.len());
        for shared in targets {
            shared.wake_all();
        }
    }

    pub(crate) fn register(&self, shared: &Arc<Shared>) -> Registration<'_> {
        let mut waiters = self.inner.waiters.lock();
        let id = waiters.next_id;
        waiters.next_id += 1;
        waiters.list.push((id, Arc::downgrade(shared)));
        Registration { token: self, id }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.waiters.lock().list.len()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a counter reachable from [`CancelToken::cancel`] while a wait is in progress.
pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut waiters = self.token.inner.waiters.lock();
        match waiters.list.iter().position(|(id, _)| *id == self.id) {
            Some(pos) => {
                waiters.list.swap_remove(pos);
            }
            None => error!("cancel registration {} missing on release", self.id),
        }
    }
}
