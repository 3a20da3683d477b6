use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    lock: Mutex<()>,
    cv: Condvar,
}

/// Shared, cloneable cancellation flag.
///
/// Checked cooperatively by the frame loop and the export worker. [`CancelToken::wait_timeout`]
/// wakes early when the token is cancelled, so waiters never spin.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        let _guard = self.inner.lock.lock();
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.cv.notify_all();
    }

    /// Return `true` once [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, returning early with `true` if the token gets cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.inner.lock.lock();
        if self.is_cancelled() {
            return true;
        }
        let _ = self.inner.cv.wait_for(&mut guard, timeout);
        self.is_cancelled()
    }
}
