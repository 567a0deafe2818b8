use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, Thread},
};

use super::{spin::SpinLock, waiter::WaiterId};

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    parked: SpinLock<Vec<(WaiterId, Thread)>>,
}

/// Cooperative cancellation for blocked acquires.
///
/// Cancelling is sticky: once cancelled, every acquire that observes the
/// token fails with [`LockError::Cancelled`](crate::LockError::Cancelled).
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let parked = self.inner.parked.lock();
        tracing::debug!(parked = parked.len(), "cancelling token");
        for (_, th) in parked.iter() {
            th.unpark();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers the calling thread to be unparked by `cancel`. Check
    /// [`is_cancelled`](Self::is_cancelled) after registering, not before,
    /// or a cancel landing in between is missed.
    pub(crate) fn register(&self) -> Registration<'_> {
        let id = WaiterId::current();
        self.inner.parked.lock().push((id, thread::current()));
        Registration { token: self, id }
    }
}

pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    id: WaiterId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut parked = self.token.inner.parked.lock();
        if let Some(i) = parked.iter().position(|(id, _)| *id == self.id) {
            parked.swap_remove(i);
        }
    }
}
