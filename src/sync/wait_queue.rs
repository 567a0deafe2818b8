use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use super::{
    spin::{SpinGuard, SpinLock},
    waiter::{Waiter, WaiterId},
};

#[derive(Default)]
struct Waiters {
    queue: VecDeque<Arc<Waiter>>,
    next_seq: u64,
}

/// FIFO of parked acquirers.
///
/// The internal spinlock covers queue bookkeeping only. Callers that need a
/// check-then-enqueue step to be atomic take the lock once through
/// [`WaitQueue::lock`] and work on the returned [`QueueGuard`].
#[derive(Default)]
pub struct WaitQueue {
    inner: SpinLock<Waiters>,
    len: AtomicUsize,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> QueueGuard<'_> {
        QueueGuard {
            waiters: self.inner.lock(),
            len: &self.len,
        }
    }

    /// Point-in-time length; may be stale by the time it is read.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enqueue(&self) -> Arc<Waiter> {
        self.lock().enqueue()
    }

    pub fn dequeue_head(&self) -> Option<Arc<Waiter>> {
        self.lock().dequeue_head()
    }

    pub fn remove(&self, waiter: &Waiter) -> bool {
        self.lock().remove(waiter)
    }

    pub fn peek_head_id(&self) -> Option<WaiterId> {
        self.lock().peek_head_id()
    }

    /// Identities of queued waiters, most recently queued first.
    pub fn snapshot(&self) -> Vec<WaiterId> {
        let g = self.inner.lock();
        g.queue.iter().rev().map(|w| w.id()).collect()
    }
}

pub struct QueueGuard<'a> {
    waiters: SpinGuard<'a, Waiters>,
    len: &'a AtomicUsize,
}

impl QueueGuard<'_> {
    pub fn is_empty(&self) -> bool {
        self.waiters.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waiters.queue.len()
    }

    /// Appends a waiter record for the calling thread.
    pub fn enqueue(&mut self) -> Arc<Waiter> {
        let seq = self.waiters.next_seq;
        self.waiters.next_seq += 1;
        let waiter = Arc::new(Waiter::for_current(seq));
        self.waiters.queue.push_back(waiter.clone());
        self.sync_len();
        tracing::trace!(waiter = %waiter.id(), seq, "enqueued");
        waiter
    }

    pub fn dequeue_head(&mut self) -> Option<Arc<Waiter>> {
        let head = self.waiters.queue.pop_front();
        self.sync_len();
        head
    }

    /// Removes `waiter` if still queued. Removing twice is a no-op.
    pub fn remove(&mut self, waiter: &Waiter) -> bool {
        let queue = &mut self.waiters.queue;
        match queue.iter().position(|w| std::ptr::eq(Arc::as_ptr(w), waiter)) {
            Some(i) => {
                queue.remove(i);
                self.sync_len();
                true
            }
            None => false,
        }
    }

    pub fn peek_head_id(&self) -> Option<WaiterId> {
        self.waiters.queue.front().map(|w| w.id())
    }

    fn sync_len(&mut self) {
        self.len.store(self.waiters.queue.len(), Ordering::Release);
    }
}
