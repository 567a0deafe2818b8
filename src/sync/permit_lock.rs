use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use super::{
    cancel::CancelToken,
    state::AtomicState,
    wait_queue::WaitQueue,
    waiter::{Status, Waiter, WaiterId},
    Mutex, MutexGuard,
};
use crate::{
    config::{Fairness, LockConfig},
    error::LockError,
};

/// A lock admitting up to `max_permits` holders at once.
///
/// With one permit this is a plain mutex; with two it is the "twins" lock.
/// Permits are slots, not owners: any thread may return one, and the same
/// thread acquiring twice takes two.
///
/// # Fairness
///
/// In [`Fairness::Fair`] mode a release hands its permit straight to the
/// oldest waiter, so the count never drops while anyone is queued and a new
/// arrival cannot slip in ahead. In [`Fairness::Unfair`] mode a release frees
/// the permit and wakes one waiter, which then races any newcomer for it.
pub struct MultiPermitLock {
    max: usize,
    fairness: Fairness,
    state: AtomicState,
    queue: WaitQueue,
}

/// Bounds on a blocking acquire.
#[derive(Clone, Copy, Default)]
struct Wait<'a> {
    deadline: Option<(Instant, Duration)>,
    token: Option<&'a CancelToken>,
}

impl Wait<'_> {
    fn interrupted(&self) -> Option<LockError> {
        if self.token.is_some_and(CancelToken::is_cancelled) {
            return Some(LockError::Cancelled);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => Some(LockError::TimedOut(timeout)),
            _ => None,
        }
    }

    fn park(&self) {
        match self.deadline {
            Some((at, _)) => thread::park_timeout(at.saturating_duration_since(Instant::now())),
            None => thread::park(),
        }
    }
}

impl MultiPermitLock {
    /// Unfair lock with `max_permits` slots.
    pub fn new(max_permits: usize) -> Self {
        assert!(max_permits > 0, "Expect at least one permit");
        Self::build(LockConfig::default().permits(max_permits))
    }

    pub fn fair(max_permits: usize) -> Self {
        assert!(max_permits > 0, "Expect at least one permit");
        Self::build(
            LockConfig::default()
                .permits(max_permits)
                .fairness(Fairness::Fair),
        )
    }

    pub fn twins() -> Self {
        Self::new(2)
    }

    pub fn with_config(cfg: LockConfig) -> Result<Self, LockError> {
        cfg.validate()?;
        Ok(Self::build(cfg))
    }

    fn build(cfg: LockConfig) -> Self {
        Self {
            max: cfg.max_permits,
            fairness: cfg.fairness,
            state: AtomicState::new(cfg.backoff),
            queue: WaitQueue::new(),
        }
    }

    pub fn max_permits(&self) -> usize {
        self.max
    }

    pub fn is_fair(&self) -> bool {
        self.fairness == Fairness::Fair
    }

    pub fn current_count(&self) -> usize {
        self.state.current()
    }

    pub fn available_permits(&self) -> usize {
        self.max.saturating_sub(self.current_count())
    }

    pub fn is_locked(&self) -> bool {
        self.current_count() > 0
    }

    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    pub fn has_queued_waiters(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Diagnostic snapshot of blocked waiters, most recently queued first.
    /// Stale as soon as it returns.
    pub fn queued_waiters(&self) -> Vec<WaiterId> {
        self.queue.snapshot()
    }

    /// A timeout too large to represent as an `Instant` waits without bound.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<(), LockError> {
        self.acquire_with(Wait {
            deadline: Instant::now().checked_add(timeout).map(|at| (at, timeout)),
            token: None,
        })
    }

    pub fn acquire_deadline(&self, deadline: Instant) -> Result<(), LockError> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        self.acquire_with(Wait {
            deadline: Some((deadline, timeout)),
            token: None,
        })
    }

    pub fn acquire_cancellable(&self, token: &CancelToken) -> Result<(), LockError> {
        self.acquire_with(Wait {
            deadline: None,
            token: Some(token),
        })
    }

    pub fn lock_timeout(&self, timeout: Duration) -> Result<MutexGuard<'_, Self>, LockError> {
        self.acquire_timeout(timeout)?;
        Ok(MutexGuard { mutex: self })
    }

    pub fn lock_cancellable(&self, token: &CancelToken) -> Result<MutexGuard<'_, Self>, LockError> {
        self.acquire_cancellable(token)?;
        Ok(MutexGuard { mutex: self })
    }

    fn acquire_with(&self, wait: Wait<'_>) -> Result<(), LockError> {
        if wait.token.is_some_and(CancelToken::is_cancelled) {
            return Err(LockError::Cancelled);
        }
        if self.try_acquire() {
            return Ok(());
        }
        // Must be registered before the first cancellation check in `park_on`
        let _registration = wait.token.map(CancelToken::register);
        loop {
            let waiter = {
                let mut q = self.queue.lock();
                // Checked under the queue lock so a concurrent release either
                // sees our record or has already freed the permit we take here
                let may_take = self.fairness == Fairness::Unfair || q.is_empty();
                if may_take && self.state.try_increment(self.max) {
                    return Ok(());
                }
                q.enqueue()
            };
            match self.park_on(&waiter, wait)? {
                Status::Granted => {
                    tracing::trace!(waiter = %waiter.id(), "received permit");
                    return Ok(());
                }
                // Woken to race again; the wake-up is only a hint
                _ => continue,
            }
        }
    }

    fn park_on(&self, waiter: &Arc<Waiter>, wait: Wait<'_>) -> Result<Status, LockError> {
        loop {
            match waiter.status() {
                Status::Waiting => {}
                s => return Ok(s),
            }
            if let Some(err) = wait.interrupted() {
                return self.abandon(waiter, err);
            }
            wait.park();
        }
    }

    /// Withdraws `waiter` after a timeout or cancellation. If a releaser
    /// reached the record first, whatever it delivered is passed on.
    fn abandon(&self, waiter: &Waiter, err: LockError) -> Result<Status, LockError> {
        let outcome = {
            let mut q = self.queue.lock();
            let outcome = waiter.transition(Status::Cancelled);
            if outcome.is_ok() {
                q.remove(waiter);
            }
            outcome
        };
        match outcome {
            Ok(()) => {
                tracing::debug!(waiter = %waiter.id(), error = %err, "abandoned wait");
            }
            Err(Status::Granted) => {
                tracing::debug!(waiter = %waiter.id(), error = %err, "returning permit granted during abandon");
                self.release()?;
            }
            Err(Status::Notified) => {
                tracing::debug!(waiter = %waiter.id(), error = %err, "forwarding wake-up received during abandon");
                self.notify_one();
            }
            Err(_) => {}
        }
        Err(err)
    }

    fn notify_one(&self) {
        let woken = {
            let mut q = self.queue.lock();
            loop {
                match q.dequeue_head() {
                    Some(w) if w.transition(Status::Notified).is_ok() => break Some(w),
                    Some(_) => continue,
                    None => break None,
                }
            }
        };
        if let Some(w) = woken {
            tracing::trace!(waiter = %w.id(), "notified");
            w.unpark();
        }
    }

    fn release_fair(&self) -> Result<(), LockError> {
        let handed = {
            let mut q = self.queue.lock();
            let held = self.state.current();
            if held == 0 {
                return Err(LockError::InvariantViolation { op: "release", held });
            }
            loop {
                match q.dequeue_head() {
                    // The count stays put: the permit moves to the waiter
                    Some(w) if w.transition(Status::Granted).is_ok() => break Some(w),
                    Some(_) => continue,
                    None => {
                        self.state.decrement()?;
                        break None;
                    }
                }
            }
        };
        if let Some(w) = handed {
            tracing::trace!(waiter = %w.id(), "handed off permit");
            w.unpark();
        }
        Ok(())
    }
}

impl Mutex for MultiPermitLock {
    fn acquire(&self) -> Result<(), LockError> {
        self.acquire_with(Wait::default())
    }

    /// Never blocks or enqueues. A fair lock refuses while anyone is queued.
    fn try_acquire(&self) -> bool {
        if self.fairness == Fairness::Fair && !self.queue.is_empty() {
            return false;
        }
        self.state.try_increment(self.max)
    }

    /// Errors are returned, not logged; [`MutexGuard`] logs the ones it
    /// cannot propagate.
    fn release(&self) -> Result<(), LockError> {
        match self.fairness {
            Fairness::Fair => self.release_fair(),
            Fairness::Unfair => self.state.decrement().map(|_| self.notify_one()),
        }
    }
}

impl Default for MultiPermitLock {
    fn default() -> Self {
        Self::new(1)
    }
}

impl std::fmt::Debug for MultiPermitLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiPermitLock")
            .field("max", &self.max)
            .field("fairness", &self.fairness)
            .field("held", &self.current_count())
            .field("queued", &self.queue_length())
            .finish()
    }
}
