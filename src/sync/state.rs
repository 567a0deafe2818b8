use std::sync::atomic::{AtomicUsize, Ordering};

use super::backoff::{Backoff, BackoffConfig};
use crate::error::LockError;

/// Outcome of a single read-check-CAS attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// Holds the new count.
    Acquired(usize),
    Full,
    /// Lost the CAS; the count must be re-read before trying again.
    Contended,
}

/// Count of held permits, only ever changed by CAS.
pub struct AtomicState {
    held: AtomicUsize,
    backoff: BackoffConfig,
}

impl AtomicState {
    pub fn new(backoff: BackoffConfig) -> Self {
        Self {
            held: AtomicUsize::new(0),
            backoff,
        }
    }

    pub fn current(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    pub fn cas_increment(&self, max: usize) -> Increment {
        let cur = self.held.load(Ordering::SeqCst);
        if cur >= max {
            return Increment::Full;
        }
        match self
            .held
            .compare_exchange(cur, cur + 1, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Increment::Acquired(cur + 1),
            Err(_) => Increment::Contended,
        }
    }

    /// Takes a permit if fewer than `max` are held. Only returns false when
    /// the count was observed at `max`.
    pub fn try_increment(&self, max: usize) -> bool {
        let mut backoff = Backoff::new(self.backoff);
        loop {
            match self.cas_increment(max) {
                Increment::Acquired(_) => return true,
                Increment::Full => return false,
                Increment::Contended => backoff.snooze(),
            }
        }
    }

    /// Returns a permit, yielding the count after the decrement.
    pub fn decrement(&self) -> Result<usize, LockError> {
        let mut backoff = Backoff::new(self.backoff);
        loop {
            let cur = self.held.load(Ordering::SeqCst);
            if cur == 0 {
                return Err(LockError::InvariantViolation {
                    op: "decrement",
                    held: 0,
                });
            }
            if self
                .held
                .compare_exchange(cur, cur - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(cur - 1);
            }
            backoff.snooze();
        }
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
