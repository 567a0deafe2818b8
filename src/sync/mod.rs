pub mod backoff;
pub mod cancel;
pub mod permit_lock;
pub mod singleton;
pub mod spin;
pub mod state;
pub mod wait_queue;
pub mod waiter;

use crate::error::LockError;

/// A lock handing out permits that are not tied to the acquiring thread.
///
/// `release` may be called from any thread; the guard returned by `lock` is
/// the usual way to pair the two.
pub trait Mutex {
    /// Blocks until a permit is held.
    fn acquire(&self) -> Result<(), LockError>;
    fn try_acquire(&self) -> bool;
    /// Returns one permit. Releasing a permit nobody holds is
    /// [`LockError::InvariantViolation`].
    fn release(&self) -> Result<(), LockError>;

    fn lock(&self) -> Result<MutexGuard<'_, Self>, LockError>
    where
        Self: Sized,
    {
        self.acquire()?;
        Ok(MutexGuard { mutex: self })
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, Self>>
    where
        Self: Sized,
    {
        if self.try_acquire() {
            Some(MutexGuard { mutex: self })
        } else {
            None
        }
    }
}

/// Holds one permit of `M` and returns it on drop.
#[must_use = "dropping the guard releases the permit immediately"]
pub struct MutexGuard<'a, M: Mutex> {
    pub(crate) mutex: &'a M,
}

impl<M: Mutex> MutexGuard<'_, M> {
    /// Keeps the permit held past the guard's scope; the caller now owes a
    /// `release`.
    pub fn leak(self) {
        std::mem::forget(self)
    }
}

impl<M: Mutex> Drop for MutexGuard<'_, M> {
    fn drop(&mut self) {
        if let Err(e) = self.mutex.release() {
            tracing::error!(error = %e, "guard failed to return its permit");
        }
    }
}
