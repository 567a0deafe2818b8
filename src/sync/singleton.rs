//! Lazily constructed shared instances.
//!
//! The instance pointer is published with a `Release` store and read with an
//! `Acquire` load, so a reader that sees the pointer also sees every write
//! made while constructing the value. Construction itself is serialized by a
//! single-permit fair [`MultiPermitLock`] and only runs while the slot is
//! still empty after the gate is held.

use std::{
    fmt,
    marker::PhantomData,
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
};

use super::{permit_lock::MultiPermitLock, Mutex};
use crate::error::{InitError, LockError};

/// A write-once slot for a `T` built on first use.
pub struct SafeSingleton<T> {
    slot: AtomicPtr<T>,
    gate: MultiPermitLock,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: shared access hands out `&T` to any thread (needs Sync) and the
// value may be constructed on one thread and dropped on another (needs Send).
unsafe impl<T: Send + Sync> Sync for SafeSingleton<T> {}
unsafe impl<T: Send> Send for SafeSingleton<T> {}

impl<T> SafeSingleton<T> {
    pub fn new() -> Self {
        Self {
            slot: AtomicPtr::new(ptr::null_mut()),
            gate: MultiPermitLock::fair(1),
            _owns: PhantomData,
        }
    }

    pub fn get(&self) -> Option<&T> {
        let p = self.slot.load(Ordering::Acquire);
        // SAFETY: non-null pointers in `slot` come from `Box::into_raw` of a
        // fully constructed value and live until `self` is dropped.
        unsafe { p.as_ref() }
    }

    pub fn is_initialized(&self) -> bool {
        !self.slot.load(Ordering::Acquire).is_null()
    }

    /// # Panics
    ///
    /// Panics if the initialization gate reports an invariant violation,
    /// which cannot happen unless the gate itself is broken.
    pub fn get_or_init<F: FnOnce() -> T>(&self, f: F) -> &T {
        match self.get_or_try_init(|| Ok::<T, LockError>(f())) {
            Ok(v) => v,
            Err(e) => panic!("singleton gate failed: {e}"),
        }
    }

    /// Returns the instance, running `f` if nobody has published one yet.
    ///
    /// If `f` fails (or panics) the slot stays empty and the gate is
    /// released, so the next caller retries construction.
    pub fn get_or_try_init<E, F>(&self, f: F) -> Result<&T, E>
    where
        E: From<LockError>,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(v) = self.get() {
            return Ok(v);
        }
        let _gate = self.gate.lock()?;
        // Someone may have published while we queued on the gate
        if let Some(v) = self.get() {
            return Ok(v);
        }
        let value = f()?;
        let p = Box::into_raw(Box::new(value));
        self.slot.store(p, Ordering::Release);
        tracing::debug!(ty = std::any::type_name::<T>(), "published singleton");
        // SAFETY: just published from a live Box; freed only on drop.
        Ok(unsafe { &*p })
    }
}

impl<T> Default for SafeSingleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SafeSingleton<T> {
    fn drop(&mut self) {
        let p = *self.slot.get_mut();
        if !p.is_null() {
            // SAFETY: `&mut self` means no outstanding borrows of the value.
            drop(unsafe { Box::from_raw(p) });
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SafeSingleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("SafeSingleton").field(v).finish(),
            None => f.write_str("SafeSingleton(<uninit>)"),
        }
    }
}

/// A [`SafeSingleton`] that carries its own constructor.
pub struct LazySingleton<T, F = fn() -> anyhow::Result<T>> {
    cell: SafeSingleton<T>,
    init: F,
}

impl<T, F> LazySingleton<T, F>
where
    F: Fn() -> anyhow::Result<T>,
{
    pub fn new(init: F) -> Self {
        Self {
            cell: SafeSingleton::new(),
            init,
        }
    }

    pub fn get_instance(&self) -> Result<&T, InitError> {
        self.cell
            .get_or_try_init(|| (self.init)().map_err(InitError::Construction))
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.is_initialized()
    }
}
