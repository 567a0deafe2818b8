use std::{
    fmt,
    sync::atomic::{AtomicU64, AtomicU8, Ordering},
    thread::{self, Thread},
};

/// Opaque, monotonic identity of a thread that may wait on a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaiterId(u64);

impl WaiterId {
    pub fn current() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        thread_local! {
            static ID: WaiterId = WaiterId(NEXT.fetch_add(1, Ordering::Relaxed));
        }
        ID.with(|id| *id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waiter#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Waiting = 0,
    /// A releaser handed its permit directly to this waiter.
    Granted = 1,
    /// Woken to race for a permit; nothing was handed over.
    Notified = 2,
    Cancelled = 3,
}

impl Status {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Status::Waiting,
            1 => Status::Granted,
            2 => Status::Notified,
            _ => Status::Cancelled,
        }
    }
}

/// One blocked acquire attempt.
///
/// Status leaves `Waiting` at most once; whichever of the releaser and the
/// waiter itself wins that CAS decides who owns the outcome.
pub struct Waiter {
    id: WaiterId,
    seq: u64,
    thread: Thread,
    status: AtomicU8,
}

impl Waiter {
    pub fn for_current(seq: u64) -> Self {
        Self {
            id: WaiterId::current(),
            seq,
            thread: thread::current(),
            status: AtomicU8::new(Status::Waiting as u8),
        }
    }

    pub fn id(&self) -> WaiterId {
        self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Moves the waiter out of `Waiting`. Fails if someone else already did.
    pub fn transition(&self, to: Status) -> Result<(), Status> {
        self.status
            .compare_exchange(
                Status::Waiting as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(Status::from_u8)
    }

    pub fn unpark(&self) {
        self.thread.unpark()
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .field("status", &self.status())
            .finish()
    }
}
