pub mod config;
pub mod error;
pub mod sync;

pub use config::{Fairness, LockConfig};
pub use error::{InitError, LockError};
pub use sync::{
    cancel::CancelToken,
    permit_lock::MultiPermitLock,
    singleton::{LazySingleton, SafeSingleton},
    waiter::WaiterId,
    Mutex, MutexGuard,
};
