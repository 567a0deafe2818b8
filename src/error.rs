use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// A release or decrement that would take the permit count below zero.
    /// This is a usage defect, never a contention outcome.
    #[error("permit invariant violated during {op} (held = {held})")]
    InvariantViolation { op: &'static str, held: usize },
    #[error("acquire cancelled while waiting for a permit")]
    Cancelled,
    #[error("no permit became available within {0:?}")]
    TimedOut(Duration),
    #[error("invalid lock configuration: {0}")]
    InvalidConfig(String),
}

impl LockError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Construction(#[from] anyhow::Error),
    #[error("initialization gate failed: {0}")]
    Gate(#[from] LockError),
}
