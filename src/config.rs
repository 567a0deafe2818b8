use crate::error::LockError;
use crate::sync::backoff::BackoffConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fairness {
    /// Permits are handed to waiters strictly in arrival order.
    Fair,
    /// New arrivals may barge past parked waiters.
    #[default]
    Unfair,
}

#[derive(Debug, Clone)]
pub struct LockConfig {
    pub max_permits: usize,
    pub fairness: Fairness,
    pub backoff: BackoffConfig,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_permits: 1,
            fairness: Fairness::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl LockConfig {
    pub fn permits(mut self, max_permits: usize) -> Self {
        self.max_permits = max_permits;
        self
    }
    pub fn fairness(mut self, fairness: Fairness) -> Self {
        self.fairness = fairness;
        self
    }
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<(), LockError> {
        if self.max_permits == 0 {
            return Err(LockError::InvalidConfig(
                "max_permits must be at least 1".to_string(),
            ));
        }
        if self.backoff.spin_limit >= u32::BITS {
            return Err(LockError::InvalidConfig(format!(
                "backoff spin_limit {} overflows the spin counter",
                self.backoff.spin_limit
            )));
        }
        Ok(())
    }
}
