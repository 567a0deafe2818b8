use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Doublings of the busy-spin before falling back to yielding.
    pub spin_limit: u32,
    /// Step at which the yield count stops growing.
    pub yield_limit: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            spin_limit: 6,
            yield_limit: 10,
        }
    }
}

/// Bounded exponential backoff for CAS retry loops.
///
/// Each `snooze` spins `2^step` times while `step <= spin_limit`, then yields
/// the thread a random number of times so that contending threads desync.
pub struct Backoff {
    step: u32,
    cfg: BackoffConfig,
}

impl Backoff {
    pub fn new(cfg: BackoffConfig) -> Self {
        Self { step: 0, cfg }
    }

    pub fn snooze(&mut self) {
        if self.step <= self.cfg.spin_limit {
            for _ in 0..1u32 << self.step {
                std::hint::spin_loop();
            }
        } else {
            let n = rand::thread_rng().gen_range(1..=self.step - self.cfg.spin_limit);
            for _ in 0..n {
                std::thread::yield_now();
            }
        }
        if self.step <= self.cfg.yield_limit {
            self.step += 1;
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
