use std::time::Duration;

/// Exponential backoff schedule: `delay(n) = base * 2^n`.
///
/// Stateless; every call recomputes from the attempt index. Overflow
/// saturates at `Duration::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl ExponentialBackoff {
    /// Create a backoff with the given base unit
    pub const fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Wait before the attempt following `attempt_index`
    pub fn delay(&self, attempt_index: u32) -> Duration {
        2u32.checked_pow(attempt_index)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// The waits a loop of `max_retries` attempts can sleep, in order
    pub fn schedule(&self, max_retries: u32) -> impl Iterator<Item = Duration> + '_ {
        (0..max_retries.saturating_sub(1)).map(move |attempt| self.delay(attempt))
    }
}

/// Random value between 50% and 100% of `delay`
pub fn jittered(delay: Duration) -> Duration {
    // f64 rounding near Duration::MAX would overflow mul_f64
    if delay >= Duration::from_secs(u64::from(u32::MAX)) {
        return delay;
    }
    let factor = rand::random::<f64>() * 0.5 + 0.5;
    delay.mul_f64(factor)
}
