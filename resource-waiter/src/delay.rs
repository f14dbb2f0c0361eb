//! Delay strategies between probe attempts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::waiter::DEFAULT_DELAY;

/// Maps the index of the attempt that just completed (0-based) to the time to
/// wait before the next one.
///
/// Strategies must be pure: the same index always gives the same delay, so
/// waits are reproducible and a strategy can be shared across concurrent waits.
#[derive(Clone)]
pub struct WaiterDelay(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl WaiterDelay {
    /// Always wait `delay`.
    pub fn constant(delay: Duration) -> Self {
        Self(Arc::new(move |_| delay))
    }

    /// Double the delay after every attempt, starting at `initial` and capped at `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self(Arc::new(move |attempt| {
            let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
            initial.checked_mul(factor).unwrap_or(max).min(max)
        }))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl Default for WaiterDelay {
    fn default() -> Self {
        Self::constant(DEFAULT_DELAY)
    }
}

impl fmt::Debug for WaiterDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WaiterDelay")
            .field(&self.delay_for(0))
            .finish()
    }
}
