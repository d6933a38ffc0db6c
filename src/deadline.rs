//! Per-sequence deadline generators.
//!
//! Every guarded sequence of every invocation draws its own deadline, so the
//! generator is injected into the harness instead of living in global state.
//! Tests substitute [`FixedDeadline`] to make runs deterministic.

use std::time::Duration;

use rand::Rng;

/// Source of per-sequence deadlines.
pub trait DeadlineSource: Send + Sync {
    /// Draw the deadline for the next guarded sequence.
    fn next_deadline(&self) -> Duration;
}

/// Uniformly random deadlines in `[min, max)`.
///
/// Sampling uses the calling thread's RNG, so concurrent invocations never
/// contend on a shared generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomDeadline {
    min: Duration,
    max: Duration,
}

impl RandomDeadline {
    /// Deadlines in `[min, max)`. An empty range always yields `min`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

impl Default for RandomDeadline {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_millis(100))
    }
}

impl DeadlineSource for RandomDeadline {
    fn next_deadline(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

/// The same deadline every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDeadline(pub Duration);

impl FixedDeadline {
    /// A deadline no run will ever reach.
    pub fn unbounded() -> Self {
        Self(Duration::MAX)
    }
}

impl DeadlineSource for FixedDeadline {
    fn next_deadline(&self) -> Duration {
        self.0
    }
}
