//! Harness configuration.
//!
//! Defaults reproduce the reference benchmark: 100000 elements, deadlines in
//! `[50ms, 100ms)`, three publishers, and a one second outer bound. Every value
//! can be overridden from the environment:
//!
//! | variable | field |
//! |----------|-------|
//! | `GUARDFLOW_TOTAL` | [`HarnessConfig::total`] |
//! | `GUARDFLOW_DEADLINE_MIN_MS` | [`HarnessConfig::deadline_min`] |
//! | `GUARDFLOW_DEADLINE_MAX_MS` | [`HarnessConfig::deadline_max`] |
//! | `GUARDFLOW_PARTITIONS` | [`HarnessConfig::partitions`] |
//! | `GUARDFLOW_OUTER_BOUND_MS` | [`HarnessConfig::outer_bound`] |
//! | `GUARDFLOW_HANDOFF_CAPACITY` | [`HarnessConfig::handoff_capacity`] |

use std::str::FromStr;
use std::time::Duration;

use crate::error::{FlowError, FlowResult};
use crate::handoff::DEFAULT_CAPACITY;
use crate::types::Element;

pub const ENV_TOTAL: &str = "GUARDFLOW_TOTAL";
pub const ENV_DEADLINE_MIN_MS: &str = "GUARDFLOW_DEADLINE_MIN_MS";
pub const ENV_DEADLINE_MAX_MS: &str = "GUARDFLOW_DEADLINE_MAX_MS";
pub const ENV_PARTITIONS: &str = "GUARDFLOW_PARTITIONS";
pub const ENV_OUTER_BOUND_MS: &str = "GUARDFLOW_OUTER_BOUND_MS";
pub const ENV_HANDOFF_CAPACITY: &str = "GUARDFLOW_HANDOFF_CAPACITY";

/// Everything a [`Harness`](crate::Harness) needs to know up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Elements produced per invocation, across all publishers
    pub total: usize,
    /// Lower bound (inclusive) of the per-sequence deadline
    pub deadline_min: Duration,
    /// Upper bound (exclusive) of the per-sequence deadline
    pub deadline_max: Duration,
    /// Publishers in the multi-producer scenarios, one worker each
    pub partitions: usize,
    /// Hard bound on one whole invocation
    pub outer_bound: Duration,
    /// Items buffered between a worker and the merge
    pub handoff_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            total: 100_000,
            deadline_min: Duration::from_millis(50),
            deadline_max: Duration::from_millis(100),
            partitions: 3,
            outer_bound: Duration::from_secs(1),
            handoff_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by whatever `GUARDFLOW_*` variables are set.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidConfig`] if a variable does not parse or the
    /// result fails [`HarnessConfig::validate`].
    pub fn from_env() -> FlowResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`HarnessConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> FlowResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(total) = parse(&lookup, ENV_TOTAL)? {
            config.total = total;
        }
        if let Some(ms) = parse(&lookup, ENV_DEADLINE_MIN_MS)? {
            config.deadline_min = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&lookup, ENV_DEADLINE_MAX_MS)? {
            config.deadline_max = Duration::from_millis(ms);
        }
        if let Some(partitions) = parse(&lookup, ENV_PARTITIONS)? {
            config.partitions = partitions;
        }
        if let Some(ms) = parse(&lookup, ENV_OUTER_BOUND_MS)? {
            config.outer_bound = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse(&lookup, ENV_HANDOFF_CAPACITY)? {
            config.handoff_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the harness relies on.
    pub fn validate(&self) -> FlowResult<()> {
        if self.total > Element::MAX as usize {
            return Err(invalid(
                ENV_TOTAL,
                self.total,
                format!("must not exceed {}", Element::MAX),
            ));
        }
        if self.partitions == 0 {
            return Err(invalid(ENV_PARTITIONS, 0, "must be at least 1".to_string()));
        }
        if self.handoff_capacity == 0 {
            return Err(invalid(
                ENV_HANDOFF_CAPACITY,
                0,
                "must be at least 1".to_string(),
            ));
        }
        if self.deadline_min > self.deadline_max {
            return Err(invalid(
                ENV_DEADLINE_MIN_MS,
                self.deadline_min.as_millis(),
                format!(
                    "must not exceed the maximum of {}ms",
                    self.deadline_max.as_millis()
                ),
            ));
        }
        Ok(())
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total;
        self
    }

    pub fn with_deadline_range(mut self, min: Duration, max: Duration) -> Self {
        self.deadline_min = min;
        self.deadline_max = max;
        self
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_outer_bound(mut self, bound: Duration) -> Self {
        self.outer_bound = bound;
        self
    }

    pub fn with_handoff_capacity(mut self, capacity: usize) -> Self {
        self.handoff_capacity = capacity;
        self
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> FlowResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err: T::Err| FlowError::InvalidConfig {
            key,
            value: raw.clone(),
            reason: err.to_string(),
        })
}

fn invalid(key: &'static str, value: impl ToString, reason: String) -> FlowError {
    FlowError::InvalidConfig {
        key,
        value: value.to_string(),
        reason,
    }
}
