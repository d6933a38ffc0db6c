//! Benchmark scenarios and the harness that owns their workers.
//!
//! | Scenario | publishers | hand-off worker | guard timers |
//! |----------|-----------|-----------------|--------------|
//! | [`Scenario::DefaultParallel`] | 1 | shared pool | parallel driver |
//! | [`Scenario::DefaultParallelWithPublishers`] | `partitions` | `s1..sN` | parallel driver |
//! | [`Scenario::Single`] | 1 | `single` | single driver |
//! | [`Scenario::SingleWithPublishers`] | `partitions` | `s1..sN` | single driver |
//!
//! Each invocation draws a fresh deadline per guarded sequence, builds the
//! pipeline, and collects it on the calling thread within the outer bound.

use std::sync::Arc;
#[cfg(feature = "tracing")]
use std::time::Instant;

use futures::executor::block_on;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::collect::collect;
use crate::config::HarnessConfig;
use crate::deadline::{DeadlineSource, RandomDeadline};
use crate::error::FlowResult;
use crate::guard::with_timeout;
use crate::handoff::{bind_to, Handoff};
use crate::merge::merge;
use crate::producer::{produce, Share};
use crate::timer::{TimerDriver, TimerSource};
use crate::types::{Element, FALLBACK};
use crate::worker::{SharedPool, SingleWorker, Worker};

/// Which timer driver services the guards of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPlacement {
    /// One driver shard per core
    Parallel,
    /// One driver thread for every timer
    Single,
}

/// One of the four benchmarked pipeline shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    DefaultParallel,
    DefaultParallelWithPublishers,
    Single,
    SingleWithPublishers,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::DefaultParallel,
        Scenario::DefaultParallelWithPublishers,
        Scenario::Single,
        Scenario::SingleWithPublishers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::DefaultParallel => "default_parallel",
            Scenario::DefaultParallelWithPublishers => "default_parallel_with_publishers",
            Scenario::Single => "single",
            Scenario::SingleWithPublishers => "single_with_publishers",
        }
    }

    /// Whether the range is split across the `s1..sN` publishers
    pub fn partitioned(&self) -> bool {
        matches!(
            self,
            Scenario::DefaultParallelWithPublishers | Scenario::SingleWithPublishers
        )
    }

    pub fn timers(&self) -> TimerPlacement {
        match self {
            Scenario::DefaultParallel | Scenario::DefaultParallelWithPublishers => {
                TimerPlacement::Parallel
            }
            Scenario::Single | Scenario::SingleWithPublishers => TimerPlacement::Single,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Long-lived owner of every worker and timer driver the scenarios use.
///
/// Build one per benchmark suite and run as many invocations as needed; the
/// same worker instances serve every invocation. Dropping the harness joins
/// all of its threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use guardflow::{contains_fallback, FixedDeadline, Harness, HarnessConfig};
///
/// let config = HarnessConfig::default().with_total(9);
/// let harness = Harness::with_deadlines(config, Arc::new(FixedDeadline::unbounded())).unwrap();
///
/// let list = harness.single().unwrap();
/// assert_eq!(list, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
/// assert!(!contains_fallback(&list));
/// ```
pub struct Harness {
    config: HarnessConfig,
    deadlines: Arc<dyn DeadlineSource>,
    pool: SharedPool,
    single: SingleWorker,
    publishers: Vec<SingleWorker>,
    parallel_timers: TimerDriver,
    single_timers: TimerDriver,
}

impl Harness {
    /// Harness drawing deadlines uniformly from the configured range.
    pub fn new(config: HarnessConfig) -> FlowResult<Self> {
        let deadlines = RandomDeadline::new(config.deadline_min, config.deadline_max);
        Self::with_deadlines(config, Arc::new(deadlines))
    }

    /// Harness drawing deadlines from `deadlines`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidConfig`](crate::FlowError::InvalidConfig) if
    /// `config` is invalid, or
    /// [`FlowError::WorkerUnavailable`](crate::FlowError::WorkerUnavailable) if a
    /// thread cannot be started.
    pub fn with_deadlines(
        config: HarnessConfig,
        deadlines: Arc<dyn DeadlineSource>,
    ) -> FlowResult<Self> {
        config.validate()?;

        let publishers = (1..=config.partitions)
            .map(|i| SingleWorker::new(format!("s{}", i)))
            .collect::<FlowResult<Vec<_>>>()?;

        let harness = Self {
            pool: SharedPool::with_available_parallelism("parallel")?,
            single: SingleWorker::new("single")?,
            publishers,
            parallel_timers: TimerDriver::parallel("parallel-timer")?,
            single_timers: TimerDriver::single("single-timer")?,
            deadlines,
            config,
        };

        #[cfg(feature = "tracing")]
        info!(
            total = harness.config.total,
            partitions = harness.config.partitions,
            pool_size = harness.pool.size(),
            "harness ready"
        );

        Ok(harness)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The `s1..sN` publisher workers
    pub fn publishers(&self) -> &[SingleWorker] {
        &self.publishers
    }

    /// Run one invocation of `scenario`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Producer`](crate::FlowError::Producer) if a producer
    /// fails, or
    /// [`FlowError::CollectionTimeout`](crate::FlowError::CollectionTimeout) if
    /// the outer bound elapses first.
    pub fn run(&self, scenario: Scenario) -> FlowResult<Vec<Element>> {
        #[cfg(feature = "tracing")]
        let started = Instant::now();
        #[cfg(feature = "tracing")]
        debug!(%scenario, "invocation starting");

        let timers = match scenario.timers() {
            TimerPlacement::Parallel => &self.parallel_timers,
            TimerPlacement::Single => &self.single_timers,
        };

        let sequences = if scenario.partitioned() {
            let count = self.publishers.len();
            self.publishers
                .iter()
                .enumerate()
                .map(|(index, worker)| {
                    self.guarded_on(Some(Share::new(index, count)?), timers, worker)
                })
                .collect::<FlowResult<Vec<_>>>()?
        } else {
            let worker: &dyn Worker = match scenario {
                Scenario::DefaultParallel => &self.pool,
                _ => &self.single,
            };
            vec![self.guarded_on(None, timers, worker)?]
        };

        let bound = self.config.outer_bound;
        let result = block_on(collect(merge(sequences), self.single_timers.start(bound), bound));

        #[cfg(feature = "tracing")]
        log_outcome(scenario, &result, started);

        result
    }

    // Producer -> guard -> hand-off to `worker`.
    fn guarded_on<W, TS>(
        &self,
        share: Option<Share>,
        timers: &TS,
        worker: &W,
    ) -> FlowResult<Handoff>
    where
        W: Worker + ?Sized,
        TS: TimerSource,
    {
        let producer = produce(self.config.total, share)?;
        let deadline = self.deadlines.next_deadline();
        let guarded = with_timeout(producer, deadline, FALLBACK, timers);
        bind_to(guarded, worker, self.config.handoff_capacity)
    }

    /// [`Scenario::DefaultParallel`]
    pub fn default_parallel(&self) -> FlowResult<Vec<Element>> {
        self.run(Scenario::DefaultParallel)
    }

    /// [`Scenario::DefaultParallelWithPublishers`]
    pub fn default_parallel_with_publishers(&self) -> FlowResult<Vec<Element>> {
        self.run(Scenario::DefaultParallelWithPublishers)
    }

    /// [`Scenario::Single`]
    pub fn single(&self) -> FlowResult<Vec<Element>> {
        self.run(Scenario::Single)
    }

    /// [`Scenario::SingleWithPublishers`]
    pub fn single_with_publishers(&self) -> FlowResult<Vec<Element>> {
        self.run(Scenario::SingleWithPublishers)
    }
}

#[cfg(feature = "tracing")]
fn log_outcome(scenario: Scenario, result: &FlowResult<Vec<Element>>, started: Instant) {
    let elapsed_us = started.elapsed().as_micros() as u64;
    match result {
        Ok(list) => debug!(
            %scenario,
            received = list.len(),
            elapsed_us,
            "invocation finished"
        ),
        Err(err) => info!(%scenario, error = %err, elapsed_us, "invocation failed"),
    }
}
