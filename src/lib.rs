//! Timeout-Guarded Producer Merge Harness
//!
//! A small, runtime-agnostic harness for measuring how timeout-bounded streams
//! behave under different scheduling strategies: a shared parallel pool vs.
//! dedicated single-threaded workers, with one producer or several producers
//! merged into one result.
//!
//! # Features
//!
//! - **Explicit capabilities**: sequences are plain [`futures::Stream`]s
//!   ([`Sequence`]), workers implement [`Worker`], timers implement [`Timer`].
//!   No scheduler is ambient; everything is constructed and owned explicitly.
//! - **Precise timers**: [`TimerDriver`] parks on a condition variable until the
//!   exact instant the earliest deadline is due. Resetting a timer per element
//!   costs a clock read, not a lock.
//! - **Fallback, not failure**: a guarded sequence that misses its deadline ends
//!   with a single fallback element ([`FALLBACK`]) and completes successfully.
//! - **Deterministic tie-break**: when completion and expiry coincide,
//!   completion wins. See [`guard`](crate::guard) for the exact rules.
//! - **Cancellation by drop**: dropping the outermost sequence aborts every
//!   hand-off job, producer and pending timer. No timer fires afterwards.
//! - **Injectable randomness**: per-sequence deadlines come from a
//!   [`DeadlineSource`]; tests swap in [`FixedDeadline`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use guardflow::{contains_fallback, FixedDeadline, Harness, HarnessConfig, Scenario};
//!
//! let config = HarnessConfig::default().with_total(1_000);
//! let harness = Harness::with_deadlines(config, Arc::new(FixedDeadline::unbounded())).unwrap();
//!
//! for scenario in Scenario::ALL {
//!     let list = harness.run(scenario).unwrap();
//!     assert_eq!(list.len(), 1_000);
//!     assert!(!contains_fallback(&list));
//! }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! produce ──► with_timeout ──► bind_to(worker) ──┐
//! produce ──► with_timeout ──► bind_to(worker) ──┼──► merge ──► collect ──► Vec<Element>
//! produce ──► with_timeout ──► bind_to(worker) ──┘
//! ```
//!
//! Every stage can be used on its own:
//!
//! ```
//! use std::time::Duration;
//! use futures::executor::block_on;
//! use guardflow::*;
//!
//! let timers = TimerDriver::single("timers").unwrap();
//! let workers: Vec<_> = (1..=3)
//!     .map(|i| SingleWorker::new(format!("s{i}")).unwrap())
//!     .collect();
//!
//! let sequences = workers.iter().enumerate().map(|(i, worker)| {
//!     let share = Share::new(i, 3).unwrap();
//!     let guarded = with_timeout(
//!         produce(9, Some(share)).unwrap(),
//!         Duration::from_secs(5),
//!         FALLBACK,
//!         &timers,
//!     );
//!     bind_to(guarded, worker, DEFAULT_CAPACITY).unwrap()
//! });
//!
//! let bound = Duration::from_secs(1);
//! let mut list = block_on(collect(merge(sequences), timers.start(bound), bound)).unwrap();
//! list.sort();
//! assert_eq!(list, (0..9).collect::<Vec<_>>());
//! ```
//!
//! # Scenarios
//!
//! [`Harness`] owns the long-lived resources and exposes the four benchmarked
//! shapes listed in [`scenario`](crate::scenario). Workers are created once and
//! reused by every invocation.
//!
//! # Errors
//!
//! Per-item timeouts never surface as errors. A failing producer cancels its
//! siblings and surfaces as [`FlowError::Producer`]; an invocation exceeding
//! the outer bound surfaces as [`FlowError::CollectionTimeout`].
//!
//! # Tracing
//!
//! Enable the `tracing` feature to get structured events for worker and timer
//! lifecycles, fallbacks, merge failures and invocation outcomes.

pub mod collect;
pub mod config;
pub mod deadline;
pub mod error;
pub mod guard;
pub mod handoff;
pub mod merge;
pub mod producer;
pub mod scenario;
pub mod timer;
pub mod types;
pub mod worker;

pub use collect::{collect, contains_fallback, Collect};
pub use config::HarnessConfig;
pub use deadline::{DeadlineSource, FixedDeadline, RandomDeadline};
pub use error::{FlowError, FlowResult, ProducerError};
pub use guard::{with_timeout, GuardOutcome, Guarded};
pub use handoff::{bind_to, Handoff, DEFAULT_CAPACITY};
pub use merge::{merge, Merge};
pub use producer::{produce, Range, Share};
pub use scenario::{Harness, Scenario, TimerPlacement};
pub use timer::{DriverTimer, Timer, TimerDriver, TimerSource};
pub use types::{boxed, BoxSequence, Element, Sequence, FALLBACK};
pub use worker::{SharedPool, SingleWorker, Worker};
