//! Per-item timeout guard.
//!
//! [`with_timeout`] wraps a sequence so that a gap longer than the deadline
//! between two elements (or before the first one) ends the sequence with a
//! single fallback element. The timeout is recovered here; downstream stages
//! only ever see a successful completion.
//!
//! # Tie-break
//!
//! Upstream completion and timer expiry can be observable at the same moment.
//! The guard resolves that in one place: [`Guarded::poll_next`] owns the whole
//! state machine through `&mut self` and always polls upstream first, so
//!
//! - upstream completion wins over an expired timer (no fallback is emitted),
//! - an element that arrives after its deadline elapsed is dropped and
//!   replaced by the fallback, because the gap already exceeded the deadline,
//! - the timer is only consulted when upstream has nothing to offer.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{FusedStream, Stream, StreamExt};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::ProducerError;
use crate::timer::{Timer, TimerSource};
use crate::types::{Element, Sequence};

/// How a guarded sequence ended, once it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Upstream completed; every element was passed through
    Completed,
    /// The deadline elapsed; the fallback was emitted last
    TimedOut,
    /// Upstream failed; the error was passed through
    Failed,
}

/// Sequence guarded by a per-item deadline. Created by [`with_timeout`].
pub struct Guarded<S, T> {
    upstream: Option<S>,
    timer: T,
    deadline: Duration,
    fallback: Element,
    outcome: Option<GuardOutcome>,
}

/// Guard `sequence` with `deadline`, substituting `fallback` on expiry.
///
/// The timer starts now, taken from `timers`, and restarts with every element.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use futures::executor::block_on;
/// use futures::StreamExt;
/// use guardflow::{produce, with_timeout, TimerDriver, FALLBACK};
///
/// let timers = TimerDriver::single("doc-timers").unwrap();
///
/// let relaxed = with_timeout(produce(3, None).unwrap(), Duration::from_secs(5), FALLBACK, &timers);
/// let values: Vec<_> = block_on(relaxed.map(Result::unwrap).collect());
/// assert_eq!(values, vec![0, 1, 2]);
///
/// let impatient = with_timeout(produce(3, None).unwrap(), Duration::ZERO, FALLBACK, &timers);
/// let values: Vec<_> = block_on(impatient.map(Result::unwrap).collect());
/// assert_eq!(values, vec![FALLBACK]);
/// ```
pub fn with_timeout<S, TS>(
    sequence: S,
    deadline: Duration,
    fallback: Element,
    timers: &TS,
) -> Guarded<S, TS::Timer>
where
    S: Sequence,
    TS: TimerSource + ?Sized,
{
    Guarded {
        upstream: Some(sequence),
        timer: timers.start(deadline),
        deadline,
        fallback,
        outcome: None,
    }
}

impl<S, T> Guarded<S, T>
where
    S: Sequence,
    T: Timer,
{
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// `None` while the sequence is still running
    pub fn outcome(&self) -> Option<GuardOutcome> {
        self.outcome
    }

    // Drops upstream (cancelling the producer) and disarms the timer.
    fn finish(&mut self, outcome: GuardOutcome) {
        self.upstream = None;
        self.timer.cancel();
        self.outcome = Some(outcome);
    }

    fn time_out(&mut self) -> Poll<Option<Result<Element, ProducerError>>> {
        #[cfg(feature = "tracing")]
        debug!(
            deadline_us = self.deadline.as_micros() as u64,
            fallback = self.fallback,
            "deadline elapsed, emitting fallback"
        );

        self.finish(GuardOutcome::TimedOut);
        Poll::Ready(Some(Ok(self.fallback)))
    }
}

impl<S, T> Stream for Guarded<S, T>
where
    S: Sequence,
    T: Timer,
{
    type Item = Result<Element, ProducerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let Some(upstream) = this.upstream.as_mut() else {
            return Poll::Ready(None);
        };

        match upstream.poll_next_unpin(cx) {
            Poll::Ready(None) => {
                this.finish(GuardOutcome::Completed);
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(_late))) if this.timer.is_expired() => this.time_out(),
            Poll::Ready(Some(Ok(value))) => {
                this.timer.reset(this.deadline);
                Poll::Ready(Some(Ok(value)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.finish(GuardOutcome::Failed);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Pending => match this.timer.poll_expired(cx) {
                Poll::Ready(()) => this.time_out(),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<S, T> FusedStream for Guarded<S, T>
where
    S: Sequence,
    T: Timer,
{
    fn is_terminated(&self) -> bool {
        self.upstream.is_none()
    }
}
