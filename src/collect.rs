//! Collecting a sequence under an outer deadline.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::StreamExt;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult};
use crate::timer::Timer;
use crate::types::{Element, Sequence, FALLBACK};

/// Future buffering a whole sequence. Created by [`collect`].
///
/// Resolves to the arrival-ordered list once the sequence completes. Fails
/// with [`FlowError::Producer`] on the first producer error, or with
/// [`FlowError::CollectionTimeout`] once the outer timer expires. Either way
/// the sequence is dropped on the spot, cancelling everything upstream.
pub struct Collect<S, T> {
    sequence: Option<S>,
    timer: T,
    bound: Duration,
    items: Vec<Element>,
}

/// Collect `sequence`, giving up when `timer` (started for `bound`) expires.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use futures::executor::block_on;
/// use guardflow::{collect, produce, TimerDriver, TimerSource};
///
/// let timers = TimerDriver::single("doc-collect").unwrap();
/// let bound = Duration::from_secs(1);
///
/// let list = block_on(collect(produce(9, None).unwrap(), timers.start(bound), bound)).unwrap();
/// assert_eq!(list, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
/// ```
pub fn collect<S, T>(sequence: S, timer: T, bound: Duration) -> Collect<S, T>
where
    S: Sequence,
    T: Timer,
{
    let (lower, _) = sequence.size_hint();
    Collect {
        sequence: Some(sequence),
        timer,
        bound,
        items: Vec::with_capacity(lower),
    }
}

impl<S, T> Collect<S, T>
where
    S: Sequence,
    T: Timer,
{
    fn timed_out(&mut self) -> Poll<FlowResult<Vec<Element>>> {
        self.sequence = None;
        self.timer.cancel();

        #[cfg(feature = "tracing")]
        warn!(
            bound_ms = self.bound.as_millis() as u64,
            received = self.items.len(),
            "outer bound elapsed, collection cancelled"
        );

        Poll::Ready(Err(FlowError::CollectionTimeout {
            bound: self.bound,
            received: self.items.len(),
        }))
    }
}

impl<S, T> Future for Collect<S, T>
where
    S: Sequence,
    T: Timer,
{
    type Output = FlowResult<Vec<Element>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        loop {
            if this.timer.is_expired() {
                return this.timed_out();
            }
            let Some(sequence) = this.sequence.as_mut() else {
                // Already resolved
                return Poll::Pending;
            };

            match sequence.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(value))) => this.items.push(value),
                Poll::Ready(Some(Err(err))) => {
                    this.sequence = None;
                    this.timer.cancel();
                    return Poll::Ready(Err(FlowError::Producer(err)));
                }
                Poll::Ready(None) => {
                    this.sequence = None;
                    this.timer.cancel();

                    #[cfg(feature = "tracing")]
                    debug!(received = this.items.len(), "collection complete");

                    return Poll::Ready(Ok(std::mem::take(&mut this.items)));
                }
                Poll::Pending => {
                    return match this.timer.poll_expired(cx) {
                        Poll::Ready(()) => this.timed_out(),
                        Poll::Pending => Poll::Pending,
                    };
                }
            }
        }
    }
}

/// Whether a collected list contains the fallback sentinel, i.e. whether any
/// guarded sequence timed out.
pub fn contains_fallback(list: &[Element]) -> bool {
    list.contains(&FALLBACK)
}
