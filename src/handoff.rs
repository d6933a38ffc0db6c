//! Scheduler binding: moving a sequence onto a worker.
//!
//! [`bind_to`] submits a forwarding job to a [`Worker`]. The job polls the
//! bound sequence (and with it the guard and its timer) on the worker's
//! thread and pushes every item into a bounded channel. The returned
//! [`Handoff`] yields the same items, in the same order, wherever it is
//! polled.
//!
//! Dropping a [`Handoff`] aborts its job. The aborted job is never polled
//! again and its upstream is dropped on the worker, so a pending timer cannot
//! fire into a cancelled pipeline.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::future::{AbortHandle, Abortable};
use futures::sink::SinkExt;
use futures::stream::{FusedStream, Stream, StreamExt};
use futures::FutureExt;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::{FlowResult, ProducerError};
use crate::types::{Element, Sequence};
use crate::worker::Worker;

/// Items forwarded before the job yields back to its executor.
pub const YIELD_BUDGET: usize = 1024;

/// Default number of in-flight items between a worker and its consumer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Sequence whose upstream runs on a worker. Created by [`bind_to`].
pub struct Handoff {
    items: mpsc::Receiver<Result<Element, ProducerError>>,
    job: AbortHandle,
    worker: String,
}

impl Handoff {
    /// Name of the worker driving the upstream
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Abort the forwarding job now; buffered items remain readable.
    pub fn cancel(&self) {
        self.job.abort();
    }
}

/// Bind `sequence` to `worker`, buffering up to `capacity` items in between.
///
/// # Errors
///
/// Returns [`FlowError::WorkerUnavailable`](crate::FlowError::WorkerUnavailable)
/// if the worker has shut down.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use futures::StreamExt;
/// use guardflow::{bind_to, produce, SingleWorker};
///
/// let worker = SingleWorker::new("doc-s1").unwrap();
/// let handoff = bind_to(produce(4, None).unwrap(), &worker, 2).unwrap();
///
/// let values: Vec<_> = block_on(handoff.map(Result::unwrap).collect());
/// assert_eq!(values, vec![0, 1, 2, 3]);
/// ```
pub fn bind_to<S, W>(sequence: S, worker: &W, capacity: usize) -> FlowResult<Handoff>
where
    S: Sequence,
    W: Worker + ?Sized,
{
    // mpsc::channel adds one slot per sender on top of the buffer
    let (tx, rx) = mpsc::channel(capacity.saturating_sub(1));
    let (job, registration) = AbortHandle::new_pair();

    let forward = Abortable::new(forward(sequence, tx), registration).map(|_| ());
    worker.submit(forward.boxed())?;

    Ok(Handoff {
        items: rx,
        job,
        worker: worker.name().to_string(),
    })
}

async fn forward<S: Sequence>(
    mut sequence: S,
    mut tx: mpsc::Sender<Result<Element, ProducerError>>,
) {
    let mut budget = YIELD_BUDGET;
    while let Some(item) = sequence.next().await {
        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            // Consumer is gone
            break;
        }
        if failed {
            break;
        }

        budget -= 1;
        if budget == 0 {
            budget = YIELD_BUDGET;
            yield_now().await;
        }
    }

    #[cfg(feature = "tracing")]
    trace!("hand-off job finished");
}

// Wakes itself once so other jobs on the same executor get a turn.
fn yield_now() -> impl std::future::Future<Output = ()> {
    let mut yielded = false;
    futures::future::poll_fn(move |cx| {
        if yielded {
            return Poll::Ready(());
        }
        yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
}

impl Stream for Handoff {
    type Item = Result<Element, ProducerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.items.poll_next_unpin(cx)
    }
}

impl FusedStream for Handoff {
    fn is_terminated(&self) -> bool {
        self.items.is_terminated()
    }
}

impl Drop for Handoff {
    fn drop(&mut self) {
        self.job.abort();
    }
}
