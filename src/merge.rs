//! Arrival-order merge of several sequences.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, SelectAll, Stream, StreamExt};

#[cfg(feature = "tracing")]
use tracing::warn;

use crate::error::ProducerError;
use crate::types::{boxed, BoxSequence, Element, Sequence};

/// Interleaving of several sequences. Created by [`merge`].
///
/// Elements are yielded as they arrive; order is preserved within each input
/// but unspecified across inputs. The merge completes once every input has
/// completed. The first producer error is yielded, every remaining input is
/// dropped (cancelling it), and the merge ends.
pub struct Merge {
    inputs: Option<SelectAll<BoxSequence>>,
    width: usize,
}

/// Merge `sequences` into one arrival-ordered sequence.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use futures::StreamExt;
/// use guardflow::{merge, produce, Share};
///
/// let shares = (0..3).map(|i| produce(9, Some(Share::new(i, 3).unwrap())).unwrap());
/// let mut values: Vec<_> = block_on(merge(shares).map(Result::unwrap).collect());
/// values.sort();
/// assert_eq!(values, (0..9).collect::<Vec<_>>());
/// ```
pub fn merge<I>(sequences: I) -> Merge
where
    I: IntoIterator,
    I::Item: Sequence,
{
    let inputs: SelectAll<BoxSequence> = sequences.into_iter().map(boxed).collect();
    Merge {
        width: inputs.len(),
        inputs: Some(inputs),
    }
}

impl Merge {
    /// Number of inputs the merge started with
    pub fn width(&self) -> usize {
        self.width
    }

    /// Inputs that have not completed yet
    pub fn active(&self) -> usize {
        self.inputs.as_ref().map_or(0, |inputs| inputs.len())
    }
}

impl Stream for Merge {
    type Item = Result<Element, ProducerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(inputs) = self.inputs.as_mut() else {
            return Poll::Ready(None);
        };

        match inputs.poll_next_unpin(cx) {
            Poll::Ready(Some(Err(err))) => {
                #[cfg(feature = "tracing")]
                warn!(
                    error = %err,
                    cancelled = inputs.len(),
                    "input failed, cancelling remaining inputs"
                );

                self.inputs = None;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                self.inputs = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl FusedStream for Merge {
    fn is_terminated(&self) -> bool {
        self.inputs.is_none()
    }
}
