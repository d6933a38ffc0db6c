//! Bounded integer producers.
//!
//! A producer yields `0..total`, or one disjoint slice of it when the range is
//! partitioned across several publishers.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};

use crate::error::{FlowError, FlowResult, ProducerError};
use crate::types::Element;

/// One slice of a partitioned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    index: usize,
    count: usize,
}

impl Share {
    /// Share `index` of `count` equal shares.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidShare`] if `count` is zero or `index >= count`.
    pub fn new(index: usize, count: usize) -> FlowResult<Self> {
        if count == 0 || index >= count {
            return Err(FlowError::InvalidShare { index, count });
        }
        Ok(Self { index, count })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Bounds of this share within `0..total`.
    ///
    /// Every share spans `total / count` elements and the last one also absorbs
    /// the remainder, so the shares of one partition are disjoint and their
    /// union is exactly `0..total`.
    pub fn bounds(&self, total: usize) -> (usize, usize) {
        let size = total / self.count;
        let start = self.index * size;
        if self.index + 1 == self.count {
            (start, total)
        } else {
            (start, start + size)
        }
    }
}

/// Restartable range of elements; always ready, never fails.
#[derive(Debug, Clone)]
pub struct Range {
    next: Element,
    end: Element,
}

impl Range {
    /// Number of elements not yet produced
    pub fn remaining(&self) -> usize {
        (self.end - self.next).max(0) as usize
    }
}

impl Stream for Range {
    type Item = Result<Element, ProducerError>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.next >= self.end {
            return Poll::Ready(None);
        }
        let value = self.next;
        self.next += 1;
        Poll::Ready(Some(Ok(value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl FusedStream for Range {
    fn is_terminated(&self) -> bool {
        self.next >= self.end
    }
}

/// Produce `0..total`, or the slice of it that `share` selects.
///
/// Every call returns a fresh sequence; nothing is shared between calls.
///
/// # Errors
///
/// Returns [`FlowError::InvalidConfig`] if `total` does not fit an [`Element`].
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use futures::StreamExt;
/// use guardflow::{produce, Share};
///
/// let middle = produce(9, Some(Share::new(1, 3).unwrap())).unwrap();
/// let values: Vec<_> = block_on(middle.map(Result::unwrap).collect());
/// assert_eq!(values, vec![3, 4, 5]);
/// ```
pub fn produce(total: usize, share: Option<Share>) -> FlowResult<Range> {
    if total > Element::MAX as usize {
        return Err(FlowError::InvalidConfig {
            key: "total",
            value: total.to_string(),
            reason: format!("must not exceed {}", Element::MAX),
        });
    }

    let (start, end) = match share {
        Some(share) => share.bounds(total),
        None => (0, total),
    };

    Ok(Range {
        next: start as Element,
        end: end as Element,
    })
}
