//! Core type definitions shared by every pipeline stage.
//!
//! This module defines the element type, the fallback sentinel, and the
//! [`Sequence`] capability every stage consumes and produces.

use futures::stream::{BoxStream, Stream};

use crate::error::ProducerError;

/// Value carried through the pipeline
pub type Element = i32;

/// Sentinel substituted for the rest of a sequence when its deadline elapses.
pub const FALLBACK: Element = -1;

/// A finite, lazily produced stream of elements.
///
/// Subscribing to a sequence means polling it; cancelling it means dropping it.
/// Every stage in this crate releases what it owns on drop (upstream producers,
/// pending timers, hand-off jobs), so dropping the outermost sequence cancels
/// the whole pipeline.
///
/// The trait is implemented for every suitable stream, so custom producers
/// only need to implement [`Stream`]:
///
/// ```
/// use futures::stream;
/// use guardflow::{ProducerError, Sequence};
///
/// fn assert_sequence<S: Sequence>(_: &S) {}
///
/// let custom = stream::iter(vec![Ok::<_, ProducerError>(7), Ok(8)]);
/// assert_sequence(&custom);
/// ```
pub trait Sequence: Stream<Item = Result<Element, ProducerError>> + Send + Unpin + 'static {}

impl<S> Sequence for S where
    S: Stream<Item = Result<Element, ProducerError>> + Send + Unpin + 'static
{
}

/// Type-erased sequence, used where heterogeneous stages are merged.
pub type BoxSequence = BoxStream<'static, Result<Element, ProducerError>>;

/// Erase a sequence's concrete type.
pub fn boxed<S: Sequence>(sequence: S) -> BoxSequence {
    Box::pin(sequence)
}
