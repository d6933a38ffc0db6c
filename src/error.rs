//! Error types for harness construction and pipeline execution.
//!
//! A fired per-item timeout is not an error: the guard recovers it locally by
//! emitting the fallback value. Everything in this module is a genuine failure
//! that propagates to the caller.

use std::time::Duration;

/// Failure raised while generating an element.
///
/// This is the item error of every sequence. It travels through the guard and
/// the hand-off unchanged, fails the merge, and surfaces from the collector as
/// [`FlowError::Producer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerError {
    pub message: String,
}

impl ProducerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProducerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "producer failed: {}", self.message)
    }
}

impl std::error::Error for ProducerError {}

/// Errors that can occur while building a harness or running a pipeline
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FlowError {
    /// A producer failed; sibling sequences were cancelled
    Producer(ProducerError),

    /// The outer bound elapsed before the merged sequence completed
    CollectionTimeout { bound: Duration, received: usize },

    /// The worker has shut down or its thread could not be started
    WorkerUnavailable { worker: String },

    /// A partition share outside `0..count`, or a zero share count
    InvalidShare { index: usize, count: usize },

    /// A configuration value could not be parsed or failed validation
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::Producer(err) => write!(f, "{}", err),
            FlowError::CollectionTimeout { bound, received } => {
                write!(
                    f,
                    "Collection did not complete within {}ms ({} elements received)\n\
                     \n\
                     The outer bound is far above any per-item deadline, so this usually \
                     means a worker was starved.",
                    bound.as_millis(),
                    received
                )
            }
            FlowError::WorkerUnavailable { worker } => {
                write!(f, "Worker '{}' is not accepting jobs", worker)
            }
            FlowError::InvalidShare { index, count } => {
                write!(
                    f,
                    "Invalid share {} of {}: index must be below a non-zero count",
                    index, count
                )
            }
            FlowError::InvalidConfig { key, value, reason } => {
                write!(f, "Invalid value '{}' for {}: {}", value, key, reason)
            }
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::Producer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProducerError> for FlowError {
    fn from(err: ProducerError) -> Self {
        FlowError::Producer(err)
    }
}

/// Result type for harness operations
pub type FlowResult<T> = Result<T, FlowError>;
