//! Invocations exceeding the outer bound

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::executor::block_on;
use futures::stream::{self, StreamExt};
use guardflow::{
    bind_to, collect, merge, produce, Element, FlowError, ProducerError, SingleWorker,
    TimerDriver, TimerSource,
};

use crate::common::{eventually, DropProbe};

#[test]
fn test_stalled_sequence_fails_with_collection_timeout() {
    let timers = TimerDriver::single("outer-stalled").unwrap();
    let bound = Duration::from_millis(50);

    let started = Instant::now();
    let result = block_on(collect(
        stream::pending::<Result<Element, ProducerError>>(),
        timers.start(bound),
        bound,
    ));

    assert!(started.elapsed() >= bound);
    match result {
        Err(FlowError::CollectionTimeout { bound: b, received }) => {
            assert_eq!(b, bound);
            assert_eq!(received, 0);
        }
        other => panic!("expected a collection timeout, got {other:?}"),
    }
}

#[test]
fn test_partial_results_are_discarded_on_timeout() {
    let timers = TimerDriver::single("outer-partial").unwrap();
    let (probe, dropped) = DropProbe::new();
    let bound = Duration::from_millis(50);

    let sequences = vec![
        guardflow::boxed(produce(5, None).unwrap()),
        guardflow::boxed(probe),
    ];
    let result = block_on(collect(merge(sequences), timers.start(bound), bound));

    assert!(matches!(
        result,
        Err(FlowError::CollectionTimeout { received: 5, .. })
    ));
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_timed_out_worker_job_stops_producing() {
    let worker = SingleWorker::new("outer-endless").unwrap();
    let timers = TimerDriver::single("outer-endless-timer").unwrap();
    let produced = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&produced);
    let endless = stream::iter(0..).map(move |value: Element| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<Element, ProducerError>(value)
    });
    let handoff = bind_to(endless, &worker, 4).unwrap();

    let bound = Duration::from_millis(30);
    let result = block_on(collect(handoff, timers.start(bound), bound));
    assert!(matches!(result, Err(FlowError::CollectionTimeout { .. })));

    // The aborted job may finish its current poll, then nothing more
    let settled = eventually(Duration::from_secs(2), || {
        let first = produced.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        produced.load(Ordering::SeqCst) == first
    });
    assert!(settled);

    let before = produced.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(produced.load(Ordering::SeqCst), before);
}
