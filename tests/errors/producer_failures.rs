//! Producer errors are the only failures that cross stage boundaries

use std::error::Error;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::executor::block_on;
use guardflow::{
    bind_to, boxed, collect, merge, with_timeout, FlowError, ProducerError, SingleWorker,
    TimerDriver, TimerSource, FALLBACK,
};

use crate::common::{eventually, failing_producer, DropProbe};

fn bound() -> Duration {
    Duration::from_secs(10)
}

#[test]
fn test_producer_error_reaches_collect() {
    let timers = TimerDriver::single("err-direct").unwrap();

    let result = block_on(collect(failing_producer(5, "boom"), timers.start(bound()), bound()));

    match result {
        Err(FlowError::Producer(err)) => assert_eq!(err, ProducerError::new("boom")),
        other => panic!("expected a producer error, got {other:?}"),
    }
}

#[test]
fn test_producer_error_passes_through_guard_and_handoff() {
    let worker = SingleWorker::new("err-s1").unwrap();
    let timers = TimerDriver::single("err-guard").unwrap();

    let guarded = with_timeout(
        failing_producer(3, "disk on fire"),
        Duration::from_secs(5),
        FALLBACK,
        &timers,
    );
    let handoff = bind_to(guarded, &worker, 2).unwrap();
    let result = block_on(collect(handoff, timers.start(bound()), bound()));

    let err = result.unwrap_err();
    assert!(matches!(err, FlowError::Producer(_)));
    assert!(err.to_string().contains("disk on fire"));
    assert!(err.source().is_some());
}

#[test]
fn test_first_error_cancels_sibling_inputs() {
    let timers = TimerDriver::single("err-siblings").unwrap();
    let (left, left_dropped) = DropProbe::new();
    let (right, right_dropped) = DropProbe::new();

    let sequences = vec![boxed(left), failing_producer(2, "boom"), boxed(right)];
    let result = block_on(collect(merge(sequences), timers.start(bound()), bound()));

    assert!(matches!(result, Err(FlowError::Producer(_))));
    assert!(left_dropped.load(Ordering::SeqCst));
    assert!(right_dropped.load(Ordering::SeqCst));
}

#[test]
fn test_error_on_one_publisher_cancels_the_others_on_their_workers() {
    let workers: Vec<_> = (1..=3)
        .map(|i| SingleWorker::new(format!("err-pub-{i}")).unwrap())
        .collect();
    let timers = TimerDriver::single("err-pub-timer").unwrap();
    let (first, first_dropped) = DropProbe::new();
    let (third, third_dropped) = DropProbe::new();

    let sequences = vec![
        bind_to(first, &workers[0], 4).unwrap(),
        bind_to(failing_producer(10, "publisher 2 failed"), &workers[1], 4).unwrap(),
        bind_to(third, &workers[2], 4).unwrap(),
    ];
    let result = block_on(collect(merge(sequences), timers.start(bound()), bound()));

    assert_eq!(
        result,
        Err(FlowError::Producer(ProducerError::new("publisher 2 failed")))
    );
    assert!(eventually(Duration::from_secs(1), || {
        first_dropped.load(Ordering::SeqCst) && third_dropped.load(Ordering::SeqCst)
    }));
}

#[test]
fn test_error_before_first_element_is_not_a_timeout() {
    let timers = TimerDriver::single("err-immediate").unwrap();

    // Already expired deadline: the error still wins because upstream is polled first
    let guarded = with_timeout(failing_producer(0, "early"), Duration::ZERO, FALLBACK, &timers);
    let result = block_on(collect(guarded, timers.start(bound()), bound()));

    assert!(matches!(result, Err(FlowError::Producer(_))));
}
