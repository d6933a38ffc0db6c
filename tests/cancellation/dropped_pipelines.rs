//! Dropping guards and hand-offs before they complete

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::executor::block_on;
use futures::stream::StreamExt;
use guardflow::{
    bind_to, collect, merge, with_timeout, Element, FlowError, SharedPool, SingleWorker,
    TimerDriver, TimerSource, Worker, FALLBACK,
};
use parking_lot::Mutex;

use crate::common::{eventually, DropProbe};

#[test]
fn test_dropping_handoff_drops_upstream_on_worker() {
    let worker = SingleWorker::new("drop-s1").unwrap();
    let (probe, dropped) = DropProbe::new();

    let handoff = bind_to(probe, &worker, 4).unwrap();
    assert_eq!(handoff.worker(), "drop-s1");
    drop(handoff);

    assert!(eventually(Duration::from_secs(1), || dropped.load(
        Ordering::SeqCst
    )));
}

#[test]
fn test_dropping_handoff_on_shared_pool_drops_upstream() {
    let pool = SharedPool::new("drop-pool", 2).unwrap();
    let (probe, dropped) = DropProbe::new();

    let handoff = bind_to(probe, &pool, 4).unwrap();
    drop(handoff);

    assert!(eventually(Duration::from_secs(1), || dropped.load(
        Ordering::SeqCst
    )));
}

#[test]
fn test_outer_timeout_stops_guards_from_emitting_fallbacks() {
    let workers: Vec<_> = (1..=2)
        .map(|i| SingleWorker::new(format!("drop-buffer-{i}")).unwrap())
        .collect();
    let timers = TimerDriver::single("drop-buffer-timer").unwrap();
    let buffer: Arc<Mutex<Vec<Element>>> = Arc::new(Mutex::new(Vec::new()));

    // Silent guards on the workers; a fallback emitted after cancellation
    // would be recorded on the worker side before reaching the channel.
    let sequences: Vec<_> = workers
        .iter()
        .map(|worker| {
            let (probe, _dropped) = DropProbe::new();
            let sink = Arc::clone(&buffer);
            let guarded = with_timeout(probe, Duration::from_millis(200), FALLBACK, &timers)
                .inspect(move |item| {
                    if let Ok(value) = item {
                        sink.lock().push(*value);
                    }
                });
            bind_to(guarded, worker, 4).unwrap()
        })
        .collect();

    let bound = Duration::from_millis(20);
    let result = block_on(collect(merge(sequences), timers.start(bound), bound));
    assert!(matches!(result, Err(FlowError::CollectionTimeout { received: 0, .. })));

    // Well past the guard deadline
    std::thread::sleep(Duration::from_millis(400));
    assert!(buffer.lock().is_empty());
}

#[test]
fn test_stale_registrations_are_discarded_when_due() {
    let timers = TimerDriver::single("drop-stale").unwrap();
    let (probe, _dropped) = DropProbe::new();

    let mut guarded = with_timeout(probe, Duration::from_millis(200), FALLBACK, &timers);
    let first = block_on(futures::future::poll_fn(|cx| {
        std::task::Poll::Ready(guarded.poll_next_unpin(cx))
    }));
    assert!(first.is_pending());
    assert_eq!(timers.pending(), 1);

    drop(guarded);
    assert!(eventually(Duration::from_secs(2), || timers.pending() == 0));
}

#[test]
fn test_worker_keeps_serving_after_cancelled_jobs() {
    let worker = SingleWorker::new("drop-reuse").unwrap();

    for _ in 0..10 {
        let (probe, _dropped) = DropProbe::new();
        drop(bind_to(probe, &worker, 1).unwrap());
    }

    let handoff = bind_to(guardflow::produce(3, None).unwrap(), &worker, 1).unwrap();
    let values: Vec<_> = block_on(handoff.map(Result::unwrap).collect());
    assert_eq!(values, vec![0, 1, 2]);
    assert_eq!(worker.submitted(), 11);
    assert_eq!(worker.name(), "drop-reuse");
}
