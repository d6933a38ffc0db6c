//! Awaiting pipelines from a futures thread pool

use std::sync::Arc;
use std::time::Duration;

use futures::executor::{block_on, ThreadPool};
use futures::task::SpawnExt;
use guardflow::{
    bind_to, collect, merge, produce, with_timeout, Share, SharedPool, TimerDriver, TimerSource,
    FALLBACK,
};

use crate::common::{expected, sorted};

#[test]
fn test_collect_spawned_on_thread_pool() {
    let executor = ThreadPool::builder().pool_size(2).create().unwrap();
    let workers = SharedPool::new("pool-workers", 2).unwrap();
    let timers = Arc::new(TimerDriver::parallel("pool-timers").unwrap());

    let sequences: Vec<_> = (0..4)
        .map(|index| {
            let share = Share::new(index, 4).unwrap();
            let guarded = with_timeout(
                produce(4_000, Some(share)).unwrap(),
                Duration::from_secs(10),
                FALLBACK,
                &timers,
            );
            bind_to(guarded, &workers, 64).unwrap()
        })
        .collect();

    let bound = Duration::from_secs(10);
    let outer = timers.start(bound);
    let handle = executor
        .spawn_with_handle(collect(merge(sequences), outer, bound))
        .unwrap();

    let list = block_on(handle).unwrap();
    assert_eq!(sorted(list), expected(4_000));
}

#[test]
fn test_many_concurrent_collections_share_one_driver() {
    let executor = ThreadPool::builder().pool_size(4).create().unwrap();
    let timers = Arc::new(TimerDriver::single("pool-shared-driver").unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let timers = Arc::clone(&timers);
            executor
                .spawn_with_handle(async move {
                    let bound = Duration::from_secs(10);
                    let guarded =
                        with_timeout(produce(500, None).unwrap(), bound, FALLBACK, &timers);
                    collect(guarded, timers.start(bound), bound).await
                })
                .unwrap()
        })
        .collect();

    for handle in handles {
        assert_eq!(block_on(handle).unwrap(), expected(500));
    }
}
