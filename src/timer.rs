//! Deadline timers backed by dedicated driver threads.
//!
//! A [`TimerDriver`] owns one or more shards. Each shard is an OS thread with a
//! min-heap of registrations, parked on a condition variable until the earliest
//! registration is due. Waiting uses `Condvar::wait_until` on a monotonic
//! [`Instant`], so wake-ups are as precise as the OS scheduler allows; there is
//! no tick to round deadlines to.
//!
//! # Lazy registration
//!
//! A guard resets its timer on every element, which may be millions of times per
//! second. [`DriverTimer::reset`] therefore only moves a local expiry instant.
//! The driver is contacted from [`Timer::poll_expired`] when the owner is about
//! to park, and a registration that fires before the (since extended) expiry
//! simply wakes the owner, which registers again.
//!
//! # Cancellation
//!
//! Registrations hold a [`Weak`] reference to the timer's shared entry. Dropping
//! or cancelling a [`DriverTimer`] releases that entry, so a stale registration
//! can never wake anybody.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use futures::task::AtomicWaker;
use parking_lot::{Condvar, Mutex, MutexGuard};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::error::{FlowError, FlowResult};

/// A resettable deadline.
///
/// The timer starts when it is created by a [`TimerSource`]. Expiry is judged
/// against the wall clock, not against driver wake-ups, so [`Timer::is_expired`]
/// is exact even when the driver has not run yet.
pub trait Timer: Send + Unpin + 'static {
    /// Restart the timer so that it expires `deadline` from now.
    fn reset(&mut self, deadline: Duration);

    /// Disarm the timer. A cancelled timer never expires until it is reset.
    fn cancel(&mut self);

    /// Whether the current deadline has elapsed.
    fn is_expired(&self) -> bool;

    /// Resolve once the current deadline has elapsed, registering `cx` for a
    /// wake-up otherwise.
    fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<()>;
}

/// Factory for [`Timer`]s.
pub trait TimerSource: Send + Sync {
    type Timer: Timer;

    /// Start a timer expiring `deadline` from now.
    fn start(&self, deadline: Duration) -> Self::Timer;
}

impl<S: TimerSource + ?Sized> TimerSource for Arc<S> {
    type Timer = S::Timer;

    fn start(&self, deadline: Duration) -> Self::Timer {
        (**self).start(deadline)
    }
}

// Deadlines too large to represent are clamped to a century.
fn instant_after(deadline: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(deadline)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60))
}

#[derive(Default)]
struct Entry {
    fired: AtomicBool,
    waker: AtomicWaker,
}

struct Registration {
    at: Instant,
    seq: u64,
    entry: Weak<Entry>,
}

// Reversed so that BinaryHeap pops the earliest registration first.
impl Ord for Registration {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Registration {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Registration {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Registration {}

#[derive(Default)]
struct ShardState {
    heap: BinaryHeap<Registration>,
    next_seq: u64,
    shutdown: bool,
}

#[derive(Default)]
struct Shard {
    state: Mutex<ShardState>,
    wakeup: Condvar,
}

impl Shard {
    fn schedule(&self, at: Instant, entry: Weak<Entry>) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let earliest = state.heap.peek().map_or(true, |head| at < head.at);
        state.heap.push(Registration { at, seq, entry });
        drop(state);

        // Only a new head changes how long the driver should sleep
        if earliest {
            self.wakeup.notify_one();
        }
    }

    fn pending(&self) -> usize {
        self.state.lock().heap.len()
    }

    fn run(&self) {
        let mut state = self.state.lock();
        let mut due = Vec::new();
        while !state.shutdown {
            let now = Instant::now();
            match state.heap.peek().map(|head| head.at) {
                None => self.wakeup.wait(&mut state),
                Some(at) if at > now => {
                    self.wakeup.wait_until(&mut state, at);
                }
                Some(_) => {
                    while state.heap.peek().is_some_and(|head| head.at <= now) {
                        if let Some(registration) = state.heap.pop() {
                            due.push(registration.entry);
                        }
                    }
                    // Wakers may schedule tasks; never hold the heap lock while they run
                    MutexGuard::unlocked(&mut state, || fire(&mut due));
                }
            }
        }
    }
}

fn fire(due: &mut Vec<Weak<Entry>>) {
    for entry in due.drain(..) {
        if let Some(entry) = entry.upgrade() {
            entry.fired.store(true, Ordering::Release);
            entry.waker.wake();
        }
    }
}

/// Timer service with one or more dedicated driver threads.
///
/// Timers are assigned to shards round-robin. Dropping the driver stops and
/// joins every shard; timers started from it still report expiry through
/// [`Timer::is_expired`] but are no longer woken.
pub struct TimerDriver {
    name: String,
    shards: Vec<Arc<Shard>>,
    threads: Vec<JoinHandle<()>>,
    next: AtomicUsize,
}

impl TimerDriver {
    /// Start a driver named `name` with `shards` threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WorkerUnavailable`] if a driver thread cannot be spawned.
    pub fn new(name: impl Into<String>, shards: usize) -> FlowResult<Self> {
        let name = name.into();
        let mut driver = Self {
            name,
            shards: Vec::new(),
            threads: Vec::new(),
            next: AtomicUsize::new(0),
        };

        for index in 0..shards.max(1) {
            let shard = Arc::new(Shard::default());
            let thread_name = format!("{}-{}", driver.name, index);
            let runner = Arc::clone(&shard);
            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || runner.run())
                .map_err(|_| FlowError::WorkerUnavailable {
                    worker: driver.name.clone(),
                })?;
            driver.shards.push(shard);
            driver.threads.push(handle);
        }

        #[cfg(feature = "tracing")]
        debug!(
            driver = %driver.name,
            shards = driver.shards.len(),
            "timer driver started"
        );

        Ok(driver)
    }

    /// Driver with a single shard: every timer is serviced by one thread.
    pub fn single(name: impl Into<String>) -> FlowResult<Self> {
        Self::new(name, 1)
    }

    /// Driver with one shard per available core.
    pub fn parallel(name: impl Into<String>) -> FlowResult<Self> {
        let cores = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(name, cores)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Registrations currently queued across all shards, including stale ones
    /// that will be discarded when they come due.
    pub fn pending(&self) -> usize {
        self.shards.iter().map(|shard| shard.pending()).sum()
    }
}

impl TimerSource for TimerDriver {
    type Timer = DriverTimer;

    fn start(&self, deadline: Duration) -> DriverTimer {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.shards.len();
        DriverTimer {
            shard: Arc::clone(&self.shards[index]),
            entry: Arc::new(Entry::default()),
            expires_at: instant_after(deadline),
            registered: None,
            cancelled: false,
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        for shard in &self.shards {
            shard.state.lock().shutdown = true;
            shard.wakeup.notify_all();
        }
        let current = thread::current().id();
        for handle in self.threads.drain(..) {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        #[cfg(feature = "tracing")]
        debug!(driver = %self.name, "timer driver stopped");
    }
}

/// Timer started by a [`TimerDriver`].
pub struct DriverTimer {
    shard: Arc<Shard>,
    entry: Arc<Entry>,
    expires_at: Instant,
    registered: Option<Instant>,
    cancelled: bool,
}

impl DriverTimer {
    /// Instant at which the current deadline elapses
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl Timer for DriverTimer {
    fn reset(&mut self, deadline: Duration) {
        self.expires_at = instant_after(deadline);
        self.cancelled = false;
    }

    fn cancel(&mut self) {
        // Fresh entry: whatever the shard still holds points at a dead Weak
        self.entry = Arc::new(Entry::default());
        self.registered = None;
        self.cancelled = true;
    }

    fn is_expired(&self) -> bool {
        !self.cancelled && Instant::now() >= self.expires_at
    }

    fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.cancelled {
            return Poll::Pending;
        }
        if Instant::now() >= self.expires_at {
            return Poll::Ready(());
        }

        self.entry.waker.register(cx.waker());
        if self.entry.fired.swap(false, Ordering::AcqRel) {
            // Fired for an earlier expiry; the reset moved it since
            self.registered = None;
        }
        if self.registered.map_or(true, |at| at > self.expires_at) {
            #[cfg(feature = "tracing")]
            trace!(
                remaining_us = self
                    .expires_at
                    .saturating_duration_since(Instant::now())
                    .as_micros() as u64,
                "registering timer"
            );
            self.shard
                .schedule(self.expires_at, Arc::downgrade(&self.entry));
            self.registered = Some(self.expires_at);
        }
        Poll::Pending
    }
}
