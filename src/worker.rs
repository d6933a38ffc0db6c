//! Execution contexts that sequences can be pinned to.
//!
//! A [`Worker`] accepts boxed jobs and drives them to completion. Two variants
//! exist:
//!
//! - [`SingleWorker`]: one named OS thread running a [`LocalPool`]. All jobs it
//!   accepts are polled on that thread, strictly one at a time, and interleave
//!   only at their await points.
//! - [`SharedPool`]: an ambient [`ThreadPool`], sized to the available cores by
//!   default. A job is polled by one pool thread at a time; different jobs run
//!   in parallel.
//!
//! Workers are long-lived: they are built once by the surrounding harness and
//! reused by every invocation that binds to them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use futures::channel::mpsc;
use futures::executor::{LocalPool, ThreadPool};
use futures::future::BoxFuture;
use futures::task::LocalSpawnExt;
use futures::StreamExt;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult};

/// Something that can drive jobs to completion.
pub trait Worker: Send + Sync {
    /// Stable name of this worker, used for its threads and in errors
    fn name(&self) -> &str;

    /// Queue `job` for execution.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WorkerUnavailable`] once the worker has shut down.
    fn submit(&self, job: BoxFuture<'static, ()>) -> FlowResult<()>;
}

type Job = BoxFuture<'static, ()>;

/// Dedicated single-threaded worker.
pub struct SingleWorker {
    name: String,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    submitted: AtomicUsize,
}

impl SingleWorker {
    /// Spawn the worker thread, named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WorkerUnavailable`] if the thread cannot be spawned.
    pub fn new(name: impl Into<String>) -> FlowResult<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_jobs(rx))
            .map_err(|_| FlowError::WorkerUnavailable {
                worker: name.clone(),
            })?;

        #[cfg(feature = "tracing")]
        debug!(worker = %name, "single worker started");

        Ok(Self {
            name,
            thread_id: handle.thread().id(),
            jobs: Mutex::new(Some(tx)),
            thread: Mutex::new(Some(handle)),
            submitted: AtomicUsize::new(0),
        })
    }

    /// Id of the worker's thread
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Jobs accepted so far
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Stop accepting jobs, let queued jobs finish, and join the thread.
    ///
    /// Idempotent. When called from the worker's own thread the join is skipped.
    pub fn shutdown(&self) {
        // Closing the queue ends the dispatch loop once it is drained
        self.jobs.lock().take();

        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                #[cfg(feature = "tracing")]
                warn!(worker = %self.name, "worker thread panicked");
            }

            #[cfg(feature = "tracing")]
            debug!(worker = %self.name, "single worker stopped");
        }
    }
}

fn run_jobs(mut jobs: mpsc::UnboundedReceiver<Job>) {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    pool.run_until(async move {
        while let Some(job) = jobs.next().await {
            if spawner.spawn_local(job).is_err() {
                break;
            }
        }
    });
    pool.run();
}

impl Worker for SingleWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, job: Job) -> FlowResult<()> {
        let jobs = self.jobs.lock();
        let sent = jobs
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(job).is_ok());
        if !sent {
            return Err(FlowError::WorkerUnavailable {
                worker: self.name.clone(),
            });
        }
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for SingleWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SingleWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleWorker")
            .field("name", &self.name)
            .field("submitted", &self.submitted())
            .finish()
    }
}

/// Ambient multi-threaded pool.
pub struct SharedPool {
    name: String,
    size: usize,
    pool: ThreadPool,
}

impl SharedPool {
    /// Pool of `size` threads (at least one) named `{name}-{n}`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::WorkerUnavailable`] if the pool threads cannot be spawned.
    pub fn new(name: impl Into<String>, size: usize) -> FlowResult<Self> {
        let name = name.into();
        let size = size.max(1);
        let pool = ThreadPool::builder()
            .pool_size(size)
            .name_prefix(format!("{}-", name))
            .create()
            .map_err(|_| FlowError::WorkerUnavailable {
                worker: name.clone(),
            })?;

        #[cfg(feature = "tracing")]
        debug!(worker = %name, size, "shared pool started");

        Ok(Self { name, size, pool })
    }

    /// Pool sized to the number of available cores.
    pub fn with_available_parallelism(name: impl Into<String>) -> FlowResult<Self> {
        let cores = thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(name, cores)
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Worker for SharedPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, job: Job) -> FlowResult<()> {
        self.pool.spawn_ok(job);
        Ok(())
    }
}

impl std::fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}
