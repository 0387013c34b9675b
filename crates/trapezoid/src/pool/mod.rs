//! Fixed-size thread pool fed by a bounded job queue.
//!
//! This module defines the [`WorkerPool`] struct, which starts a fixed set of
//! OS threads at construction and keeps them alive until shutdown. All
//! workers consume from one shared, bounded, FIFO, multi-producer
//! multi-consumer queue:
//!
//! - Any idle worker picks up the next queued job; there is no per-worker
//!   routing.
//! - [`WorkerPool::submit`] blocks while the queue is full, which paces
//!   producers to the speed of the workers.
//! - [`WorkerPool::wait`] closes the queue, lets the workers drain what is
//!   left and joins every thread.
//!
//! Jobs run exactly once, on exactly one worker, with no ordering guarantee
//! relative to each other. A panicking job is caught on its worker and
//! counted in [`PoolStats::panicked`]; it neither kills the thread nor blocks
//! shutdown.

mod worker;

use crate::error::{Error, Result};
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use worker::{Counters, worker_loop};

/// A unit of work queued on the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue slots allotted per worker when no explicit capacity is configured.
pub const DEFAULT_QUEUE_SLOTS_PER_WORKER: usize = 10;

/// A point-in-time snapshot of the pool's job counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs accepted by [`WorkerPool::submit`].
    pub submitted: usize,
    /// Jobs that ran to completion.
    pub completed: usize,
    /// Jobs that panicked while running.
    pub panicked: usize,
}

impl PoolStats {
    /// Jobs accepted but not yet finished, either queued or running.
    pub const fn pending(&self) -> usize {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.panicked)
    }
}

/// A fixed set of worker threads consuming one shared bounded queue.
///
/// The worker count and queue capacity are fixed for the lifetime of the
/// pool. Dropping the pool performs the same graceful shutdown as
/// [`WorkerPool::wait`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use trapezoid::WorkerPool;
///
/// let pool = WorkerPool::new(4).unwrap();
/// let done = Arc::new(AtomicUsize::new(0));
/// for _ in 0..100 {
///     let done = done.clone();
///     pool.submit(move || {
///         done.fetch_add(1, Ordering::Relaxed);
///     })
///     .unwrap();
/// }
/// pool.wait().unwrap();
/// assert_eq!(done.load(Ordering::Relaxed), 100);
/// ```
pub struct WorkerPool {
    sender: RwLock<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    counters: Arc<Counters>,
    workers: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    /// Starts `workers` threads with a queue of
    /// `workers * DEFAULT_QUEUE_SLOTS_PER_WORKER` slots.
    ///
    /// Returns as soon as the threads are spawned; they immediately block
    /// waiting for work.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `workers` is zero.
    /// - [`Error::Spawn`] if a thread could not be started.
    pub fn new(workers: usize) -> Result<Self> {
        Self::builder().workers(workers).build()
    }

    /// Returns a builder with one worker per logical CPU.
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    /// Number of worker threads.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Maximum number of jobs that can sit in the queue before
    /// [`WorkerPool::submit`] blocks.
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Enqueues a job, blocking while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolShutdown`] if [`WorkerPool::wait`] has already been
    ///   called. The job is dropped without running.
    /// - [`Error::ChannelError`] if every worker is gone, which only happens
    ///   if the pool's threads were torn down abnormally.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutdown() {
            return Err(Error::PoolShutdown);
        }

        // Clone the handle so a full queue never blocks shutdown behind the
        // read lock. A clone still in flight keeps the queue open, so its
        // job is drained before `wait` returns.
        let Some(sender) = self.sender.read().clone() else {
            return Err(Error::PoolShutdown);
        };

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        sender.send(Box::new(job)).map_err(|_| {
            self.counters.submitted.fetch_sub(1, Ordering::Relaxed);
            Error::ChannelError {
                context: "job queue has no live workers".to_string(),
            }
        })
    }

    /// Closes the queue and blocks until every worker has drained it and
    /// exited.
    ///
    /// Every job accepted by [`WorkerPool::submit`] has finished (or
    /// panicked) once this returns. Calling it again, from any thread,
    /// blocks until the first call is done and then returns `Ok(())`.
    ///
    /// Must not be called from inside a job running on this pool: the
    /// calling worker would wait for itself.
    pub fn wait(&self) -> Result<()> {
        let mut handles = self.handles.lock();

        if !self.shutdown.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Closing job queue for {} workers", self.workers);
        }
        drop(self.sender.write().take());

        for (_i, handle) in handles.drain(..).enumerate() {
            if let Err(_e) = handle.join() {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {} exited abnormally: {:?}", _i, _e);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker pool shutdown complete: {:?}", self.stats());
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.wait();
    }
}

impl core::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("shutdown", &self.is_shutdown())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Configures and spawns a [`WorkerPool`].
#[derive(Clone, Debug)]
pub struct WorkerPoolBuilder {
    workers: usize,
    queue_capacity: Option<usize>,
    thread_name: String,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_capacity: None,
            thread_name: String::from("trapezoid-worker"),
        }
    }
}

impl WorkerPoolBuilder {
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the queue capacity. Defaults to
    /// `workers * DEFAULT_QUEUE_SLOTS_PER_WORKER`.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets the thread name prefix; workers are named `{prefix}-{index}`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Spawns the workers.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if the worker count or queue capacity is
    ///   zero, or the default capacity overflows.
    /// - [`Error::Spawn`] if a thread could not be started. Workers spawned
    ///   before the failure are shut down and joined first.
    pub fn build(self) -> Result<WorkerPool> {
        if self.workers == 0 {
            return Err(Error::invalid_config("workers must be greater than 0"));
        }
        let queue_capacity = match self.queue_capacity {
            Some(0) => {
                return Err(Error::invalid_config(
                    "queue capacity must be greater than 0",
                ));
            }
            Some(capacity) => capacity,
            None => self
                .workers
                .checked_mul(DEFAULT_QUEUE_SLOTS_PER_WORKER)
                .ok_or_else(|| Error::invalid_config("overflow in queue capacity"))?,
        };

        let (tx, rx) = crossbeam_channel::bounded::<Job>(queue_capacity);
        let counters = Arc::new(Counters::default());
        let mut handles = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let rx = rx.clone();
            let counters = Arc::clone(&counters);
            let spawned = thread::Builder::new()
                .name(format!("{}-{worker_id}", self.thread_name))
                .spawn(move || worker_loop(worker_id, rx, &counters));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Failed to spawn worker {}: {}", worker_id, e);
                    drop(tx);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(e.into());
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Started {} workers with queue capacity {}",
            self.workers,
            queue_capacity
        );

        Ok(WorkerPool {
            sender: RwLock::new(Some(tx)),
            handles: Mutex::new(handles),
            shutdown: AtomicBool::new(false),
            counters,
            workers: self.workers,
            queue_capacity,
        })
    }
}
