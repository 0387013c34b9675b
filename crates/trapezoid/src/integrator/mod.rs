//! Composite trapezoidal rule, reduced in parallel on a [`WorkerPool`].
//!
//! A pass over `n` intervals of width `h = (b - a) / n` computes
//!
//! ```text
//! h * (0.5 * (f(a) + f(b)) + Σ f(a + i*h))    for i in 1..=n-1
//! ```
//!
//! which is the textbook `h/2 * (f(a) + f(b) + 2 Σ f(x_i))` with the factor
//! of two moved from the interior onto the endpoints. The endpoints are
//! sampled on the calling thread; the interior is split by [`partition`] and
//! each range becomes one job on the pool. A pass never uses more than
//! `max(1, n - 1)` tasks, so a huge task count cannot blow up the result
//! buffers.
//!
//! ## Collection
//!
//! Every job owns an immutable task descriptor (range, `a`, `h`, evaluator
//! handle) and a clone of a [`WaitGroup`]. Its partial sum goes into a
//! bounded channel with one slot per task. The caller waits on the group,
//! which releases only after every task has either sent its value or
//! unwound, then drains the channel. A missing slot means a task panicked
//! and the whole pass fails with [`Error::EvaluatorFault`]; partial answers
//! are never returned.
//!
//! Partials are combined in task order, so a fixed `(n, num_tasks)` gives
//! the same bits on every run regardless of scheduling.

mod task;

use crate::{
    error::{Error, Result},
    evaluator::Evaluator,
    partition::partition,
    pool::WorkerPool,
};
use crossbeam_utils::sync::WaitGroup;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use task::{PartialSum, PartialSumTask};

/// Tasks created per worker by [`integrate`], so a slow range does not leave
/// the other workers idle.
pub const TASKS_PER_WORKER: usize = 4;

/// A function bound to an integration interval `[a, b]`.
///
/// One `Trapezoid` can run any number of passes, at any resolution, on any
/// pool.
///
/// # Example
/// ```
/// use trapezoid::{Polynomial, Trapezoid, WorkerPool};
///
/// let pool = WorkerPool::new(4).unwrap();
/// let trapezoid = Trapezoid::new(Polynomial::reference(), 2.0, 20.0).unwrap();
///
/// let area = trapezoid.integrate(&pool, 10_000, 16).unwrap();
/// assert!((area - 5931.0).abs() < 1e-3);
/// pool.wait().unwrap();
/// ```
#[derive(Debug)]
pub struct Trapezoid<E> {
    evaluator: Arc<E>,
    a: f64,
    b: f64,
}

impl<E> Clone for Trapezoid<E> {
    fn clone(&self) -> Self {
        Self {
            evaluator: Arc::clone(&self.evaluator),
            a: self.a,
            b: self.b,
        }
    }
}

impl<E> Trapezoid<E>
where
    E: Evaluator + 'static,
{
    /// Binds `evaluator` to `[a, b]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] unless both bounds are finite and
    /// `a < b`.
    pub fn new(evaluator: E, a: f64, b: f64) -> Result<Self> {
        Self::from_arc(Arc::new(evaluator), a, b)
    }

    /// Like [`Trapezoid::new`] for an evaluator that is already shared.
    pub fn from_arc(evaluator: Arc<E>, a: f64, b: f64) -> Result<Self> {
        if !(a.is_finite() && b.is_finite() && a < b) {
            return Err(Error::InvalidBounds { a, b });
        }
        Ok(Self { evaluator, a, b })
    }

    pub const fn bounds(&self) -> (f64, f64) {
        (self.a, self.b)
    }

    /// Width of one interval at resolution `n`.
    pub fn step(&self, n: usize) -> f64 {
        (self.b - self.a) / n as f64
    }

    /// Runs one pass with `n` intervals split into `num_tasks` jobs on
    /// `pool`, blocking until every job has reported.
    ///
    /// `num_tasks` is capped at `max(1, n - 1)`, one task per interior
    /// point. The pool is borrowed, not consumed, and stays usable for
    /// further passes. Must not be called from a job running on the same
    /// pool.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `n` or `num_tasks` is zero. Nothing is
    ///   scheduled in that case.
    /// - [`Error::PoolShutdown`] if the pool stops accepting jobs mid-pass.
    ///   Jobs already queued are waited for before returning.
    /// - [`Error::EndpointFault`] if sampling `f(a)` or `f(b)` panicked.
    ///   Nothing is scheduled in that case.
    /// - [`Error::EvaluatorFault`] if any task panicked.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, pool)))]
    pub fn integrate(&self, pool: &WorkerPool, n: usize, num_tasks: usize) -> Result<f64> {
        let ranges = partition(n, num_tasks.min(n.saturating_sub(1).max(1)))?;
        let num_tasks = ranges.num_tasks();
        let h = self.step(n);
        let endpoints = 0.5 * (self.sample_endpoint(self.a)? + self.sample_endpoint(self.b)?);

        let (results_tx, results_rx) = crossbeam_channel::bounded::<PartialSum>(num_tasks);
        let done = WaitGroup::new();

        #[cfg(feature = "tracing")]
        tracing::trace!("Dispatching {} tasks, block size {}", num_tasks, ranges.block_size());

        for (task, range) in ranges.enumerate() {
            let job = PartialSumTask {
                task,
                range,
                a: self.a,
                h,
                evaluator: Arc::clone(&self.evaluator),
                results: results_tx.clone(),
                done: done.clone(),
            };
            if let Err(e) = pool.submit(move || job.run()) {
                #[cfg(feature = "tracing")]
                tracing::warn!("Aborting pass after {} of {} tasks: {}", task, num_tasks, e);
                drop(results_tx);
                done.wait();
                return Err(e);
            }
        }
        drop(results_tx);

        #[cfg(feature = "tracing")]
        tracing::trace!("Collecting {} partial sums", num_tasks);
        done.wait();

        let mut partials = vec![None; num_tasks];
        for PartialSum { task, value } in results_rx.try_iter() {
            partials[task] = Some(value);
        }
        let interior = combine(&partials)?;

        #[cfg(feature = "tracing")]
        tracing::trace!("Pass done");

        Ok(h * (endpoints + interior))
    }

    fn sample_endpoint(&self, x: f64) -> Result<f64> {
        catch_unwind(AssertUnwindSafe(|| self.evaluator.evaluate(x))).map_err(|_| {
            #[cfg(feature = "tracing")]
            tracing::error!("Evaluator panicked at endpoint x = {}", x);
            Error::EndpointFault { x }
        })
    }
}

/// Sums partials in task order, failing on the first task that never
/// reported.
fn combine(partials: &[Option<f64>]) -> Result<f64> {
    partials
        .iter()
        .enumerate()
        .try_fold(0.0, |acc, (task, partial)| match partial {
            Some(value) => Ok(acc + value),
            None => {
                #[cfg(feature = "tracing")]
                tracing::error!("Task {} did not deliver a partial sum", task);
                Err(Error::EvaluatorFault { task })
            }
        })
}

/// Integrates `evaluate` over `[a, b]` with `n` intervals on a fresh pool of
/// `concurrency` workers.
///
/// Uses `concurrency * TASKS_PER_WORKER` tasks and shuts the pool down before
/// returning. Prefer [`Trapezoid::integrate`] with a long-lived pool when
/// running many passes.
///
/// # Errors
///
/// - [`Error::InvalidBounds`] unless `a < b` and both are finite.
/// - [`Error::InvalidConfig`] if `n` or `concurrency` is zero.
/// - [`Error::EndpointFault`] or [`Error::EvaluatorFault`] if `evaluate`
///   panicked.
///
/// # Example
/// ```
/// let area = trapezoid::integrate(|x: f64| 2.0 * x * x + 3.0 * x + 0.5, 2.0, 20.0, 10_000, 4)
///     .unwrap();
/// assert!((area - 5931.0).abs() < 1e-3);
/// ```
pub fn integrate<E>(evaluate: E, a: f64, b: f64, n: usize, concurrency: usize) -> Result<f64>
where
    E: Evaluator + 'static,
{
    let trapezoid = Trapezoid::new(evaluate, a, b)?;
    if n == 0 {
        return Err(Error::invalid_config("n must be greater than 0"));
    }
    if concurrency == 0 {
        return Err(Error::invalid_config("concurrency must be greater than 0"));
    }
    let num_tasks = concurrency
        .checked_mul(TASKS_PER_WORKER)
        .ok_or_else(|| Error::invalid_config("overflow in task count"))?;

    let pool = WorkerPool::new(concurrency)?;
    let area = trapezoid.integrate(&pool, n, num_tasks);
    pool.wait()?;
    area
}
