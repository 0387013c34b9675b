//! Composite trapezoidal integration, reduced in parallel over a bounded,
//! fixed-size worker pool.
//!
//! - [`WorkerPool`]: long-lived threads consuming one bounded FIFO queue,
//!   with backpressure on submit and a drain-and-join shutdown.
//! - [`partition`]: deterministic split of the interior sample indices into
//!   contiguous [`WorkRange`]s.
//! - [`Trapezoid`] / [`integrate`]: one integration pass, one job per range,
//!   partial sums collected through a channel and combined in task order.
//! - [`Convergence`]: repeated passes at growing resolution until successive
//!   estimates agree.
//!
//! ```
//! use trapezoid::{Convergence, Polynomial, Trapezoid, WorkerPool};
//!
//! let pool = WorkerPool::new(4)?;
//! let trapezoid = Trapezoid::new(Polynomial::reference(), 2.0, 20.0)?;
//! let report = Convergence::default().run(&trapezoid, &pool)?;
//! pool.wait()?;
//!
//! assert!(report.converged);
//! assert!((report.estimate() - 5931.0).abs() < 1e-3);
//! # Ok::<(), trapezoid::Error>(())
//! ```

mod convergence;
mod error;
mod evaluator;
mod integrator;
mod partition;
mod pool;

pub use crate::convergence::*;
pub use crate::error::*;
pub use crate::evaluator::*;
pub use crate::integrator::*;
pub use crate::partition::*;
pub use crate::pool::*;
