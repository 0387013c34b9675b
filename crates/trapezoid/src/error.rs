//! Error types for the worker pool and the parallel integrator.
//!
//! Every fallible operation in this crate returns [`Error`]. Validation
//! failures are reported before any job is scheduled, so an `Err` from an
//! integration pass never leaves work running behind the caller's back.
//!
//! ## Error Cases
//! - `InvalidConfig`: a count, capacity or driver setting is out of range.
//! - `InvalidBounds`: the integration interval is empty, reversed or not
//!   finite.
//! - `PoolShutdown`: a job was submitted after the pool started shutting
//!   down.
//! - `Spawn`: the operating system refused to start a worker thread.
//! - `EndpointFault`: sampling `f(a)` or `f(b)` panicked before any task
//!   was scheduled.
//! - `EvaluatorFault`: a partial-sum task panicked, so the pass was aborted.
//! - `ChannelError`: an internal result channel misbehaved.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for pool management and integration passes.
#[derive(Clone, thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A worker count, task count, resolution or driver setting was invalid.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The interval `[a, b]` cannot be integrated.
    #[error("Invalid bounds: expected finite a < b, got a = {a}, b = {b}")]
    InvalidBounds { a: f64, b: f64 },

    /// The pool no longer accepts jobs.
    #[error("Worker pool is shutting down")]
    PoolShutdown,

    /// A worker thread could not be spawned.
    ///
    /// Carries the rendered [`std::io::Error`] so the type stays `Clone`.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),

    /// The evaluator panicked while sampling the endpoint `x`.
    #[error("Evaluator fault at endpoint x = {x}; integration pass aborted")]
    EndpointFault { x: f64 },

    /// The task with the given index panicked before delivering its partial
    /// sum.
    #[error("Evaluator fault in task {task}; integration pass aborted")]
    EvaluatorFault { task: usize },

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },
}

impl Error {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Spawn(err.to_string())
    }
}
