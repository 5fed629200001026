//! The unit of work the pools run, and the surface both pools share.

use crate::error::PoolError;

/// A type-erased, zero-argument callable run exactly once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// How a successfully submitted task was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The task was queued and a worker will run it.
    Queued,

    /// The queue was full and the task already ran on the submitting thread.
    CallerRan,
}

/// A pool accepting fire-and-forget tasks.
///
/// [`BoundedPool`](crate::pool::BoundedPool) and
/// [`ThreadPool`](crate::baseline::ThreadPool) both implement it, so a caller
/// or a benchmark can swap one for the other.
pub trait Executor {
    /// Hands `task` to the pool.
    fn submit<F>(&self, task: F) -> Result<Dispatch, PoolError>
    where
        F: FnOnce() + Send + 'static;

    /// Stops the pool and joins its workers.
    ///
    /// Returns `true` for the one call that performed the stop.
    fn shutdown(&self) -> bool;
}
