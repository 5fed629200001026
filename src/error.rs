//! Construction and lifecycle errors.
//!
//! Queue hot paths never produce these: a full ring hands the value back in
//! `Err(value)` and an empty ring returns `None`.

use std::io;

use thiserror::Error;

/// A ring could not be built with the requested capacity.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// A capacity of zero was requested.
    #[error("capacity must be greater than zero")]
    Zero,

    /// The SPSC ring size must be a power of two.
    #[error("ring size {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// The SPSC ring keeps one slot empty, so a size below two holds nothing.
    #[error("ring size {0} leaves no usable slot")]
    TooSmall(usize),

    /// The capacity cannot be rounded up to a power of two in a `usize`.
    #[error("capacity {0} cannot be rounded up to a power of two")]
    Overflow(usize),
}

/// Errors reported by the worker pools.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The task queue could not be built.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),

    /// The pool is stopping; the task was dropped without running.
    #[error("pool has been shut down")]
    ShutDown,
}
