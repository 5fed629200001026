//! Lock-based counterparts of the ring queue and the bounded pool.
//!
//! [`BlockingQueue`] is an unbounded FIFO behind a mutex and a condition
//! variable; [`ThreadPool`] is a plain worker pool over it. They are the
//! yardstick the lock-free types are measured against, and share the
//! [`Executor`] surface with [`BoundedPool`](crate::pool::BoundedPool).
//!
//! Unlike the bounded pool, shutting a [`ThreadPool`] down is graceful: the
//! workers finish everything already queued before they exit.

use crate::error::PoolError;
use crate::task::{Dispatch, Executor, Task};

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// An unbounded blocking FIFO queue.
///
/// # Examples
///
/// ```
/// use ringpool::baseline::BlockingQueue;
///
/// let queue = BlockingQueue::new();
/// queue.push(1).unwrap();
///
/// assert_eq!(queue.wait_and_pop(), Some(1));
/// assert_eq!(queue.pop(), None);
///
/// queue.shutdown();
/// assert_eq!(queue.wait_and_pop(), None);
/// ```
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> BlockingQueue<T> {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends `value` and wakes one waiter. Hands the value back once the
    /// queue is shut down.
    pub fn push(&self, value: T) -> Result<(), T> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(value);
            }
            state.items.push_back(value);
        }
        let _ = self.available.notify_one();
        Ok(())
    }

    /// Pops the oldest element without waiting.
    pub fn pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Pops the oldest element, waiting for one if the queue is empty.
    ///
    /// Returns `None` only once the queue is shut down and drained.
    pub fn wait_and_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                return Some(value);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Closes the queue and wakes every waiter.
    pub fn shutdown(&self) {
        self.state.lock().closed = true;
        let _ = self.available.notify_all();
    }

    /// Reports whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of queued elements.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Reports whether the queue holds no element.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// An unbounded worker pool over a [`BlockingQueue`].
pub struct ThreadPool {
    queue: Arc<BlockingQueue<Task>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl ThreadPool {
    /// Spawns `workers` threads.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        let queue = Arc::new(BlockingQueue::<Task>::new());
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let worker = queue.clone();
            let spawned = thread::Builder::new()
                .name(format!("baseline-worker-{id}"))
                .spawn(move || {
                    while let Some(task) = worker.wait_and_pop() {
                        task();
                    }
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    queue.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        debug!(workers, "baseline pool started");
        Ok(Self {
            queue,
            handles: Mutex::new(handles),
            worker_count: workers,
        })
    }

    /// Queues `task`; it always goes through the queue.
    pub fn submit<F>(&self, task: F) -> Result<Dispatch, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        match self.queue.push(task) {
            Ok(()) => Ok(Dispatch::Queued),
            Err(_) => Err(PoolError::ShutDown),
        }
    }

    /// Closes the queue, lets the workers drain it, and joins them.
    ///
    /// Returns `true` for the call that closed the queue.
    pub fn shutdown(&self) -> bool {
        let handles = {
            let mut handles = self.handles.lock();
            if self.queue.is_shutdown() {
                return false;
            }
            self.queue.shutdown();
            mem::take(&mut *handles)
        };

        for handle in handles {
            if handle.join().is_err() {
                warn!("baseline worker panicked");
            }
        }
        debug!(workers = self.worker_count, "baseline pool shut down");
        true
    }

    /// Returns the number of workers the pool was built with.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl Executor for ThreadPool {
    fn submit<F>(&self, task: F) -> Result<Dispatch, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        ThreadPool::submit(self, task)
    }

    fn shutdown(&self) -> bool {
        ThreadPool::shutdown(self)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.worker_count)
            .field("queue", &self.queue)
            .finish()
    }
}
