//! A bounded worker pool draining an MPMC [`Queue`].
//!
//! Every successful enqueue releases one semaphore permit, and a worker runs
//! one task per permit:
//!
//! ```txt
//! WAIT_PERMIT --stop set--> exit
//!      |
//!      +--> DRAIN_ONE --> RUN --> WAIT_PERMIT
//! ```
//!
//! When the queue rejects a task the submitting thread runs it inline
//! (caller-runs). Queue memory stays bounded; the price is that a saturated
//! caller is blocked for the length of the task.
//!
//! Shutdown is a hard stop: workers exit on their next wakeup and whatever is
//! still queued is dropped without running.

use crate::cache_pad::CachePad;
use crate::error::PoolError;
use crate::mpmc::Queue;
use crate::semaphore::Semaphore;
use crate::task::{Dispatch, Executor, Task};

use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_utils::sync::Parker;
use crossbeam_utils::Backoff;
use tracing::{debug, trace, warn};

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_THREAD_NAME: &str = "ringpool-worker";

/// Configures and spawns a [`BoundedPool`].
///
/// # Examples
///
/// ```
/// use ringpool::pool::Builder;
///
/// let pool = Builder::new()
///     .workers(2)
///     .queue_capacity(64)
///     .thread_name("ingest")
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.worker_count(), 2);
/// assert_eq!(pool.queue_capacity(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    workers: usize,
    queue_capacity: usize,
    thread_name: String,
    stack_size: Option<usize>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }
}

impl Builder {
    /// Starts from one worker per available core and a 1024-slot queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads. Zero is allowed: every task then
    /// either waits in the queue forever or runs on its caller.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the queue capacity, rounded up to a power of two.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the worker thread name prefix; workers are named `{prefix}-{index}`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Sets the stack size of each worker thread.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Builds the queue and spawns the workers.
    ///
    /// If a worker fails to spawn, the ones already running are stopped and
    /// joined before the error is returned.
    pub fn build(self) -> Result<BoundedPool, PoolError> {
        let queue = Queue::try_new(self.queue_capacity)?;
        let (semaphore, parkers) = Semaphore::with_waiters(self.workers);

        let shared = Arc::new(Shared {
            queue,
            semaphore,
            stop: CachePad::new(AtomicBool::new(false)),
            running: AtomicUsize::new(self.workers),
        });

        let mut handles = Vec::with_capacity(self.workers);
        for (id, parker) in parkers.into_iter().enumerate() {
            let mut builder = thread::Builder::new().name(format!("{}-{}", self.thread_name, id));
            if let Some(bytes) = self.stack_size {
                builder = builder.stack_size(bytes);
            }

            let worker = shared.clone();
            match builder.spawn(move || run_worker(id, parker, worker)) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    let _ = shared
                        .running
                        .fetch_sub(self.workers - id, Ordering::SeqCst);
                    shared.stop.store(true, Ordering::Release);
                    shared.semaphore.close(id);
                    join_workers(handles);
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        debug!(
            workers = self.workers,
            capacity = shared.queue.capacity(),
            "bounded pool started"
        );

        Ok(BoundedPool {
            shared,
            handles: Handles::new(handles),
            worker_count: self.workers,
        })
    }
}

/// A fixed set of workers draining a bounded lock-free queue, with a
/// caller-runs overflow policy.
///
/// # Examples
///
/// ```
/// use ringpool::pool::BoundedPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let pool = BoundedPool::new(2, 16).unwrap();
/// let done = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..8 {
///     let done = done.clone();
///     pool.submit(move || {
///         done.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
/// }
///
/// while done.load(Ordering::SeqCst) < 8 {
///     std::thread::yield_now();
/// }
/// assert!(pool.shutdown());
/// ```
pub struct BoundedPool {
    shared: Arc<Shared>,
    /// Taken by the caller that wins the stop transition.
    handles: Handles,
    worker_count: usize,
}

struct Shared {
    queue: Queue<Task>,
    semaphore: Semaphore,
    stop: CachePad<AtomicBool>,
    running: AtomicUsize,
}

impl BoundedPool {
    /// Spawns `workers` threads over a queue of at least `queue_capacity` tasks.
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self, PoolError> {
        Builder::new()
            .workers(workers)
            .queue_capacity(queue_capacity)
            .build()
    }

    /// Returns a [`Builder`] for finer configuration.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Submits `task` to the pool.
    ///
    /// Returns [`Dispatch::Queued`] when a worker will run the task, or
    /// [`Dispatch::CallerRan`] when the queue was full and the task already
    /// ran on this thread. Once the pool is stopping, the task is dropped and
    /// [`PoolError::ShutDown`] is returned.
    ///
    /// A task that itself submits while the queue stays full recurses on the
    /// caller's stack with no depth limit. Size the queue so that sustained
    /// saturation is not the steady state, or keep nested submissions out of
    /// tasks.
    pub fn submit<F>(&self, task: F) -> Result<Dispatch, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }

        let task: Task = Box::new(task);
        match self.shared.queue.push(task) {
            Ok(()) => {
                self.shared.semaphore.release();
                Ok(Dispatch::Queued)
            }
            Err(task) => {
                trace!("task queue full, running task on the caller");
                task();
                Ok(Dispatch::CallerRan)
            }
        }
    }

    /// Stops the pool, wakes every worker and joins them.
    ///
    /// Only the first call does the work and returns `true`; later or
    /// concurrent calls return `false` at once. Tasks still queued are dropped.
    pub fn shutdown(&self) -> bool {
        if self
            .shared
            .stop
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // One permit per worker guarantees each of them wakes at least once.
        self.shared.semaphore.close(self.worker_count);
        join_workers(self.handles.take());

        debug!(workers = self.worker_count, "bounded pool shut down");
        true
    }

    /// Reports whether the stop transition has happened.
    pub fn is_shutdown(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    /// Returns the number of workers the pool was built with.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns the number of worker threads that have not exited yet.
    pub fn running_workers(&self) -> usize {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Returns the power-of-two capacity of the task queue.
    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// Returns an approximate number of queued tasks.
    pub fn maybe_queued(&self) -> usize {
        self.shared.queue.maybe_size()
    }
}

impl Executor for BoundedPool {
    fn submit<F>(&self, task: F) -> Result<Dispatch, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        BoundedPool::submit(self, task)
    }

    fn shutdown(&self) -> bool {
        BoundedPool::shutdown(self)
    }
}

impl Drop for BoundedPool {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl fmt::Debug for BoundedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedPool")
            .field("workers", &self.worker_count)
            .field("queue", &self.shared.queue)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl Shared {
    /// Dequeues the task a permit was released for.
    ///
    /// The permit proves some task is published, but the slot at `head` may
    /// belong to a submitter that claimed its ticket earlier and is still
    /// writing. A failed `pop` claims nothing, so spin until that write lands
    /// or the pool stops.
    fn next_task(&self) -> Option<Task> {
        let backoff = Backoff::new();
        loop {
            if let Some(task) = self.queue.pop() {
                return Some(task);
            }
            if self.stop.load(Ordering::Relaxed) {
                return None;
            }
            backoff.snooze();
        }
    }
}

fn run_worker(id: usize, parker: Parker, shared: Arc<Shared>) {
    let _running = Running(&shared.running);
    trace!(worker = id, "worker started");

    loop {
        shared.semaphore.acquire(id, &parker);
        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        let Some(task) = shared.next_task() else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            warn!(worker = id, "task panicked");
        }
    }

    trace!(worker = id, "worker exiting");
}

/// Decrements the running-worker count when a worker exits.
struct Running<'a>(&'a AtomicUsize);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Worker join handles, handed out at most once without locking.
struct Handles(AtomicPtr<Vec<JoinHandle<()>>>);

impl Handles {
    fn new(handles: Vec<JoinHandle<()>>) -> Self {
        Self(AtomicPtr::new(Box::into_raw(Box::new(handles))))
    }

    /// Returns the handles on the first call and an empty list afterwards.
    fn take(&self) -> Vec<JoinHandle<()>> {
        let handles = self.0.swap(ptr::null_mut(), Ordering::AcqRel);
        if handles.is_null() {
            return Vec::new();
        }
        // The swap left a null pointer behind, so this is the only owner.
        *unsafe { Box::from_raw(handles) }
    }
}

impl Drop for Handles {
    fn drop(&mut self) {
        drop(self.take());
    }
}

fn join_workers(handles: Vec<JoinHandle<()>>) {
    let current = thread::current().id();
    for handle in handles {
        // A task dropping the last pool handle ends up here on a worker.
        if handle.thread().id() == current {
            continue;
        }
        if handle.join().is_err() {
            warn!("worker thread panicked");
        }
    }
}
