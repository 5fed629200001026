#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    rust_2018_idioms
)]

//! Bounded lock-free ring queues and a worker pool built on them.
//!
//! - [`spsc`]: a single-producer single-consumer ring, ordered purely through
//!   its head and tail indices.
//! - [`mpmc`]: a multi-producer multi-consumer ring where each side claims
//!   tickets with one `fetch_add` and a per-slot sequence stamp arbitrates
//!   readiness.
//! - [`pool`]: a fixed set of workers draining the MPMC ring, woken by a
//!   counting semaphore, running overflow on the caller.
//! - [`baseline`]: the mutex/condvar queue and pool they are measured against.
//!
//! Every queue operation is fail-fast: `try_*` calls return at once, handing a
//! rejected value back in `Err` and reporting an empty ring as `None`.
//!
//! # Examples
//!
//! Single Producer - Single Consumer:
//!
//! ```
//! use ringpool::spsc;
//! use std::thread;
//!
//! const COUNT: usize = 1_000;
//! let (mut tx, mut rx) = spsc::bounded::<usize>(64);
//!
//! let producer = thread::spawn(move || {
//!     for i in 0..COUNT {
//!         let mut item = i;
//!         while let Err(back) = tx.try_push(item) {
//!             item = back;
//!             thread::yield_now();
//!         }
//!     }
//! });
//!
//! for i in 0..COUNT {
//!     let n = loop {
//!         if let Some(x) = rx.try_pop() {
//!             break x;
//!         }
//!         thread::yield_now();
//!     };
//!     assert_eq!(i, n);
//! }
//!
//! producer.join().unwrap();
//! assert!(rx.try_pop().is_none());
//! ```
//!
//! Multi Producer - Multi Consumer:
//!
//! ```
//! use ringpool::mpmc::Queue;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! const COUNT: usize = 1_000;
//! const CONCURRENCY: usize = 4;
//!
//! let queue: Queue<usize> = Queue::new(COUNT * CONCURRENCY);
//! let items = Arc::new((0..COUNT).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>());
//!
//! let producers: Vec<_> = (0..CONCURRENCY)
//!     .map(|_| {
//!         let q = queue.clone();
//!         thread::spawn(move || {
//!             for i in 0..COUNT {
//!                 q.try_enqueue(i).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for th in producers {
//!     th.join().unwrap();
//! }
//!
//! let consumers: Vec<_> = (0..CONCURRENCY)
//!     .map(|_| {
//!         let q = queue.clone();
//!         let its = items.clone();
//!         thread::spawn(move || {
//!             while let Some(n) = q.try_dequeue() {
//!                 its[n].fetch_add(1, Ordering::SeqCst);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for th in consumers {
//!     th.join().unwrap();
//! }
//!
//! for c in &*items {
//!     assert_eq!(c.load(Ordering::SeqCst), CONCURRENCY);
//! }
//! ```
//!
//! Worker pool:
//!
//! ```
//! use ringpool::pool::BoundedPool;
//! use std::sync::mpsc;
//!
//! let pool = BoundedPool::new(4, 256).unwrap();
//! let (done_tx, done_rx) = mpsc::channel();
//!
//! for i in 0..100 {
//!     let done_tx = done_tx.clone();
//!     pool.submit(move || done_tx.send(i).unwrap()).unwrap();
//! }
//!
//! let mut seen: Vec<i32> = done_rx.iter().take(100).collect();
//! seen.sort();
//! assert_eq!(seen, (0..100).collect::<Vec<_>>());
//! ```

pub mod baseline;
pub mod error;
pub mod mpmc;
pub mod pool;
pub mod spsc;
pub mod task;

pub(crate) mod cache_pad;
pub(crate) mod semaphore;
pub(crate) mod slot;
pub(crate) mod variant;

pub use error::{CapacityError, PoolError};
pub use mpmc::Queue;
pub use pool::BoundedPool;
pub use task::{Dispatch, Executor, Task};
