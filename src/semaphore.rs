//! An unbounded counting semaphore built from atomics and thread parking.
//!
//! The pool has a fixed set of workers, so every thread that can ever wait is
//! registered up front as a [`Waiter`]. Waking one worker means finding a
//! waiter that announced itself parked and unparking it.
//!
//! Lost wakeups are ruled out by a store/load pairing on both sides, all
//! `SeqCst`:
//!
//! ```txt
//! acquire: parked := true;  load permits  -> park if none
//! release: permits += 1;    load parked   -> unpark if set
//! ```
//!
//! Whichever side goes second in the total order sees the other's store.

use crate::cache_pad::CachePad;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::sync::{Parker, Unparker};
use crossbeam_utils::Backoff;

pub(crate) struct Semaphore {
    permits: CachePad<AtomicUsize>,
    waiters: Box<[Waiter]>,
}

struct Waiter {
    parked: CachePad<AtomicBool>,
    unparker: Unparker,
}

impl Semaphore {
    /// Creates a semaphore with no permits and `waiters` registered waiters.
    ///
    /// Returns the parker of each waiter, to be moved into its thread.
    pub(crate) fn with_waiters(waiters: usize) -> (Self, Vec<Parker>) {
        let parkers: Vec<Parker> = (0..waiters).map(|_| Parker::new()).collect();
        let waiters = parkers
            .iter()
            .map(|p| Waiter {
                parked: CachePad::new(AtomicBool::new(false)),
                unparker: p.unparker().clone(),
            })
            .collect();

        (
            Self {
                permits: CachePad::new(AtomicUsize::new(0)),
                waiters,
            },
            parkers,
        )
    }

    /// Takes a permit if one is available.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut current = self.permits.load(Ordering::SeqCst);
        while current > 0 {
            match self.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Blocks waiter `id` until it takes a permit.
    pub(crate) fn acquire(&self, id: usize, parker: &Parker) {
        let waiter = &self.waiters[id];

        loop {
            let backoff = Backoff::new();
            while !backoff.is_completed() {
                if self.try_acquire() {
                    return;
                }
                backoff.snooze();
            }

            waiter.parked.store(true, Ordering::SeqCst);
            if self.try_acquire() {
                // A releaser may already have cleared the flag and left an
                // unpark token; the next park returns at once, which is fine.
                waiter.parked.store(false, Ordering::SeqCst);
                return;
            }
            parker.park();
        }
    }

    /// Adds one permit and wakes one parked waiter, if any.
    pub(crate) fn release(&self) {
        let _ = self.permits.fetch_add(1, Ordering::SeqCst);

        for waiter in self.waiters.iter() {
            if waiter.parked.swap(false, Ordering::SeqCst) {
                waiter.unparker.unpark();
                return;
            }
        }
    }

    /// Adds `n` permits and wakes every waiter.
    pub(crate) fn close(&self, n: usize) {
        let _ = self.permits.fetch_add(n, Ordering::SeqCst);

        for waiter in self.waiters.iter() {
            waiter.parked.store(false, Ordering::SeqCst);
            waiter.unparker.unpark();
        }
    }

    #[cfg(test)]
    pub(crate) fn available_permits(&self) -> usize {
        self.permits.load(Ordering::SeqCst)
    }
}
