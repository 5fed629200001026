//! A lock-free multi-producer multi-consumer bounded ring.
//!
//! Producers and consumers each claim a *ticket* with a single `fetch_add` on
//! their side's counter. The ticket, masked by `capacity - 1`, names the slot
//! to use, and the slot's sequence stamp tells whether that slot currently
//! belongs to the ticket's wrap. The stamp is what rules out ABA: slot `i` on
//! wrap `k` and on wrap `k + 1` carry different stamps even though the index
//! is the same.
//!
//! Both operations are fail-fast. A ticket whose slot is not ready at the
//! moment of observation is abandoned, not retried. An abandoned ticket leaves
//! its slot out of rotation for the rest of the queue's life: every later
//! ticket mapped to it fails too. Callers that need blocking behavior spin,
//! back off or park outside the queue.
//!
//! The worker pool drains its queue through a crate-private pair that claims a
//! ticket with a compare-and-swap only after the slot is seen ready, so a
//! miss leaves the counters untouched and no slot is ever stranded.

use crate::cache_pad::CachePad;
use crate::error::CapacityError;
use crate::slot::{self, Slot};
use crate::variant::sync::atomic::{AtomicUsize, Ordering};
use crate::variant::sync::Arc;

use std::fmt;

/// A lock-free multi-producer multi-consumer bounded queue.
///
/// Cloning the queue is cheap and yields another handle to the same ring;
/// the storage lives as long as the longest-lived handle.
pub struct Queue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Queue<T> {
    /// Creates a [`Queue`] holding at least `capacity` elements.
    ///
    /// The capacity is rounded up to the next power of two.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or can't be rounded up in a `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ringpool::mpmc::Queue;
    ///
    /// let queue = Queue::<usize>::new(6);
    /// assert_eq!(queue.capacity(), 8);
    /// ```
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(queue) => queue,
            Err(e) => panic!("invalid mpmc queue capacity: {e}"),
        }
    }

    /// Creates a [`Queue`] holding at least `capacity` elements, or reports why it can't.
    pub fn try_new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }
        let capacity = capacity
            .checked_next_power_of_two()
            .ok_or(CapacityError::Overflow(capacity))?;

        Ok(Self {
            inner: Arc::new(Inner::new(capacity)),
        })
    }

    /// Enqueues `value`, or hands it back in `Err` if its slot is not free.
    ///
    /// A failure consumes a ticket; see the [module documentation](crate::mpmc).
    ///
    /// # Examples
    ///
    /// ```
    /// use ringpool::mpmc::Queue;
    ///
    /// let queue = Queue::<u32>::new(2);
    ///
    /// assert_eq!(queue.try_enqueue(1), Ok(()));
    /// assert_eq!(queue.try_enqueue(2), Ok(()));
    /// assert_eq!(queue.try_enqueue(3), Err(3));
    /// ```
    pub fn try_enqueue(&self, value: T) -> Result<(), T> {
        self.inner.try_enqueue(value)
    }

    /// Dequeues the element behind the next consumer ticket, if it is published.
    ///
    /// A failure consumes a ticket; see the [module documentation](crate::mpmc).
    ///
    /// # Examples
    ///
    /// ```
    /// use ringpool::mpmc::Queue;
    ///
    /// let queue = Queue::<u32>::new(4);
    /// queue.try_enqueue(1).unwrap();
    ///
    /// assert_eq!(queue.try_dequeue(), Some(1));
    /// ```
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.try_dequeue()
    }

    /// Enqueues `value`, claiming a producer ticket only once its slot is seen free.
    ///
    /// Unlike [`try_enqueue`](Self::try_enqueue) a failure consumes nothing, so
    /// a queue used only through `push`/`pop` never strands a slot.
    pub(crate) fn push(&self, value: T) -> Result<(), T> {
        self.inner.push(value)
    }

    /// Dequeues the oldest element, claiming a consumer ticket only once its
    /// element is seen published.
    pub(crate) fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Returns the rounded-up, power-of-two capacity.
    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    /// Returns an approximate element count.
    ///
    /// The counters track claimed tickets, not finished operations, so the
    /// result can be off by the number of producers and consumers in flight.
    /// On a quiescent queue that never rejected an operation it is exact.
    pub fn maybe_size(&self) -> usize {
        self.inner.maybe_size()
    }

    /// Peeks at the slot the next consumer ticket maps to.
    ///
    /// Racy by nature: another consumer may claim that element, or a producer
    /// may publish one, right after the peek.
    pub fn empty_hint(&self) -> bool {
        self.inner.empty_hint()
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity())
            .field("maybe_size", &self.maybe_size())
            .finish()
    }
}

struct Inner<T> {
    /// Consumer ticket counter.
    head: CachePad<AtomicUsize>,

    /// Producer ticket counter.
    tail: CachePad<AtomicUsize>,

    slots: Box<[Slot<T>]>,
    mask: usize,
}

// A slot payload is only touched by the thread holding the ticket its stamp
// names, and stamps are handed over with release/acquire pairs.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Inner<T> {
    fn new(capacity: usize) -> Self {
        Self {
            head: CachePad::new(AtomicUsize::new(0)),
            tail: CachePad::new(AtomicUsize::new(0)),
            slots: (0..capacity).map(Slot::new).collect(),
            mask: capacity - 1,
        }
    }

    fn try_enqueue(&self, value: T) -> Result<(), T> {
        let ticket = self.tail.fetch_add(1, Ordering::AcqRel);
        let slot = &self.slots[ticket & self.mask];

        // Anything but `vacant(ticket)` means the slot still holds the element
        // of the previous wrap, or a producer of an earlier wrap hasn't
        // finished with it. Either way the ticket is dropped.
        if slot.sequence.load(Ordering::Acquire) != slot::vacant(ticket) {
            return Err(value);
        }

        unsafe { slot.write(value) };
        slot.sequence.store(slot::published(ticket), Ordering::Release);

        Ok(())
    }

    fn try_dequeue(&self) -> Option<T> {
        let ticket = self.head.fetch_add(1, Ordering::AcqRel);
        let slot = &self.slots[ticket & self.mask];

        if slot.sequence.load(Ordering::Acquire) != slot::published(ticket) {
            return None;
        }

        let value = unsafe { slot.take() };
        slot.sequence.store(
            slot::vacant(ticket.wrapping_add(self.slots.len())),
            Ordering::Release,
        );

        Some(value)
    }

    fn push(&self, value: T) -> Result<(), T> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[tail & self.mask];
            let stamp = slot.sequence.load(Ordering::Acquire);
            let lag = stamp.wrapping_sub(slot::vacant(tail)) as isize;

            if lag == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe { slot.write(value) };
                        slot.sequence.store(slot::published(tail), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => tail = current,
                }
            } else if lag < 0 {
                // The slot still holds the previous wrap's element: full.
                return Err(value);
            } else {
                // Another producer claimed this ticket first.
                tail = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    fn pop(&self) -> Option<T> {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[head & self.mask];
            let stamp = slot.sequence.load(Ordering::Acquire);
            let lag = stamp.wrapping_sub(slot::published(head)) as isize;

            if lag == 0 {
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { slot.take() };
                        slot.sequence.store(
                            slot::vacant(head.wrapping_add(self.slots.len())),
                            Ordering::Release,
                        );
                        return Some(value);
                    }
                    Err(current) => head = current,
                }
            } else if lag < 0 {
                // Not published yet: empty, or its producer is mid-write.
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
            }
        }
    }

    fn maybe_size(&self) -> usize {
        loop {
            let head = self.head.load(Ordering::Relaxed);
            let tail = self.tail.load(Ordering::Relaxed);

            // Retry if a consumer claimed a ticket while `tail` was sampled.
            if head == self.head.load(Ordering::Relaxed) {
                // Abandoned consumer tickets can carry `head` past `tail`.
                return tail.saturating_sub(head).min(self.slots.len());
            }
        }
    }

    fn empty_hint(&self) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let slot = &self.slots[head & self.mask];
        slot.sequence.load(Ordering::Acquire) != slot::published(head)
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Sweeping by stamp rather than by `head..tail` also reclaims elements
        // stranded behind an abandoned consumer ticket.
        for slot in self.slots.iter() {
            if slot::is_published(slot.sequence.load(Ordering::Relaxed)) {
                unsafe { slot.drop_in_place() };
            }
        }
    }
}
