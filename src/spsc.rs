//! A lock-free single-producer single-consumer bounded ring.
//!
//! The ring keeps one slot empty so that "full" and "empty" can be told apart
//! with two indices alone: empty is `head == tail`, full is
//! `next(tail) == head`. A ring of `size` slots therefore stores `size - 1`
//! elements.
//!
//! # Ordering
//!
//! ```txt
//! producer: write slot, Release-store tail  ->  consumer: Acquire-load tail, read slot
//! consumer: read slot,  Release-store head  ->  producer: Acquire-load head, reuse slot
//! ```
//!
//! Each index has a single writer, so a side reads its own index with a
//! relaxed load.
//!
//! The single-producer single-consumer discipline is enforced by the types:
//! [`Producer`] and [`Consumer`] are `Send` but not `Clone`, and their
//! mutating operations take `&mut self`.

use crate::cache_pad::CachePad;
use crate::error::CapacityError;
use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::{AtomicUsize, Ordering};
use crate::variant::sync::Arc;

use std::fmt;
use std::mem::{self, MaybeUninit};

/// Creates a ring of `size` slots and returns its two ends.
///
/// The usable capacity is `size - 1`.
///
/// # Panics
///
/// Panics if `size` is not a power of two or is smaller than two.
///
/// # Examples
///
/// ```
/// let (mut tx, mut rx) = ringpool::spsc::bounded::<u32>(4);
///
/// assert!(tx.try_push(1).is_ok());
/// assert!(tx.try_push(2).is_ok());
/// assert!(tx.try_push(3).is_ok());
/// assert_eq!(tx.try_push(4), Err(4));
///
/// assert_eq!(rx.try_pop(), Some(1));
/// ```
pub fn bounded<T>(size: usize) -> (Producer<T>, Consumer<T>) {
    match try_bounded(size) {
        Ok(ends) => ends,
        Err(e) => panic!("invalid spsc ring size: {e}"),
    }
}

/// Creates a ring of `size` slots, rejecting sizes the index masking can't serve.
///
/// # Examples
///
/// ```
/// use ringpool::error::CapacityError;
///
/// assert!(ringpool::spsc::try_bounded::<u8>(8).is_ok());
/// assert_eq!(
///     ringpool::spsc::try_bounded::<u8>(6).unwrap_err(),
///     CapacityError::NotPowerOfTwo(6)
/// );
/// ```
pub fn try_bounded<T>(size: usize) -> Result<(Producer<T>, Consumer<T>), CapacityError> {
    if size == 0 {
        return Err(CapacityError::Zero);
    }
    if !size.is_power_of_two() {
        return Err(CapacityError::NotPowerOfTwo(size));
    }
    if size < 2 {
        return Err(CapacityError::TooSmall(size));
    }

    let ring = Arc::new(Ring::new(size));
    Ok((
        Producer {
            ring: ring.clone(),
        },
        Consumer { ring },
    ))
}

/// The pushing end of an SPSC ring.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Pushes `value` into the ring, or hands it back in `Err` if the ring is full.
    ///
    /// # Examples
    ///
    /// ```
    /// let (mut tx, _rx) = ringpool::spsc::bounded::<&str>(2);
    ///
    /// assert_eq!(tx.try_push("a"), Ok(()));
    /// assert_eq!(tx.try_push("b"), Err("b"));
    /// ```
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        self.ring.try_push(value)
    }

    /// Reports whether the ring held no element at the moment of observation.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns how many elements the ring can hold, one less than its size.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns an advisory element count; the consumer may move concurrently.
    pub fn maybe_size(&self) -> usize {
        self.ring.maybe_size()
    }
}

/// The popping end of an SPSC ring.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Pops the oldest element, or returns `None` if the ring is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// let (mut tx, mut rx) = ringpool::spsc::bounded::<u8>(4);
    ///
    /// tx.try_push(7).unwrap();
    /// assert_eq!(rx.try_pop(), Some(7));
    /// assert_eq!(rx.try_pop(), None);
    /// ```
    pub fn try_pop(&mut self) -> Option<T> {
        self.ring.try_pop()
    }

    /// Reports whether the ring held no element at the moment of observation.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns how many elements the ring can hold, one less than its size.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns an advisory element count; the producer may move concurrently.
    pub fn maybe_size(&self) -> usize {
        self.ring.maybe_size()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("maybe_size", &self.maybe_size())
            .finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("maybe_size", &self.maybe_size())
            .finish()
    }
}

struct Ring<T> {
    /// Next slot the consumer reads. Written by the consumer only.
    head: CachePad<AtomicUsize>,

    /// Next slot the producer writes. Written by the producer only.
    tail: CachePad<AtomicUsize>,

    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,

    /// `size - 1`; indices are kept in `0..size`.
    mask: usize,
}

// Slots in `[head, tail)` are touched by the consumer only, the rest by the
// producer only; the head/tail release/acquire pairs hand each slot over.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn new(size: usize) -> Self {
        Self {
            head: CachePad::new(AtomicUsize::new(0)),
            tail: CachePad::new(AtomicUsize::new(0)),
            buffer: (0..size)
                .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
                .collect(),
            mask: size - 1,
        }
    }

    #[inline]
    fn next(&self, index: usize) -> usize {
        (index + 1) & self.mask
    }

    fn try_push(&self, value: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = self.next(tail);

        if next == self.head.load(Ordering::Acquire) {
            return Err(value);
        }

        // The acquire load of `head` above proves the consumer is done with
        // this slot, and the consumer won't look at it until `tail` moves.
        self.buffer[tail].with_mut(|p| unsafe { p.write(MaybeUninit::new(value)) });
        self.tail.store(next, Ordering::Release);

        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        // The acquire load of `tail` above makes the producer's write visible.
        let value = self.buffer[head].with(|p| unsafe { (*p).assume_init_read() });
        self.head.store(self.next(head), Ordering::Release);

        Some(value)
    }

    fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    fn capacity(&self) -> usize {
        self.mask
    }

    fn maybe_size(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        tail.wrapping_sub(head) & self.mask
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        if !mem::needs_drop::<T>() {
            return;
        }

        // Both ends are gone, so plain loads see the final indices.
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        while head != tail {
            self.buffer[head].with_mut(|p| unsafe { (*p).assume_init_drop() });
            head = self.next(head);
        }
    }
}
