//! Ring slot storage shared by the MPMC [`Queue`].
//!
//! A [`Slot`] is one physical cell of the ring: an uninitialized payload plus a
//! sequence stamp naming which ticket currently owns the cell. The same cell is
//! reused for tickets `t`, `t + capacity`, `t + 2 * capacity`, and so on.
//!
//! Stamps are kept in half-ticket units so the low bit doubles as an occupancy
//! flag:
//!
//! ```txt
//! vacant(t)    = 2t       -> free, waiting for the producer holding ticket t
//! published(t) = 2t + 1   -> holds the element written under ticket t
//! ```
//!
//! The lifecycle of the cell behind ticket `t` is therefore:
//!
//! ```txt
//! vacant(t) --enqueue(t)--> published(t) --dequeue(t)--> vacant(t + capacity)
//! ```
//!
//! A one-slot ring needs the scaling: unscaled, "published for t" and "free for
//! t + 1" would be the same number.
//!
//! [`Queue`]: crate::mpmc::Queue

use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::AtomicUsize;

use std::mem::MaybeUninit;
use std::ptr;

/// One physical cell of the ring.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    /// Stamp of the ticket that owns the cell, see [`vacant`] and [`published`].
    pub(crate) sequence: AtomicUsize,

    /// Live if and only if `sequence` is a [`published`] stamp.
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    /// Creates the cell at `index`, free for the first-lap ticket of the same value.
    pub(crate) fn new(index: usize) -> Self {
        Self {
            sequence: AtomicUsize::new(vacant(index)),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Moves `value` into the cell.
    ///
    /// # Safety
    ///
    /// The caller must hold the ticket whose [`vacant`] stamp it observed with
    /// an acquire load, and the cell must not be published yet.
    pub(crate) unsafe fn write(&self, value: T) {
        self.value
            .with_mut(|p| unsafe { p.write(MaybeUninit::new(value)) })
    }

    /// Moves the value out of the cell, leaving it logically uninitialized.
    ///
    /// # Safety
    ///
    /// The caller must hold the ticket whose [`published`] stamp it observed
    /// with an acquire load, and must republish the cell afterwards.
    pub(crate) unsafe fn take(&self) -> T {
        self.value.with(|p| unsafe { (*p).assume_init_read() })
    }

    /// Destroys the value in place.
    ///
    /// # Safety
    ///
    /// The cell must hold a live value and no other thread may access it.
    pub(crate) unsafe fn drop_in_place(&self) {
        self.value
            .with_mut(|p| unsafe { ptr::drop_in_place((*p).as_mut_ptr()) })
    }
}

/// Stamp of a cell waiting for the producer holding `ticket`.
#[inline]
pub(crate) const fn vacant(ticket: usize) -> usize {
    ticket << 1
}

/// Stamp of a cell holding the element written under `ticket`.
#[inline]
pub(crate) const fn published(ticket: usize) -> usize {
    (ticket << 1) | 1
}

/// Reports whether `stamp` marks a cell holding a live element.
#[inline]
pub(crate) const fn is_published(stamp: usize) -> bool {
    stamp & 1 == 1
}
