//! Keeps independently written atomics off each other's cache line.
//!
//! The producer side of a ring hammers `tail` while the consumer side hammers
//! `head`. If both counters sat on one line, every ticket claimed on one side
//! would invalidate the line the other side is spinning on
//! ([false sharing](https://en.wikipedia.org/wiki/False_sharing)).
//!
//! # Size and alignment
//!
//! - On x86_64 and aarch64 the alignment is 128 bytes. Intel prefetches line
//!   pairs and Apple silicon reports 128-byte lines.
//! - On all others it is 64 bytes.
//!
//! The size of `CachePad<T>` is the smallest multiple of that alignment large
//! enough to hold a `T`.

use std::fmt;
use std::ops::Deref;

/// Pads and aligns a value to the length of a cache line.
#[cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64"), repr(align(128)))]
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    repr(align(64))
)]
pub(crate) struct CachePad<T>(T);

impl<T> CachePad<T> {
    pub(crate) fn new(t: T) -> CachePad<T> {
        CachePad(t)
    }
}

impl<T> Deref for CachePad<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePad<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::CachePad;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn padded_counters_do_not_share_a_line() {
        let pair = [
            CachePad::new(AtomicUsize::new(0)),
            CachePad::new(AtomicUsize::new(0)),
        ];
        let align = align_of::<CachePad<AtomicUsize>>();
        assert!(align >= 64);

        let a: *const AtomicUsize = &*pair[0];
        let b: *const AtomicUsize = &*pair[1];
        assert!(b as usize - a as usize >= align);
    }
}
