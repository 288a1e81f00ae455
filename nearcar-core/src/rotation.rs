//! Rotating start offsets for spreading attempts across upstream replicas.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide request counter shared by every call of one client.
///
/// Only used to choose where a failover walk begins; interleaved increments
/// from concurrent calls are fine.
#[derive(Debug, Default)]
pub struct RequestCounter {
    next: AtomicU64,
}

impl RequestCounter {
    /// Create a counter starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Claim the next ticket and turn it into a walk over `len` addresses.
    ///
    /// Returns an empty walk when `len` is zero.
    pub fn rotation(&self, len: usize) -> Rotation {
        if len == 0 {
            return Rotation::new(0, 0);
        }
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        let len_u64 = u64::try_from(len).unwrap_or(u64::MAX);
        let start = usize::try_from(ticket % len_u64).unwrap_or_default();
        Rotation::new(start, len)
    }
}

/// Every index in `0..len` exactly once, starting at `start` and wrapping.
#[derive(Debug, Clone)]
pub struct Rotation {
    start: usize,
    len: usize,
    step: usize,
}

impl Rotation {
    /// Walk `len` indices beginning at `start`.
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Self {
            start,
            len,
            step: 0,
        }
    }

    /// Index the walk begins at.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }
}

impl Iterator for Rotation {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step >= self.len {
            return None;
        }
        let index = (self.start + self.step) % self.len;
        self.step += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.step;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rotation {}
