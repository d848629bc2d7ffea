//! One bucket array of a table.

use crate::config::INITIAL_SIZE;
use slotmap::DefaultKey;

/// A power-of-two array of collision-chain heads plus its live entry count.
///
/// Chains themselves live in the table's entry arena; a bucket only holds
/// the key of the first entry.
#[derive(Debug)]
pub(crate) struct Generation {
    pub(crate) buckets: Box<[Option<DefaultKey>]>,
    pub(crate) size_mask: usize,
    pub(crate) used: usize,
}

impl Generation {
    pub(crate) fn empty() -> Self {
        Self {
            buckets: Box::new([]),
            size_mask: 0,
            used: 0,
        }
    }

    pub(crate) fn with_size(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            buckets: vec![None; size].into_boxed_slice(),
            size_mask: size - 1,
            used: 0,
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn index_of(&self, hash: u64) -> usize {
        (hash as usize) & self.size_mask
    }

    /// Address of the bucket array; changes whenever the array is replaced.
    pub(crate) fn identity(&self) -> usize {
        self.buckets.as_ptr() as usize
    }
}

/// Smallest power of two that is at least `size`, never below `INITIAL_SIZE`.
/// `None` if that power does not fit in a `usize`.
pub(crate) fn next_power(size: usize) -> Option<usize> {
    size.max(INITIAL_SIZE).checked_next_power_of_two()
}
