//! Resize policy and incremental migration between generations.
//!
//! A resize allocates `ht[1]` and sets the rehash cursor; entries then move
//! bucket by bucket, one step per table operation plus whatever a periodic
//! `rehash_for` call gets through. When `ht[0]` is drained, `ht[1]` becomes
//! the new primary generation.

use crate::config::{FORCE_RESIZE_RATIO, INITIAL_SIZE, MIN_FILL_PERCENT, REHASH_BATCH};
use crate::dict::Dict;
use crate::dict_type::DictType;
use crate::error::DictError;
use crate::generation::{next_power, Generation};
use log::{debug, trace};
use std::time::{Duration, Instant};

impl<T: DictType> Dict<T> {
    /// Grow or shrink to the smallest power of two holding `size` buckets.
    ///
    /// An unallocated table gets its first generation directly; otherwise a
    /// rehash towards the new capacity starts.
    pub fn expand(&mut self, size: usize) -> Result<(), DictError> {
        let used = self.ht[0].used;
        if self.is_rehashing() {
            return Err(DictError::Rehashing);
        }
        if used > size {
            return Err(DictError::InvalidSize {
                requested: size,
                used,
            });
        }
        let Some(real_size) = next_power(size) else {
            return Err(DictError::InvalidSize {
                requested: size,
                used,
            });
        };
        if real_size == self.ht[0].size() {
            return Err(DictError::InvalidSize {
                requested: size,
                used,
            });
        }
        let gen = Generation::with_size(real_size);
        if self.ht[0].size() == 0 {
            self.ht[0] = gen;
            return Ok(());
        }
        debug!(
            "rehash started: {} -> {} buckets, {} entries",
            self.ht[0].size(),
            real_size,
            used
        );
        self.ht[1] = gen;
        self.rehash_idx = Some(0);
        self.chain_ceiling = 1;
        Ok(())
    }

    /// Shrink to the smallest capacity that holds every live entry.
    pub fn resize(&mut self) -> Result<(), DictError> {
        if !self.resize.is_enabled() {
            return Err(DictError::ResizeDisabled);
        }
        if self.is_rehashing() {
            return Err(DictError::Rehashing);
        }
        self.expand(self.ht[0].used.max(INITIAL_SIZE))
    }

    /// Fill has dropped below `MIN_FILL_PERCENT` of a non-minimal table.
    pub fn needs_shrink(&self) -> bool {
        let size = self.slots();
        size > INITIAL_SIZE && self.len() * 100 / size < MIN_FILL_PERCENT
    }

    /// Start a shrink if the table is sparse enough and resizing is allowed.
    /// Returns whether a shrink was started.
    pub fn shrink_if_needed(&mut self) -> bool {
        self.needs_shrink() && self.resize().is_ok()
    }

    pub(crate) fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        let size = self.ht[0].size();
        let used = self.ht[0].used;
        // The first generation is allocated by the insert itself.
        if size == 0 || used < size {
            return;
        }
        let enabled = self.resize.is_enabled();
        if enabled || used / size >= FORCE_RESIZE_RATIO {
            if !enabled {
                debug!("forcing expansion with resizing disabled: {used} entries in {size} buckets");
            }
            let _ = self.expand(used.saturating_mul(2));
        }
    }

    /// One opportunistic step, skipped while safe iterators are outstanding.
    pub(crate) fn rehash_step(&mut self) {
        if self.safe_iterators.count() == 0 {
            self.rehash(1);
        }
    }

    /// Migrate up to `n` non-empty buckets, visiting at most `10 * n` empty
    /// ones. Returns `true` while entries remain to be moved.
    pub fn rehash(&mut self, n: usize) -> bool {
        let Some(mut idx) = self.rehash_idx else {
            return false;
        };
        let mut empty_visits = n.saturating_mul(10);
        let mut n = n;
        while n > 0 && self.ht[0].used != 0 {
            n -= 1;
            // used != 0, so a non-empty bucket exists at or after idx.
            while self.ht[0].buckets[idx].is_none() {
                idx += 1;
                empty_visits -= 1;
                if empty_visits == 0 {
                    self.rehash_idx = Some(idx);
                    return true;
                }
            }
            let mut cur = self.ht[0].buckets[idx].take();
            while let Some(k) = cur {
                let e = &mut self.entries[k];
                cur = e.next;
                let dst = self.ht[1].index_of(e.hash);
                e.next = self.ht[1].buckets[dst];
                self.ht[1].buckets[dst] = Some(k);
                self.ht[0].used -= 1;
                self.ht[1].used += 1;
            }
            idx += 1;
        }

        if self.ht[0].used == 0 {
            self.ht[0] = core::mem::replace(&mut self.ht[1], Generation::empty());
            self.rehash_idx = None;
            self.chain_ceiling = 1;
            debug!(
                "rehash finished: {} buckets, {} entries",
                self.ht[0].size(),
                self.ht[0].used
            );
            return false;
        }
        self.rehash_idx = Some(idx);
        true
    }

    /// Rehash in batches of `REHASH_BATCH` buckets until done or `budget`
    /// has elapsed. Returns the number of buckets scheduled; does nothing
    /// while a safe iterator is outstanding.
    pub fn rehash_for(&mut self, budget: Duration) -> usize {
        if self.safe_iterators.count() > 0 {
            return 0;
        }
        let start = Instant::now();
        let mut rehashes = 0;
        while self.rehash(REHASH_BATCH) {
            rehashes += REHASH_BATCH;
            if start.elapsed() >= budget {
                break;
            }
        }
        trace!("rehash_for: {rehashes} buckets in {:?}", start.elapsed());
        rehashes
    }
}
