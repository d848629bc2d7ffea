//! Iteration over a `Dict`.
//!
//! `Dict::iter` is a plain borrowing iterator. `DictIterator` is a detached
//! cursor that only borrows the table while advancing, so the caller can
//! interleave other table operations:
//! - a safe cursor pauses opportunistic rehashing while it is alive, so
//!   adds, finds and deletes between steps are allowed;
//! - an unsafe cursor records a fingerprint of the table layout and panics
//!   on `release` if the table was structurally modified in between.
//!
//! Order: `ht[0]` buckets ascending, then `ht[1]` while rehashing; chains
//! head to tail.

use crate::dict::{Dict, Handle};
use crate::dict_type::{DictType, Value};
use crate::safe_iter::SafeIterGuard;
use slotmap::DefaultKey;

#[derive(Debug, Default)]
struct Cursor {
    table: usize,
    index: Option<usize>,
    entry: Option<DefaultKey>,
    next_entry: Option<DefaultKey>,
}

impl Cursor {
    fn advance<T: DictType>(&mut self, dict: &Dict<T>) -> Option<DefaultKey> {
        loop {
            let current = match self.entry {
                None => {
                    let mut gen = &dict.ht[self.table];
                    let mut idx = self.index.map_or(0, |i| i + 1);
                    if idx >= gen.size() {
                        if dict.is_rehashing() && self.table == 0 {
                            self.table = 1;
                            idx = 0;
                            gen = &dict.ht[1];
                        } else {
                            self.index = Some(idx);
                            return None;
                        }
                    }
                    self.index = Some(idx);
                    gen.buckets.get(idx).copied().flatten()
                }
                Some(_) => self.next_entry,
            };
            self.entry = current;
            if let Some(k) = current {
                match dict.entries.get(k) {
                    Some(e) => {
                        // Saved now so the caller may delete `k` before the
                        // next step.
                        self.next_entry = e.next;
                        return Some(k);
                    }
                    // Deleted under us; resume at the next bucket.
                    None => self.entry = None,
                }
            }
        }
    }
}

#[derive(Debug)]
enum Kind {
    Safe(SafeIterGuard),
    Unsafe { fingerprint: u64 },
}

/// Detached iteration cursor created by `Dict::safe_iter` or
/// `Dict::unsafe_iter`.
#[derive(Debug)]
pub struct DictIterator {
    cursor: Cursor,
    kind: Kind,
}

impl DictIterator {
    pub fn is_safe(&self) -> bool {
        matches!(self.kind, Kind::Safe(_))
    }

    /// Step to the next entry of `dict`, which must be the table this
    /// cursor was created from.
    pub fn next<T: DictType>(&mut self, dict: &Dict<T>) -> Option<Handle> {
        if let Kind::Safe(guard) = &self.kind {
            assert!(
                guard.belongs_to(&dict.safe_iterators),
                "safe iterator used with a different table"
            );
        }
        self.cursor.advance(dict).map(|k| dict.handle(k))
    }

    /// End the iteration.
    ///
    /// # Panics
    /// For an unsafe cursor, if `dict` was structurally modified since the
    /// cursor was created.
    pub fn release<T: DictType>(self, dict: &Dict<T>) {
        match self.kind {
            Kind::Safe(guard) => drop(guard),
            Kind::Unsafe { fingerprint } => assert_eq!(
                fingerprint,
                dict.fingerprint(),
                "table modified during unsafe iteration"
            ),
        }
    }
}

/// Borrowing iterator over `(Handle, &K, &Value<V>)`.
pub struct Iter<'a, T: DictType> {
    dict: &'a Dict<T>,
    cursor: Cursor,
}

impl<'a, T: DictType> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T::Key, &'a Value<T::Value>);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor.advance(self.dict)?;
        let e = &self.dict.entries[k];
        Some((self.dict.handle(k), &e.key, &e.value))
    }
}

impl<T: DictType> Dict<T> {
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            dict: self,
            cursor: Cursor::default(),
        }
    }

    /// Cursor that tolerates interleaved adds, finds and deletes. Rehashing
    /// is paused until it is released or dropped.
    pub fn safe_iter(&self) -> DictIterator {
        DictIterator {
            cursor: Cursor::default(),
            kind: Kind::Safe(self.safe_iterators.acquire()),
        }
    }

    /// Cursor that forbids any structural change to the table while alive.
    pub fn unsafe_iter(&self) -> DictIterator {
        DictIterator {
            cursor: Cursor::default(),
            kind: Kind::Unsafe {
                fingerprint: self.fingerprint(),
            },
        }
    }

    /// Mix of both generations' bucket-array addresses, sizes and counts.
    pub(crate) fn fingerprint(&self) -> u64 {
        let integers = [
            self.ht[0].identity() as u64,
            self.ht[0].size() as u64,
            self.ht[0].used as u64,
            self.ht[1].identity() as u64,
            self.ht[1].size() as u64,
            self.ht[1].used as u64,
        ];
        let mut hash: u64 = 0;
        for i in integers {
            hash = hash.wrapping_add(i);
            hash = (!hash).wrapping_add(hash << 21);
            hash ^= hash >> 24;
            hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
            hash ^= hash >> 14;
            hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
            hash ^= hash >> 28;
            hash = hash.wrapping_add(hash << 31);
        }
        hash
    }
}
