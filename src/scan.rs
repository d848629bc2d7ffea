//! Cursor-based full scan that tolerates resizes between calls.
//!
//! The cursor counts through bucket indices with the bits reversed: the
//! high bits of the index are incremented first. Because capacities only
//! change by powers of two, every bucket of a smaller table maps onto a
//! contiguous run of cursor values in a larger one and vice versa, so
//! buckets already visited are never skipped when the table is resized
//! between calls. Entries may be reported more than once.
//!
//! While rehashing, the smaller generation's bucket is visited together
//! with every bucket of the larger generation that it expands to.

use crate::dict::{Dict, Handle};
use crate::dict_type::{DictType, Value};
use crate::generation::Generation;

/// Reverse-binary increment of the bits selected by `mask`.
#[inline]
fn next_cursor(v: u64, mask: u64) -> u64 {
    (v | !mask).reverse_bits().wrapping_add(1).reverse_bits()
}

impl<T: DictType> Dict<T> {
    /// Visit every entry of the bucket(s) at `cursor` and return the cursor
    /// for the next call. Start with 0; a returned 0 means the scan is done.
    ///
    /// Every entry present for the whole scan is visited at least once.
    pub fn scan<F>(&self, cursor: u64, mut visit: F) -> u64
    where
        F: FnMut(Handle, &T::Key, &Value<T::Value>),
    {
        if self.is_empty() {
            return 0;
        }
        let mut v = cursor;
        if !self.is_rehashing() {
            let t0 = &self.ht[0];
            let m0 = t0.size_mask as u64;
            self.visit_bucket(t0, (v & m0) as usize, &mut visit);
            return next_cursor(v, m0);
        }

        let (t0, t1) = if self.ht[0].size() <= self.ht[1].size() {
            (&self.ht[0], &self.ht[1])
        } else {
            (&self.ht[1], &self.ht[0])
        };
        let m0 = t0.size_mask as u64;
        let m1 = t1.size_mask as u64;
        self.visit_bucket(t0, (v & m0) as usize, &mut visit);
        // The larger table's buckets that share the low bits of v.
        loop {
            self.visit_bucket(t1, (v & m1) as usize, &mut visit);
            v = next_cursor(v, m1);
            if v & (m0 ^ m1) == 0 {
                break;
            }
        }
        v
    }

    fn visit_bucket<F>(&self, gen: &Generation, idx: usize, visit: &mut F)
    where
        F: FnMut(Handle, &T::Key, &Value<T::Value>),
    {
        let mut cur = gen.buckets[idx];
        while let Some(k) = cur {
            let e = &self.entries[k];
            cur = e.next;
            visit(self.handle(k), &e.key, &e.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::next_cursor;
    use crate::dict::test_types::*;
    use crate::dict::Dict;
    use std::collections::HashSet;

    #[test]
    fn cursor_counts_in_reverse_binary() {
        // 8 buckets: 0, 4, 2, 6, 1, 5, 3, 7, then wrap to 0.
        let mut v = 0;
        let mut order = Vec::new();
        loop {
            order.push(v);
            v = next_cursor(v, 7);
            if v == 0 {
                break;
            }
        }
        assert_eq!(order, vec![0, 4, 2, 6, 1, 5, 3, 7]);
    }

    fn scan_all(d: &Dict<StrKeys>) -> (HashSet<String>, usize) {
        let mut seen = HashSet::new();
        let mut visits = 0;
        let mut cursor = 0;
        loop {
            cursor = d.scan(cursor, |_, k, _| {
                seen.insert(k.clone());
                visits += 1;
            });
            if cursor == 0 {
                break;
            }
        }
        (seen, visits)
    }

    #[test]
    fn empty_table_scan_ends_immediately() {
        let d: Dict<StrKeys> = Dict::new(str_keys());
        assert_eq!(d.scan(0, |_, _, _| panic!("nothing to visit")), 0);
    }

    /// Invariant: a stable table is covered exactly once.
    #[test]
    fn full_scan_of_stable_table() {
        let mut d = Dict::new(str_keys());
        for i in 0..500 {
            d.add(format!("k{i}"), i).unwrap();
        }
        while d.rehash(100) {}
        let (seen, visits) = scan_all(&d);
        assert_eq!(seen.len(), 500);
        assert_eq!(visits, 500);
    }

    /// Invariant: a scan run entirely during a rehash covers both
    /// generations.
    #[test]
    fn full_scan_while_rehashing() {
        let mut d = Dict::new(str_keys());
        for i in 0..300 {
            d.add(format!("k{i}"), i).unwrap();
        }
        while d.rehash(100) {}
        d.expand(4096).unwrap();
        d.rehash(20);
        assert!(d.is_rehashing());
        let (seen, _) = scan_all(&d);
        assert_eq!(seen.len(), 300);
    }
}
