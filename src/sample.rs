//! Random sampling of keys without a full scan.

use crate::config::{SAMPLE_EMPTY_RUN, SAMPLE_REJECT_LIMIT};
use crate::dict::{Dict, Handle};
use crate::dict_type::DictType;
use rand::Rng;

impl<T: DictType> Dict<T> {
    /// Draw a bucket uniformly from the live part of the table. While
    /// rehashing, `ht[0]` buckets below the cursor are already drained and
    /// are excluded from the range.
    fn random_bucket(&mut self) -> (usize, usize) {
        match self.rehash_idx {
            Some(cursor) => {
                let s0 = self.ht[0].size();
                let h = self.rng.random_range(cursor..s0 + self.ht[1].size());
                if h >= s0 {
                    (1, h - s0)
                } else {
                    (0, h)
                }
            }
            None => (0, self.rng.random_range(0..self.ht[0].size())),
        }
    }

    /// Pick one entry uniformly at random. `None` only for an empty table.
    ///
    /// A bucket is drawn uniformly, an entry of its chain is picked by
    /// reservoir counting, and the pick is kept with probability
    /// `chain_len / chain_ceiling`, where the ceiling is the longest chain
    /// met so far. Every entry is then equally likely whatever the chain
    /// lengths, and in both generations while rehashing. Meeting a longer
    /// chain raises the ceiling and redraws.
    ///
    /// The ceiling is reset when a resize starts or when the chain holding
    /// it loses an entry. After `SAMPLE_REJECT_LIMIT` rejections it drops to
    /// the longest chain met by this call, so it follows the current longest
    /// chain rather than a past peak.
    pub fn random_key(&mut self) -> Option<Handle> {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let mut rejected = 0;
        let mut longest = 1;
        loop {
            let (table, bucket) = self.random_bucket();
            let mut len = 0usize;
            let mut pick = None;
            let mut cur = self.ht[table].buckets[bucket];
            while let Some(k) = cur {
                len += 1;
                if self.rng.random_range(0..len) == 0 {
                    pick = Some(k);
                }
                cur = self.entries[k].next;
            }
            let Some(k) = pick else {
                continue;
            };
            if len > self.chain_ceiling {
                self.chain_ceiling = len;
                continue;
            }
            if len == self.chain_ceiling || self.rng.random_range(0..self.chain_ceiling) < len {
                return Some(self.handle(k));
            }
            longest = longest.max(len);
            rejected += 1;
            if rejected >= SAMPLE_REJECT_LIMIT {
                self.chain_ceiling = longest;
                rejected = 0;
            }
        }
    }

    /// Collect roughly `count` entries from consecutive buckets starting at a
    /// random position. Faster than repeated `random_key` but biased towards
    /// neighbours. Whole buckets are taken, so the result may hold fewer
    /// (step ceiling hit) or more (last bucket overshoots) than `count`, and
    /// a bucket revisited after a random restart contributes duplicates.
    pub fn some_keys(&mut self, count: usize) -> Vec<Handle> {
        let count = count.min(self.len());
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return out;
        }
        for _ in 0..count {
            if !self.is_rehashing() {
                break;
            }
            self.rehash_step();
        }

        let tables = if self.is_rehashing() { 2 } else { 1 };
        let mut max_mask = self.ht[0].size_mask;
        if tables > 1 {
            max_mask = max_mask.max(self.ht[1].size_mask);
        }
        let cursor = self.rehash_idx.unwrap_or(0);
        let mut i = self.rng.random_range(0..=max_mask);
        let mut empty_run = 0;
        let mut steps = count.saturating_mul(10);
        while out.len() < count && steps > 0 {
            steps -= 1;
            for table in 0..tables {
                // ht[0] is drained below the cursor while rehashing.
                if tables == 2 && table == 0 && i < cursor {
                    if i >= self.ht[1].size() {
                        i = cursor;
                    } else {
                        continue;
                    }
                }
                let gen = &self.ht[table];
                if i >= gen.size() {
                    continue;
                }
                match gen.buckets[i] {
                    None => {
                        empty_run += 1;
                        if empty_run >= SAMPLE_EMPTY_RUN {
                            i = self.rng.random_range(0..=max_mask);
                            empty_run = 0;
                        }
                    }
                    Some(head) => {
                        empty_run = 0;
                        let mut cur = Some(head);
                        while let Some(k) = cur {
                            out.push(self.handle(k));
                            cur = self.entries[k].next;
                        }
                        if out.len() >= count {
                            return out;
                        }
                    }
                }
            }
            i = (i + 1) & max_mask;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DictConfig;
    use crate::dict::test_types::*;
    use crate::dict::Dict;
    use crate::dict_type::DictType;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    /// The key is its own hash, so tests choose buckets directly.
    struct Placed;

    impl DictType for Placed {
        type Key = u64;
        type Value = ();

        fn hash(&self, key: &u64) -> u64 {
            *key
        }
    }

    fn placed(keys: &[u64], size: usize, seed: u64) -> Dict<Placed> {
        let mut d = Dict::with_config(Rc::new(Placed), DictConfig::default().with_rng_seed(seed));
        for &k in keys {
            d.add(k, ()).unwrap();
        }
        while d.rehash(100) {}
        if d.table_size(0) != size {
            d.expand(size).unwrap();
            while d.rehash(100) {}
        }
        assert_eq!(d.table_size(0), size);
        d
    }

    fn seeded(n: i64, seed: u64) -> Dict<StrKeys> {
        let mut d = Dict::with_config(str_keys(), DictConfig::default().with_rng_seed(seed));
        for i in 0..n {
            d.add(format!("k{i}"), i).unwrap();
        }
        d
    }

    #[test]
    fn random_key_on_empty_table() {
        let mut d = seeded(0, 1);
        assert!(d.random_key().is_none());
        assert!(d.some_keys(5).is_empty());
    }

    /// Invariant: every key is reachable, also while rehashing.
    #[test]
    fn random_key_reaches_every_key() {
        let mut d = seeded(64, 2);
        let mut hits: HashMap<String, usize> = HashMap::new();
        for _ in 0..20_000 {
            let h = d.random_key().unwrap();
            *hits.entry(h.key(&d).unwrap().clone()).or_default() += 1;
        }
        assert_eq!(hits.len(), 64);
        d.assert_consistent();
    }

    /// Invariant: under a constant hash every key shares one chain and the
    /// reservoir pick is still uniform.
    #[test]
    fn random_key_within_single_chain() {
        let mut d = Dict::with_config(
            std::rc::Rc::new(Colliding),
            DictConfig::default().with_rng_seed(3),
        );
        for i in 0..4 {
            d.add(format!("c{i}"), i).unwrap();
        }
        while d.rehash(1) {}
        let mut hits = [0usize; 4];
        for _ in 0..8000 {
            let h = d.random_key().unwrap();
            hits[*h.value(&d).unwrap().as_owned().unwrap() as usize] += 1;
        }
        for h in hits {
            assert!((1700..2300).contains(&h), "skewed: {hits:?}");
        }
    }

    /// Invariant: the chain-length ceiling follows the longest live chain;
    /// deleting a collision burst brings it back down.
    #[test]
    fn ceiling_drops_after_long_chain_is_deleted() {
        let colliders: Vec<u64> = (1..=30).map(|j| 5 + 4096 * j).collect();
        let keys: Vec<u64> = (0..100).chain(colliders.iter().copied()).collect();
        let mut d = placed(&keys, 256, 9);
        for _ in 0..200_000 {
            d.random_key();
            if d.chain_ceiling == 31 {
                break;
            }
        }
        assert_eq!(d.chain_ceiling, 31);

        for k in &colliders {
            assert!(d.delete(k));
        }
        while d.rehash(100) {}
        assert_eq!(d.chain_ceiling, 1);
        for _ in 0..20_000 {
            let h = d.random_key().unwrap();
            assert!(*h.key(&d).unwrap() < 100);
        }
        assert_eq!(d.chain_ceiling, 1);
        d.assert_consistent();
    }

    /// Invariant: a ceiling far above every live chain decays within one
    /// call instead of rejecting forever.
    #[test]
    fn stale_ceiling_decays_after_rejections() {
        let keys: Vec<u64> = (0..50).collect();
        let mut d = placed(&keys, 64, 10);
        d.chain_ceiling = 1 << 30;
        assert!(d.random_key().is_some());
        assert_eq!(d.chain_ceiling, 1);
    }

    /// Invariant: starting a resize resets the ceiling.
    #[test]
    fn resize_resets_ceiling() {
        let mut d = seeded(100, 11);
        while d.rehash(100) {}
        d.chain_ceiling = 7;
        d.expand(1024).unwrap();
        assert_eq!(d.chain_ceiling, 1);
    }

    /// Invariant: some_keys gives up after `10 * count` bucket visits. One
    /// key in 65536 buckets is almost never reached in ten visits.
    #[test]
    fn some_keys_stops_at_step_ceiling() {
        let mut d = placed(&[123], 1 << 16, 12);
        let mut hits = 0;
        for _ in 0..200 {
            let picked = d.some_keys(1);
            assert!(picked.len() <= 1);
            hits += picked.len();
        }
        assert!(hits <= 3, "walk ran past the step ceiling: {hits} hits");
    }

    /// Invariant: after five empty buckets in a row the walk jumps to a
    /// random bucket. With keys in buckets 0 and 10, a contiguous walk
    /// returns [0, 10] for about 15% of starts; with the jump it is rare.
    #[test]
    fn some_keys_jumps_after_empty_run() {
        let mut d = placed(&[0, 10], 64, 13);
        let draws = 4000;
        let mut in_order = 0;
        for _ in 0..draws {
            let picked = d.some_keys(2);
            let keys: Vec<u64> = picked.iter().map(|h| *h.key(&d).unwrap()).collect();
            if keys.starts_with(&[0, 10]) {
                in_order += 1;
            }
        }
        assert!(
            (in_order as f64) < 0.07 * draws as f64,
            "walk crossed the empty run {in_order} times"
        );
    }

    /// Invariant: whole buckets are taken, so a single chain comes back
    /// complete once reached.
    #[test]
    fn some_keys_takes_whole_chain() {
        let mut d = Dict::with_config(Rc::new(Colliding), DictConfig::default().with_rng_seed(14));
        for i in 0..12 {
            d.add(format!("c{i}"), i).unwrap();
        }
        while d.rehash(100) {}
        let picked = d.some_keys(3);
        assert!(picked.is_empty() || picked.len() == 12);
    }

    /// Invariant: some_keys returns live entries and never walks more than
    /// the step ceiling allows.
    #[test]
    fn some_keys_returns_live_entries() {
        let mut d = seeded(1000, 4);
        let picked = d.some_keys(20);
        assert!(!picked.is_empty());
        assert!(picked.len() <= d.len());
        for h in &picked {
            assert!(h.key(&d).is_some());
        }

        let all = d.some_keys(5000);
        let distinct: HashSet<_> = all.iter().copied().collect();
        assert!(distinct.len() <= 1000);
        assert!(distinct.iter().all(|h| h.value(&d).is_some()));
    }

    /// Invariant: some_keys walks both generations while rehashing.
    #[test]
    fn some_keys_during_rehash() {
        let mut d = seeded(512, 5);
        while d.rehash(1) {}
        d.expand(8192).unwrap();
        for _ in 0..20 {
            d.rehash(1);
        }
        assert!(d.is_rehashing());
        let picked = d.some_keys(100);
        assert!(!picked.is_empty());
        for h in &picked {
            assert!(h.key(&d).is_some());
        }
    }
}
