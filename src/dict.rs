//! Dict: chained hash table over two generations with handle-based access.
//!
//! Entries live in a generational arena; buckets and chain links hold arena
//! keys. Migrating an entry between generations relinks keys and never moves
//! the entry, so a `Handle` stays valid across rehashing until the entry is
//! deleted.

use crate::config::{DictConfig, ResizeSwitch, EMPTY_CALLBACK_PERIOD, INITIAL_SIZE};
use crate::dict_type::{DictType, Value};
use crate::error::DictError;
use crate::generation::Generation;
use crate::safe_iter::SafeIterCount;
use rand::rngs::StdRng;
use rand::SeedableRng;
use slotmap::{DefaultKey, SlotMap};
use std::rc::Rc;

/// Stable reference to one entry of a `Dict`.
///
/// A handle remembers the table that issued it; accessors given any other
/// table resolve to `None`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    key: DefaultKey,
    owner: usize,
}

impl Handle {

    pub fn key<'a, T: DictType>(&self, dict: &'a Dict<T>) -> Option<&'a T::Key> {
        dict.handle_key(*self)
    }

    pub fn value<'a, T: DictType>(&self, dict: &'a Dict<T>) -> Option<&'a Value<T::Value>> {
        dict.handle_value(*self)
    }

    pub fn value_mut<'a, T: DictType>(
        &self,
        dict: &'a mut Dict<T>,
    ) -> Option<&'a mut Value<T::Value>> {
        dict.handle_value_mut(*self)
    }
}

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: Value<V>,
    pub(crate) hash: u64,
    pub(crate) next: Option<DefaultKey>,
}

/// An entry detached by `Dict::unlink`; its destructors have not run yet.
#[derive(Debug)]
pub struct Unlinked<K, V> {
    key: K,
    value: Value<V>,
}

impl<K, V> Unlinked<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &Value<V> {
        &self.value
    }

    /// Take the parts without running the table's destructors.
    pub fn into_parts(self) -> (K, Value<V>) {
        (self.key, self.value)
    }
}

pub struct Dict<T: DictType> {
    pub(crate) ty: Rc<T>,
    pub(crate) entries: SlotMap<DefaultKey, Entry<T::Key, T::Value>>,
    pub(crate) ht: [Generation; 2],
    /// Next bucket of `ht[0]` to migrate; `None` when not rehashing.
    pub(crate) rehash_idx: Option<usize>,
    pub(crate) safe_iterators: SafeIterCount,
    pub(crate) resize: ResizeSwitch,
    pub(crate) rng: StdRng,
    /// Longest chain the sampler has met; see `Dict::random_key`.
    pub(crate) chain_ceiling: usize,
}

impl<T: DictType> Dict<T> {
    pub fn new(ty: Rc<T>) -> Self {
        Self::with_config(ty, DictConfig::default())
    }

    pub fn with_config(ty: Rc<T>, config: DictConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            ty,
            entries: SlotMap::with_key(),
            ht: [Generation::empty(), Generation::empty()],
            rehash_idx: None,
            safe_iterators: SafeIterCount::new(),
            resize: config.resize,
            rng,
            chain_ceiling: 1,
        }
    }

    pub fn dict_type(&self) -> &Rc<T> {
        &self.ty
    }

    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total buckets across both generations.
    pub fn slots(&self) -> usize {
        self.ht[0].size() + self.ht[1].size()
    }

    /// Capacity of generation `table` (0 = primary, 1 = rehash target).
    pub fn table_size(&self, table: usize) -> usize {
        self.ht[table].size()
    }

    /// Live entries stored in generation `table`.
    pub fn table_used(&self, table: usize) -> usize {
        self.ht[table].used
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx.is_some()
    }

    pub fn rehash_cursor(&self) -> Option<usize> {
        self.rehash_idx
    }

    pub fn safe_iterators(&self) -> usize {
        self.safe_iterators.count()
    }

    pub fn hash_key(&self, key: &T::Key) -> u64 {
        self.ty.hash(key)
    }

    /// Probe `ht[0]`, then `ht[1]` while rehashing.
    fn lookup(&self, key: &T::Key, hash: u64) -> Option<DefaultKey> {
        for table in 0..=1 {
            let gen = &self.ht[table];
            if gen.size() == 0 {
                return None;
            }
            let mut cur = gen.buckets[gen.index_of(hash)];
            while let Some(k) = cur {
                let e = &self.entries[k];
                if e.hash == hash && self.ty.key_compare(&e.key, key) {
                    return Some(k);
                }
                cur = e.next;
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    pub fn find(&mut self, key: &T::Key) -> Option<Handle> {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let hash = self.ty.hash(key);
        self.lookup(key, hash).map(|k| self.handle(k))
    }

    pub fn contains_key(&mut self, key: &T::Key) -> bool {
        self.find(key).is_some()
    }

    pub fn fetch_value(&mut self, key: &T::Key) -> Option<&Value<T::Value>> {
        let h = self.find(key)?;
        self.handle_value(h)
    }

    /// Step the rehash, then hash `key` and check it is absent.
    /// Returns the hash for a fresh insert, or the existing entry.
    fn key_index(&mut self, key: &T::Key) -> Result<u64, Handle> {
        self.rehash_step();
        let hash = self.ty.hash(key);
        match self.lookup(key, hash) {
            Some(k) => Err(self.handle(k)),
            None => Ok(hash),
        }
    }

    /// Push a new entry at the head of its bucket in the active generation.
    fn link_new(&mut self, key: T::Key, value: Value<T::Value>, hash: u64) -> Handle {
        if self.ht[0].size() == 0 {
            let _ = self.expand(INITIAL_SIZE);
        }
        let key = self.ty.dup_key(key);
        let value = self.dup_value(value);
        let table = if self.is_rehashing() { 1 } else { 0 };
        let gen = &mut self.ht[table];
        let idx = gen.index_of(hash);
        let k = self.entries.insert(Entry {
            key,
            value,
            hash,
            next: gen.buckets[idx],
        });
        gen.buckets[idx] = Some(k);
        gen.used += 1;
        self.expand_if_needed();
        self.handle(k)
    }

    /// Insert `key` with an owned value. Fails if the key is present.
    pub fn add(&mut self, key: T::Key, value: T::Value) -> Result<Handle, DictError> {
        self.add_raw(key, Value::Owned(value))
    }

    /// Insert `key` with any value variant. Fails if the key is present.
    pub fn add_raw(&mut self, key: T::Key, value: Value<T::Value>) -> Result<Handle, DictError> {
        let hash = self.key_index(&key).map_err(DictError::KeyExists)?;
        Ok(self.link_new(key, value, hash))
    }

    /// Return the existing entry for `key`, or insert `value` under it.
    pub fn add_or_find(&mut self, key: T::Key, value: Value<T::Value>) -> Handle {
        match self.key_index(&key) {
            Ok(hash) => self.link_new(key, value, hash),
            Err(existing) => existing,
        }
    }

    /// Insert or overwrite. Returns `true` when the key was newly added.
    /// An overwrite keeps the stored key and destroys the old value after
    /// the new one is in place.
    pub fn replace(&mut self, key: T::Key, value: T::Value) -> bool {
        match self.key_index(&key) {
            Ok(hash) => {
                self.link_new(key, Value::Owned(value), hash);
                true
            }
            Err(existing) => {
                self.set_value(existing, value);
                false
            }
        }
    }

    /// Overwrite the value behind `h`. Returns `false` for a stale handle.
    pub fn set_value(&mut self, h: Handle, value: T::Value) -> bool {
        let Some(k) = self.resolve(h) else {
            return false;
        };
        if !self.entries.contains_key(k) {
            return false;
        }
        let new = self.dup_value(Value::Owned(value));
        let old = match self.entries.get_mut(k) {
            Some(e) => core::mem::replace(&mut e.value, new),
            None => return false,
        };
        self.destroy_value(old);
        true
    }

    /// Detach the entry for `key` from its chain.
    fn generic_delete(&mut self, key: &T::Key) -> Option<Entry<T::Key, T::Value>> {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let hash = self.ty.hash(key);
        for table in 0..=1 {
            let gen = &self.ht[table];
            if gen.size() == 0 {
                return None;
            }
            let idx = gen.index_of(hash);
            let mut prev: Option<DefaultKey> = None;
            let mut cur = gen.buckets[idx];
            while let Some(k) = cur {
                let e = &self.entries[k];
                let next = e.next;
                if e.hash == hash && self.ty.key_compare(&e.key, key) {
                    match prev {
                        None => self.ht[table].buckets[idx] = next,
                        Some(p) => self.entries[p].next = next,
                    }
                    self.ht[table].used -= 1;
                    if self.chain_ceiling > 1 && self.chain_len(table, idx) + 1 >= self.chain_ceiling {
                        self.chain_ceiling = 1;
                    }
                    return self.entries.remove(k);
                }
                prev = cur;
                cur = next;
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    fn chain_len(&self, table: usize, idx: usize) -> usize {
        let mut len = 0;
        let mut cur = self.ht[table].buckets[idx];
        while let Some(k) = cur {
            len += 1;
            cur = self.entries[k].next;
        }
        len
    }

    /// Remove `key` and run its destructors. Returns `false` if absent.
    pub fn delete(&mut self, key: &T::Key) -> bool {
        match self.generic_delete(key) {
            Some(e) => {
                self.destroy_entry(e);
                true
            }
            None => false,
        }
    }

    /// Remove `key` without destroying it; hand the result to
    /// `free_unlinked` once it is safe to release.
    pub fn unlink(&mut self, key: &T::Key) -> Option<Unlinked<T::Key, T::Value>> {
        self.generic_delete(key).map(|e| Unlinked {
            key: e.key,
            value: e.value,
        })
    }

    pub fn free_unlinked(&self, entry: Unlinked<T::Key, T::Value>) {
        self.ty.destroy_key(entry.key);
        self.destroy_value(entry.value);
    }

    /// Destroy every entry and return to the empty, unallocated state.
    pub fn clear(&mut self) {
        self.clear_with(|| {});
    }

    /// Like `clear`, calling `callback` every `EMPTY_CALLBACK_PERIOD`
    /// buckets so a long release can yield to other work.
    pub fn clear_with<F: FnMut()>(&mut self, mut callback: F) {
        for table in 0..=1 {
            let gen = core::mem::replace(&mut self.ht[table], Generation::empty());
            for (i, head) in gen.buckets.iter().enumerate() {
                if i % EMPTY_CALLBACK_PERIOD == 0 {
                    callback();
                }
                let mut cur = *head;
                while let Some(k) = cur {
                    match self.entries.remove(k) {
                        Some(e) => {
                            cur = e.next;
                            self.destroy_entry(e);
                        }
                        None => break,
                    }
                }
            }
        }
        debug_assert!(self.entries.is_empty());
        self.rehash_idx = None;
        self.chain_ceiling = 1;
    }

    fn dup_value(&self, value: Value<T::Value>) -> Value<T::Value> {
        match value {
            Value::Owned(v) => Value::Owned(self.ty.dup_value(v)),
            other => other,
        }
    }

    fn destroy_value(&self, value: Value<T::Value>) {
        if let Value::Owned(v) = value {
            self.ty.destroy_value(v);
        }
    }

    fn destroy_entry(&self, e: Entry<T::Key, T::Value>) {
        self.ty.destroy_key(e.key);
        self.destroy_value(e.value);
    }

    /// Handle for arena key `k`, tagged with this table.
    #[inline]
    pub(crate) fn handle(&self, k: DefaultKey) -> Handle {
        Handle {
            key: k,
            owner: self.safe_iterators.id(),
        }
    }

    /// Arena key behind `h`, or `None` if another table issued it.
    #[inline]
    fn resolve(&self, h: Handle) -> Option<DefaultKey> {
        (h.owner == self.safe_iterators.id()).then_some(h.key)
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&T::Key> {
        self.entries.get(self.resolve(h)?).map(|e| &e.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&Value<T::Value>> {
        self.entries.get(self.resolve(h)?).map(|e| &e.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut Value<T::Value>> {
        let k = self.resolve(h)?;
        self.entries.get_mut(k).map(|e| &mut e.value)
    }

    /// Panics unless every structural invariant holds.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = 0;
        for (table, gen) in self.ht.iter().enumerate() {
            let mut used = 0;
            for (idx, head) in gen.buckets.iter().enumerate() {
                let mut cur = *head;
                while let Some(k) = cur {
                    let e = &self.entries[k];
                    assert_eq!(gen.index_of(e.hash), idx, "entry in wrong bucket");
                    assert_eq!(e.hash, self.ty.hash(&e.key), "stale cached hash");
                    used += 1;
                    cur = e.next;
                }
            }
            assert_eq!(used, gen.used, "used count of table {table}");
            assert!(gen.size() == 0 || gen.size().is_power_of_two());
            seen += used;
        }
        assert_eq!(seen, self.entries.len(), "orphaned entries");
        match self.rehash_idx {
            None => assert_eq!(self.ht[1].size(), 0),
            Some(idx) => {
                assert!(self.ht[1].size() > 0);
                assert!(self.ht[0].buckets[..idx].iter().all(Option::is_none));
            }
        }
    }
}

impl<T: DictType> Drop for Dict<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
