//! DictType: per-table callbacks and the tagged value slot.
//!
//! A `DictType` bundles how a table hashes, compares, copies and destroys
//! its keys and values. The implementing value itself is the private data
//! every callback sees through `&self`. Tables hold it behind an `Rc`, so a
//! single descriptor can serve many tables and outlives all of them.

use crate::config::HashSeed;
use crate::hash::{gen_case_hash, gen_hash};
use core::marker::PhantomData;

/// Callbacks a table uses to handle its keys and values.
///
/// Only `hash` is required. The rest default to: compare with `==`, store
/// keys and values as given, and drop them on destruction.
pub trait DictType {
    type Key: PartialEq;
    type Value;

    fn hash(&self, key: &Self::Key) -> u64;

    fn key_compare(&self, a: &Self::Key, b: &Self::Key) -> bool {
        a == b
    }

    /// Produce the key actually stored on insert.
    fn dup_key(&self, key: Self::Key) -> Self::Key {
        key
    }

    /// Produce the value actually stored on insert or replace. Only called
    /// for `Value::Owned` payloads.
    fn dup_value(&self, value: Self::Value) -> Self::Value {
        value
    }

    fn destroy_key(&self, key: Self::Key) {
        drop(key);
    }

    /// Only called for `Value::Owned` payloads.
    fn destroy_value(&self, value: Self::Value) {
        drop(value);
    }
}

/// Value slot of an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<V> {
    Owned(V),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl<V> Value<V> {
    pub fn as_owned(&self) -> Option<&V> {
        match self {
            Value::Owned(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_owned_mut(&mut self) -> Option<&mut V> {
        match self {
            Value::Owned(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<i64> {
        match *self {
            Value::Signed(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match *self {
            Value::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_owned(self) -> Option<V> {
        match self {
            Value::Owned(v) => Some(v),
            _ => None,
        }
    }
}

impl<V> From<V> for Value<V> {
    fn from(v: V) -> Self {
        Value::Owned(v)
    }
}

/// Binary-safe byte-string keys hashed with SipHash under a fixed seed.
pub struct BytesKeys<K, V> {
    seed: HashSeed,
    _pd: PhantomData<fn() -> (K, V)>,
}

impl<K, V> BytesKeys<K, V> {
    pub fn new(seed: HashSeed) -> Self {
        Self {
            seed,
            _pd: PhantomData,
        }
    }
}

impl<K, V> DictType for BytesKeys<K, V>
where
    K: AsRef<[u8]> + PartialEq,
{
    type Key = K;
    type Value = V;

    fn hash(&self, key: &K) -> u64 {
        gen_hash(&self.seed, key.as_ref())
    }

    fn key_compare(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

/// Byte-string keys compared and hashed ignoring ASCII case.
pub struct CaseInsensitiveKeys<K, V> {
    seed: HashSeed,
    _pd: PhantomData<fn() -> (K, V)>,
}

impl<K, V> CaseInsensitiveKeys<K, V> {
    pub fn new(seed: HashSeed) -> Self {
        Self {
            seed,
            _pd: PhantomData,
        }
    }
}

impl<K, V> DictType for CaseInsensitiveKeys<K, V>
where
    K: AsRef<[u8]> + PartialEq,
{
    type Key = K;
    type Value = V;

    fn hash(&self, key: &K) -> u64 {
        gen_case_hash(&self.seed, key.as_ref())
    }

    fn key_compare(&self, a: &K, b: &K) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: HashSeed = HashSeed::new([7; 16]);

    #[test]
    fn value_accessors_match_variant() {
        let v: Value<String> = Value::Signed(-3);
        assert_eq!(v.as_signed(), Some(-3));
        assert_eq!(v.as_unsigned(), None);
        assert!(v.as_owned().is_none());

        let mut o: Value<String> = "x".to_string().into();
        o.as_owned_mut().unwrap().push('y');
        assert_eq!(o.as_owned().map(String::as_str), Some("xy"));
        assert_eq!(Value::<()>::Float(1.5).as_float(), Some(1.5));
        assert_eq!(Value::<()>::Unsigned(9).as_unsigned(), Some(9));
    }

    #[test]
    fn case_insensitive_keys_agree_on_hash_and_compare() {
        let t: CaseInsensitiveKeys<&str, ()> = CaseInsensitiveKeys::new(SEED);
        assert!(t.key_compare(&"GET", &"get"));
        assert_eq!(t.hash(&"GET"), t.hash(&"get"));

        let b: BytesKeys<&str, ()> = BytesKeys::new(SEED);
        assert!(!b.key_compare(&"GET", &"get"));
    }
}
