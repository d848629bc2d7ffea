#![cfg(test)]

// Property tests for Dict kept inside the crate so they can check the
// internal structure after every operation.

use crate::config::DictConfig;
use crate::dict::test_types::{str_keys, Colliding};
use crate::dict::{Dict, Handle};
use crate::dict_type::{DictType, Value};
use crate::error::DictError;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

// Pool-indexed operations so shrinking moves towards earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i64),
    Replace(usize, i64),
    Delete(usize),
    Unlink(usize),
    Find(usize),
    Iterate,
    Rehash(usize),
    Shrink,
    RandomKey,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,6}", 1..=40).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| OpI::Add(i, v)),
            2 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            2 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Unlink),
            2 => idx.clone().prop_map(OpI::Find),
            1 => Just(OpI::Iterate),
            1 => (1usize..8).prop_map(OpI::Rehash),
            1 => Just(OpI::Shrink),
            1 => Just(OpI::RandomKey),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap, shared by the
// hashed and the constant-hash variants.
// Invariants exercised across random operation sequences:
// - Duplicate adds fail and name the live entry.
// - Handles stay stable across rehash steps and go stale on removal.
// - `iter` yields each live entry exactly once.
// - `random_key` only returns live entries.
// - The structure is consistent after every operation.
fn run_state_machine<T>(mut sut: Dict<T>, pool: &[String], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    T: DictType<Key = String, Value = i64>,
{
    let mut model: HashMap<String, i64> = HashMap::new();
    let mut live: HashMap<String, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Add(i, v) => {
                let k = pool[i].clone();
                match sut.add(k.clone(), v) {
                    Ok(h) => {
                        prop_assert!(!model.contains_key(&k), "add must fail on duplicate");
                        model.insert(k.clone(), v);
                        live.insert(k, h);
                    }
                    Err(DictError::KeyExists(h)) => {
                        prop_assert_eq!(Some(&h), live.get(&k));
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Replace(i, v) => {
                let k = pool[i].clone();
                let added = sut.replace(k.clone(), v);
                prop_assert_eq!(added, model.insert(k.clone(), v).is_none());
                let h = sut.find(&k);
                prop_assert!(h.is_some());
                if added {
                    if let Some(h) = h {
                        live.insert(k, h);
                    }
                } else {
                    prop_assert_eq!(h.as_ref(), live.get(&k));
                }
            }
            OpI::Delete(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.delete(k), model.remove(k).is_some());
                if let Some(h) = live.remove(k) {
                    stale.push(h);
                }
            }
            OpI::Unlink(i) => {
                let k = &pool[i];
                match sut.unlink(k) {
                    Some(u) => {
                        let expected = model.remove(k).map(Value::Owned);
                        prop_assert_eq!(u.key(), k);
                        prop_assert_eq!(Some(u.value()), expected.as_ref());
                        sut.free_unlinked(u);
                        if let Some(h) = live.remove(k) {
                            stale.push(h);
                        }
                    }
                    None => prop_assert!(!model.contains_key(k)),
                }
            }
            OpI::Find(i) => {
                let k = &pool[i];
                let found = sut.find(k);
                prop_assert_eq!(found.as_ref(), live.get(k));
                if let Some(h) = found {
                    let expected = model.get(k).map(|v| Value::Owned(*v));
                    prop_assert_eq!(h.value(&sut), expected.as_ref());
                }
            }
            OpI::Iterate => {
                let mut s_keys = BTreeSet::new();
                for (_, k, _) in sut.iter() {
                    prop_assert!(s_keys.insert(k.clone()), "key yielded twice");
                }
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            OpI::Rehash(n) => {
                sut.rehash(n);
            }
            OpI::Shrink => {
                sut.shrink_if_needed();
            }
            OpI::RandomKey => match sut.random_key() {
                Some(h) => {
                    let k = h.key(&sut).cloned();
                    prop_assert!(k.map_or(false, |k| model.contains_key(&k)));
                }
                None => prop_assert!(model.is_empty()),
            },
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        sut.assert_consistent();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), seed in any::<u64>()) {
        let sut = Dict::with_config(str_keys(), DictConfig::default().with_rng_seed(seed));
        run_state_machine(sut, &pool, ops)?;
    }
}

// Same invariants under a constant hash: every entry shares one chain, which
// stresses key comparison and mid-chain unlinking.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(), seed in any::<u64>()) {
        let sut = Dict::with_config(Rc::new(Colliding), DictConfig::default().with_rng_seed(seed));
        run_state_machine(sut, &pool, ops)?;
    }
}

// A scan interleaved with random adds and deletes reports every key that was
// present for the whole scan.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_scan_survives_resizes(
        base in 1usize..400,
        churn in proptest::collection::vec((any::<bool>(), 0usize..2000), 0..200),
    ) {
        let mut d = Dict::new(str_keys());
        for i in 0..base {
            d.add(format!("base{i}"), i as i64).unwrap();
        }
        let mut seen = BTreeSet::new();
        let mut cursor = 0;
        let mut churn = churn.into_iter();
        loop {
            cursor = d.scan(cursor, |_, k, _| {
                seen.insert(k.clone());
            });
            if cursor == 0 {
                break;
            }
            if let Some((add, n)) = churn.next() {
                let k = format!("extra{n}");
                if add {
                    let _ = d.add(k, 0);
                } else {
                    d.delete(&k);
                }
                d.shrink_if_needed();
            }
        }
        for i in 0..base {
            let key = format!("base{}", i);
            prop_assert!(seen.contains(&key), "missed {}", key);
        }
    }
}
