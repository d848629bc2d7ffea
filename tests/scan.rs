// Scan cursor integration suite.
//
// Invariant: a scan from cursor 0 until 0 comes back reports every key that
// was present for the whole scan at least once, even when the table grows
// and shrinks between calls.
use rehash_dict::{BytesKeys, Dict, HashSeed};
use std::collections::HashSet;
use std::rc::Rc;

type StrDict = Dict<BytesKeys<String, i64>>;

fn new_dict() -> StrDict {
    Dict::new(Rc::new(BytesKeys::new(HashSeed::new(*b"scan-suite-seed!"))))
}

fn finish(d: &mut StrDict) {
    while d.rehash(100) {}
}

// Test: 10,000 keys, an expand and a shrink in the middle of the scan.
// Verifies: the union of visited keys covers all original keys.
#[test]
fn scan_covers_keys_across_expand_and_shrink() {
    let mut d = new_dict();
    for i in 0..10_000 {
        d.add(format!("k{i}"), i).unwrap();
    }
    finish(&mut d);
    let start_size = d.table_size(0);
    assert_eq!(start_size, 16_384);

    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = 0;
    let step = |d: &StrDict, cursor: u64, seen: &mut HashSet<String>| {
        d.scan(cursor, |_, k, _| {
            seen.insert(k.clone());
        })
    };

    // First quarter of the cursor space.
    for _ in 0..start_size / 4 {
        cursor = step(&d, cursor, &mut seen);
        assert_ne!(cursor, 0);
    }

    // Grow: enough extra keys to push the load factor to 1, then finish
    // part of the rehash and keep scanning through the mixed state.
    let mut extra = 0;
    while !d.is_rehashing() {
        d.add(format!("extra{extra}"), 0).unwrap();
        extra += 1;
    }
    for _ in 0..64 {
        cursor = step(&d, cursor, &mut seen);
        d.rehash(10);
    }
    finish(&mut d);
    assert_eq!(d.table_size(0), 2 * start_size);
    for _ in 0..start_size / 4 {
        cursor = step(&d, cursor, &mut seen);
        if cursor == 0 {
            break;
        }
    }

    // Shrink: drop the extras, then resize to fit the originals.
    for i in 0..extra {
        assert!(d.delete(&format!("extra{i}")));
    }
    d.resize().unwrap();
    assert!(d.is_rehashing());
    while cursor != 0 {
        cursor = step(&d, cursor, &mut seen);
        d.rehash(1);
    }
    finish(&mut d);
    assert_eq!(d.table_size(0), start_size);

    for i in 0..10_000 {
        assert!(seen.contains(&format!("k{i}")), "scan missed k{i}");
    }
}

// Test: a scan of a stable table reports each key exactly once.
#[test]
fn stable_scan_has_no_duplicates() {
    let mut d = new_dict();
    for i in 0..3000 {
        d.add(format!("k{i}"), i).unwrap();
    }
    finish(&mut d);
    let mut visits = 0;
    let mut seen = HashSet::new();
    let mut cursor = 0;
    loop {
        cursor = d.scan(cursor, |_, k, _| {
            visits += 1;
            seen.insert(k.clone());
        });
        if cursor == 0 {
            break;
        }
    }
    assert_eq!(visits, 3000);
    assert_eq!(seen.len(), 3000);
}
