//! rehash-dict: a single-threaded chained hash table that grows and shrinks
//! by incremental rehashing, with resize-tolerant scans and random sampling.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every operation's worst case bounded while the table
//!   resizes, by spreading a resize over many small steps.
//! - Layers:
//!   - `DictType`: per-table callbacks for hashing, key comparison,
//!     duplication and destruction of keys and values.
//!   - `Generation`: one power-of-two bucket array of chain heads.
//!   - `Dict<T>`: two generations plus a rehash cursor. Entries live in a
//!     generational arena and are addressed by `Handle`s.
//!   - Iteration (`iter`, `safe_iter`, `unsafe_iter`), sampling
//!     (`random_key`, `some_keys`) and the reverse-binary `scan` cursor
//!     sit on top of `Dict`.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (shared counters are `Rc<Cell<_>>`).
//! - Unique keys; duplicate adds fail with the existing entry's handle.
//! - Handles stay valid across rehashing: migrating an entry relinks its
//!   arena key and never moves the entry.
//!
//! Rehash invariants
//! - Not rehashing: `ht[1]` is unallocated.
//! - Rehashing: every `ht[0]` bucket below the cursor is empty and new
//!   entries go to `ht[1]`. Lookups probe `ht[0]` then `ht[1]`.
//! - Each entry caches its hash; migration never calls back into
//!   `DictType::hash`.
//! - Lookups, adds and deletes each migrate one bucket unless a safe
//!   iterator is outstanding.
//!
//! Scan invariants
//! - An entry present for the whole scan is reported at least once, even
//!   if the table grows or shrinks between calls. Duplicates are possible.
//!
//! Notes and non-goals
//! - No concurrent access and no persistence.
//! - Growth happens on insert. Shrinking is an explicit `resize` or
//!   `shrink_if_needed` call, usually from periodic housekeeping.

mod config;
mod dict;
mod dict_proptest;
mod dict_type;
mod error;
mod generation;
mod hash;
mod iter;
mod rehash;
mod safe_iter;
mod sample;
mod scan;
mod stats;

// Public surface
pub use config::{
    DictConfig, HashSeed, ResizeSwitch, EMPTY_CALLBACK_PERIOD, FORCE_RESIZE_RATIO, INITIAL_SIZE,
    MIN_FILL_PERCENT, REHASH_BATCH, SAMPLE_EMPTY_RUN, SAMPLE_REJECT_LIMIT,
};
pub use dict::{Dict, Handle, Unlinked};
pub use dict_type::{BytesKeys, CaseInsensitiveKeys, DictType, Value};
pub use error::DictError;
pub use hash::{gen_case_hash, gen_hash};
pub use iter::{DictIterator, Iter};
pub use stats::{DictStats, GenerationStats, STATS_VECTLEN};
