//! Process-wide configuration consumed by tables.
//!
//! The embedding engine creates one `ResizeSwitch` and one `HashSeed` at
//! start-up and threads clones of them into every table (and into the key
//! types that hash with the seed). Nothing here is a hidden global.

use core::cell::Cell;
use std::rc::Rc;

/// Capacity of the first bucket array and the floor for shrinking.
pub const INITIAL_SIZE: usize = 4;

/// Load factor at which a table expands even when resizing is disabled.
pub const FORCE_RESIZE_RATIO: usize = 5;

/// Fill percentage below which a table is worth shrinking.
pub const MIN_FILL_PERCENT: usize = 10;

/// Buckets migrated per batch by the time-boxed rehash.
pub const REHASH_BATCH: usize = 100;

/// Consecutive empty buckets after which `Dict::some_keys` jumps to a new
/// random position.
pub const SAMPLE_EMPTY_RUN: usize = 5;

/// Rejected picks after which `Dict::random_key` lowers its chain-length
/// ceiling to the longest chain met during the call.
pub const SAMPLE_REJECT_LIMIT: usize = 1024;

/// Buckets released between two `Dict::clear_with` callbacks.
pub const EMPTY_CALLBACK_PERIOD: usize = 65536;

/// Shared on/off switch for opportunistic resizing.
///
/// Turned off while copy-on-write page growth must be limited (e.g. a
/// snapshot child process is alive). Tables sharing the switch still expand
/// once their load factor reaches `FORCE_RESIZE_RATIO`.
#[derive(Clone, Debug)]
pub struct ResizeSwitch {
    enabled: Rc<Cell<bool>>,
}

impl ResizeSwitch {
    pub fn new() -> Self {
        Self {
            enabled: Rc::new(Cell::new(true)),
        }
    }

    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

impl Default for ResizeSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// 128-bit key for the default hash functions. Set once before the first
/// table is created and never changed afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HashSeed([u8; 16]);

impl HashSeed {
    pub const fn new(bytes: [u8; 16]) -> Self {
        HashSeed(bytes)
    }

    /// Draw a fresh seed from the OS-backed thread RNG.
    pub fn random() -> Self {
        HashSeed(rand::random())
    }

    pub fn bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Per-table configuration handed to `Dict::with_config`.
#[derive(Clone, Debug, Default)]
pub struct DictConfig {
    pub resize: ResizeSwitch,
    /// Seed for the sampling RNG. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl DictConfig {
    pub fn with_resize(mut self, resize: ResizeSwitch) -> Self {
        self.resize = resize;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
