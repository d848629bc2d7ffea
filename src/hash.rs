//! Default keyed hash functions over byte strings.

use crate::config::HashSeed;
use core::hash::Hasher;
use siphasher::sip::SipHasher13;

/// SipHash-1-3 of `bytes` keyed by `seed`.
pub fn gen_hash(seed: &HashSeed, bytes: &[u8]) -> u64 {
    let mut h = SipHasher13::new_with_key(seed.bytes());
    h.write(bytes);
    h.finish()
}

/// Case-insensitive variant of [`gen_hash`]: ASCII letters are folded to
/// lowercase before hashing.
pub fn gen_case_hash(seed: &HashSeed, bytes: &[u8]) -> u64 {
    let mut h = SipHasher13::new_with_key(seed.bytes());
    let mut buf = [0u8; 64];
    for chunk in bytes.chunks(buf.len()) {
        let folded = &mut buf[..chunk.len()];
        folded.copy_from_slice(chunk);
        folded.make_ascii_lowercase();
        h.write(folded);
    }
    h.finish()
}
