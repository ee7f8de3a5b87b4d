//! Process-wide hash seed and the two hash families descriptors pick from.
//!
//! The teacher crate defaults to `fxhash::FxBuildHasher` for its hash index
//! (`index::hash::DefaultHashBuilder`) because most of its keys are small
//! fixed-width integers. This crate keeps that default for the same
//! reason, and adds the seeded SipHash-2-4 variant the spec calls for when
//! a descriptor hashes untrusted byte strings and wants hash-flooding
//! resistance — built on `siphasher`, the crate `triblespace-tribles-rust`
//! already depends on for content hashing.

use std::hash::Hasher;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use siphasher::sip::SipHasher24;

static HASH_SEED: Lazy<RwLock<[u8; 16]>> = Lazy::new(|| RwLock::new([0u8; 16]));

/// Overwrites the process-wide SipHash seed. Intended to be called once at
/// startup, before any `Dict` using the seeded hash functions is built —
/// changing it afterwards changes where every such `Dict`'s keys hash to.
pub fn set_hash_seed(seed: [u8; 16]) {
    *HASH_SEED.write().expect("hash seed lock poisoned") = seed;
}

/// Returns the current process-wide SipHash seed.
pub fn hash_seed() -> [u8; 16] {
    *HASH_SEED.read().expect("hash seed lock poisoned")
}

/// SipHash-2-4 over `bytes`, keyed by the process-wide seed.
pub fn siphash24(bytes: &[u8]) -> u64 {
    siphash24_with_seed(&hash_seed(), bytes)
}

/// SipHash-2-4 over `bytes` with an explicit seed, for callers that don't
/// want to touch the process-wide one (tests, multiple independent dicts
/// with different seeds in the same process).
pub fn siphash24_with_seed(seed: &[u8; 16], bytes: &[u8]) -> u64 {
    let k0 = u64::from_le_bytes(seed[0..8].try_into().unwrap());
    let k1 = u64::from_le_bytes(seed[8..16].try_into().unwrap());
    let mut hasher = SipHasher24::new_with_keys(k0, k1);
    hasher.write(bytes);
    hasher.finish()
}

/// Case-insensitive SipHash-2-4: ASCII bytes are lower-cased before
/// hashing so that keys differing only in ASCII case collide identically.
pub fn siphash24_case_insensitive(bytes: &[u8]) -> u64 {
    let seed = hash_seed();
    let k0 = u64::from_le_bytes(seed[0..8].try_into().unwrap());
    let k1 = u64::from_le_bytes(seed[8..16].try_into().unwrap());
    let mut hasher = SipHasher24::new_with_keys(k0, k1);
    let lowered: Vec<u8> = bytes.iter().map(u8::to_ascii_lowercase).collect();
    hasher.write(&lowered);
    hasher.finish()
}

/// Fast, unseeded hash for small fixed-width keys — the default a
/// descriptor reaches for when hash-flooding resistance doesn't matter.
pub fn fxhash_bytes(bytes: &[u8]) -> u64 {
    use std::hash::Hash;
    let mut hasher = fxhash::FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Bucket index for a hash under a power-of-two-sized table.
#[inline]
pub fn bucket_index(hash: u64, mask: usize) -> usize {
    hash as usize & mask
}
