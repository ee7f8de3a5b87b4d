//! The capability vtable that keeps `Dict` agnostic of its key and value
//! types, realized as a trait instead of a struct of function pointers —
//! the same move `data::Key`/`data::Value` make in the teacher crate this
//! one grew out of.

use crate::embedded::EmbeddedKey;

/// Flags a [`DictType`] declares about the entries it wants to store.
///
/// `keys_are_odd` is only meaningful combined with `no_value`: it tells the
/// container every entry can live as a bare key in its bucket slot with no
/// wrapping entry at all. `embedded_entry` tells the container to inline
/// the descriptor's encoding of the key into the entry allocation instead
/// of boxing a separate key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DictFlags {
    pub no_value: bool,
    pub embedded_entry: bool,
    pub keys_are_odd: bool,
    pub no_incremental_rehash: bool,
}

impl DictFlags {
    /// Panics if the flag combination violates the one rule the container
    /// relies on: `keys_are_odd` without `no_value` has no defined meaning.
    pub(crate) fn validate(&self) {
        assert!(
            !self.keys_are_odd || self.no_value,
            "DictFlags::keys_are_odd is only meaningful together with no_value"
        );
    }
}

/// The capability set a `Dict<K, V, T>` calls out to in order to remain
/// generic over its key and value domain.
///
/// Every method but `hash` and `key_eq` has a default no-op implementation,
/// matching the "optional callback" language in the type descriptor this
/// trait generalizes: a descriptor only overrides the hooks it needs.
pub trait DictType<K, V> {
    /// Hashes a key. Descriptors that want the process-wide seeded SipHash
    /// variant should call into [`crate::hashing`] from their
    /// implementation rather than rolling their own.
    fn hash(&self, key: &K) -> u64;

    /// Compares two keys for equality. A descriptor that returns `false`
    /// for equal keys silently produces duplicate entries — the container
    /// trusts this callback and does not double-check it.
    fn key_eq(&self, a: &K, b: &K) -> bool;

    /// Clones a key for `add_raw`, which inserts from a borrowed key.
    /// Required (the container panics otherwise) only by callers of
    /// `add_raw`; the owned-key `add`/`insert` path never calls this.
    fn dup_key(&self, _key: &K) -> Option<K> {
        None
    }

    /// Observation hook fired immediately before a removed key is dropped
    /// by `delete` (not by `unlink`, which defers this to `free_unlinked`).
    fn destroy_key(&self, _key: &K) {}

    /// Observation hook fired immediately before a removed value is
    /// dropped by `delete`.
    fn destroy_value(&self, _value: &V) {}

    /// Encodes `key` for inline storage in the entry allocation. Required
    /// when [`DictFlags::embedded_entry`] is set; the default always
    /// returns `None`, which the container treats as "do not embed this
    /// key" and falls back to a normal boxed-key entry.
    fn embed_key(&self, _key: &K) -> Option<EmbeddedKey> {
        None
    }

    /// Compares an embedded key's encoding against a live key. The default
    /// re-derives the encoding of `key` via `embed_key` and compares bytes,
    /// which is correct as long as `embed_key` is an injective encoding —
    /// a contract the descriptor is trusted to uphold, exactly like
    /// `key_eq`.
    fn key_eq_embedded(&self, embedded: &EmbeddedKey, key: &K) -> bool {
        match self.embed_key(key) {
            Some(encoded) => encoded.bytes() == embedded.bytes(),
            None => false,
        }
    }

    /// Hashes an embedded key's raw encoding. Must agree with `hash(key)`
    /// for the key that produced the encoding, or entries will land in the
    /// wrong bucket after a migration recomputes their hash during growth.
    /// The default hashes the raw bytes with a fast non-cryptographic
    /// hash; override it if `embed_key`'s encoding does not already carry
    /// enough information to reproduce `hash(key)` bit-for-bit.
    fn hash_embedded(&self, embedded: &EmbeddedKey) -> u64 {
        crate::hashing::fxhash_bytes(embedded.bytes())
    }

    /// Vetoes a resize before it happens. `new_bucket_bytes` estimates the
    /// byte size of the array being allocated; `fill_factor` is the
    /// resulting `used / capacity` ratio. Returning `false` keeps the
    /// current table (chains grow instead).
    fn resize_allowed(&self, _new_bucket_bytes: usize, _fill_factor: f64) -> bool {
        true
    }

    /// Fired once a resize allocates the growing/shrinking table and
    /// starts migrating entries into it.
    fn rehash_started(&self) {}

    /// Fired once the old table has been fully drained and freed.
    fn rehash_completed(&self) {}

    /// Bytes of caller-owned metadata to reserve alongside the container.
    /// Retrieved via [`crate::dict::Dict::metadata`] /
    /// [`crate::dict::Dict::metadata_mut`].
    fn metadata_bytes(&self) -> usize {
        0
    }

    fn flags(&self) -> DictFlags {
        DictFlags::default()
    }
}
