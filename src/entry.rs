//! The polymorphic entry representation (spec §3), realized as a tagged
//! sum rather than pointer-tagged low bits: a `Slot` is what a bucket
//! holds directly, and a `Slot::Chain` walks a linked list of `Entry`
//! variants for the (rare, collision-driven) case of more than one key
//! per bucket.

use crate::descriptor::DictType;
use crate::embedded::EmbeddedKey;
use crate::value::EntryValue;

pub(crate) type Link<K, V> = Option<Box<Entry<K, V>>>;

/// One node in a bucket's collision chain.
pub(crate) enum Entry<K, V> {
    /// The common case: an owned key plus a value slot.
    Normal {
        key: K,
        value: EntryValue<V>,
        next: Link<K, V>,
    },
    /// `no_value` descriptors: no value slot at all.
    NoValue { key: K, next: Link<K, V> },
    /// `embedded_entry` descriptors: the key's encoding lives inline in
    /// this allocation instead of behind its own box.
    Embedded {
        key: EmbeddedKey,
        value: EntryValue<V>,
        next: Link<K, V>,
    },
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) fn next_mut(&mut self) -> &mut Link<K, V> {
        match self {
            Entry::Normal { next, .. } => next,
            Entry::NoValue { next, .. } => next,
            Entry::Embedded { next, .. } => next,
        }
    }

    #[inline]
    pub(crate) fn take_next(&mut self) -> Link<K, V> {
        self.next_mut().take()
    }

    #[inline]
    pub(crate) fn set_next(&mut self, next: Link<K, V>) {
        *self.next_mut() = next;
    }

    /// Whether this entry's key (however it's stored) equals `key`.
    pub(crate) fn key_matches<T: DictType<K, V>>(&self, descriptor: &T, key: &K) -> bool {
        match self {
            Entry::Normal { key: k, .. } => descriptor.key_eq(k, key),
            Entry::NoValue { key: k, .. } => descriptor.key_eq(k, key),
            Entry::Embedded { key: ek, .. } => descriptor.key_eq_embedded(ek, key),
        }
    }

    /// Hash this entry would get if freshly inserted — used by the
    /// incremental rehasher when growing (shrinking reuses the old index
    /// instead, see `crate::rehash`).
    pub(crate) fn rehash<T: DictType<K, V>>(&self, descriptor: &T) -> u64 {
        match self {
            Entry::Normal { key, .. } => descriptor.hash(key),
            Entry::NoValue { key, .. } => descriptor.hash(key),
            Entry::Embedded { key, .. } => descriptor.hash_embedded(key),
        }
    }

    pub(crate) fn value(&self) -> Option<&EntryValue<V>> {
        match self {
            Entry::Normal { value, .. } => Some(value),
            Entry::NoValue { .. } => None,
            Entry::Embedded { value, .. } => Some(value),
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut EntryValue<V>> {
        match self {
            Entry::Normal { value, .. } => Some(value),
            Entry::NoValue { .. } => None,
            Entry::Embedded { value, .. } => Some(value),
        }
    }

    /// Decomposes the entry into its owned key (if representable as `K`)
    /// and value, for `delete`/`unlink`. Embedded entries have no owned
    /// `K` to hand back — only their caller-supplied `key: &K` reference
    /// at the call site, which the container already holds.
    pub(crate) fn into_key_value(self) -> (Option<K>, Option<EntryValue<V>>) {
        match self {
            Entry::Normal { key, value, .. } => (Some(key), Some(value)),
            Entry::NoValue { key, .. } => (Some(key), None),
            Entry::Embedded { value, .. } => (None, Some(value)),
        }
    }
}

/// What a bucket slot directly holds.
pub(crate) enum Slot<K, V> {
    Empty,
    /// The key-only variant: `no_value` + `keys_are_odd`, stores nothing
    /// beyond the bucket slot itself.
    Key(K),
    Chain(Box<Entry<K, V>>),
}

impl<K, V> Default for Slot<K, V> {
    fn default() -> Self {
        Slot::Empty
    }
}

impl<K, V> Slot<K, V> {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}
