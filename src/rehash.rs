//! Incremental migration between `Dict`'s two tables.
//!
//! Growth and shrink share this stepper; they differ only in whether a
//! bucket's destination can be computed from its old index directly.
//! Shrinking always can: if `new_mask` is a subset of the old table's mask
//! bits (which it is, since shrinking only removes high bits), then for
//! any hash with `hash & old_mask == idx`, `hash & new_mask == idx &
//! new_mask` — no need to touch the key or recompute its hash. Growing
//! does not have this shortcut since the new mask has bits the old one
//! didn't, so each entry's hash is recomputed via `DictType::hash` (or
//! `hash_embedded` for inline-encoded keys).

use crate::descriptor::DictType;
use crate::dict::Dict;
use crate::entry::{Entry, Slot};
use crate::table::Table;

/// Bound on empty buckets visited per call, so a sparse table being
/// rehashed doesn't make `rehash_steps` scan far past its requested
/// budget just to find `n` occupied buckets.
const EMPTY_VISITS_PER_STEP: usize = 10;

/// Migrates up to `n` occupied buckets (skipping empty ones, bounded by
/// `EMPTY_VISITS_PER_STEP * n`). Returns whether rehashing is still in
/// progress afterward.
pub(crate) fn rehash_steps<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, n: usize) -> bool {
    if !dict.is_rehashing() {
        return false;
    }
    let mut steps_remaining = n;
    let mut empty_budget = n.saturating_mul(EMPTY_VISITS_PER_STEP);
    while steps_remaining > 0 {
        if dict.tables[0].used == 0 || dict.rehash_idx as usize >= dict.tables[0].size() {
            finish_rehash(dict);
            return false;
        }
        let idx = dict.rehash_idx as usize;
        if dict.tables[0].slots[idx].is_empty() {
            dict.rehash_idx += 1;
            if empty_budget == 0 {
                return true;
            }
            empty_budget -= 1;
            continue;
        }
        migrate_bucket(dict, idx);
        dict.rehash_idx += 1;
        steps_remaining -= 1;
    }
    if dict.rehash_idx as usize >= dict.tables[0].size() {
        finish_rehash(dict);
        false
    } else {
        true
    }
}

/// Drains the rest of an in-progress rehash in one call, for
/// `no_incremental_rehash` descriptors that opt out of amortized
/// migration.
pub(crate) fn rehash_all<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>) {
    while dict.is_rehashing() {
        let budget = dict.tables[0].size().max(1);
        rehash_steps(dict, budget);
    }
}

/// Migrates up to `n` buckets within `budget`, whichever is exhausted
/// first — used by callers that want to bound rehashing by wall-clock
/// time rather than bucket count.
pub(crate) fn rehash_timed<K, V, T: DictType<K, V>>(
    dict: &mut Dict<K, V, T>,
    budget: std::time::Duration,
) -> bool {
    if !dict.is_rehashing() {
        return false;
    }
    let start = std::time::Instant::now();
    loop {
        if !rehash_steps(dict, 16) {
            return false;
        }
        if start.elapsed() >= budget {
            return true;
        }
    }
}

fn finish_rehash<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>) {
    dict.tables[0] = std::mem::replace(&mut dict.tables[1], Table::absent());
    dict.rehash_idx = -1;
    dict.descriptor.rehash_completed();
}

fn migrate_bucket<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, idx: usize) {
    let shrinking = dict.tables[1].size() <= dict.tables[0].size();
    let slot = std::mem::take(&mut dict.tables[0].slots[idx]);
    match slot {
        Slot::Empty => {}
        Slot::Key(key) => {
            let new_idx = if shrinking {
                idx & dict.tables[1].mask()
            } else {
                let hash = dict.descriptor.hash(&key);
                crate::hashing::bucket_index(hash, dict.tables[1].mask())
            };
            splice_key_into(dict, new_idx, key);
            dict.tables[0].used -= 1;
            dict.tables[1].used += 1;
        }
        Slot::Chain(head) if shrinking => {
            let moved = chain_len(&head);
            let new_idx = idx & dict.tables[1].mask();
            splice_chain_into(dict, new_idx, head);
            dict.tables[0].used -= moved;
            dict.tables[1].used += moved;
        }
        Slot::Chain(head) => {
            let mut node_opt = Some(head);
            let mut moved = 0usize;
            while let Some(mut node) = node_opt {
                let next = node.take_next();
                let hash = node.rehash(&dict.descriptor);
                let new_idx = crate::hashing::bucket_index(hash, dict.tables[1].mask());
                splice_entry_into(dict, new_idx, node);
                moved += 1;
                node_opt = next;
            }
            dict.tables[0].used -= moved;
            dict.tables[1].used += moved;
        }
    }
}

fn chain_len<K, V>(entry: &Entry<K, V>) -> usize {
    let mut count = 1;
    let mut current = match entry {
        Entry::Normal { next, .. } => next.as_deref(),
        Entry::NoValue { next, .. } => next.as_deref(),
        Entry::Embedded { next, .. } => next.as_deref(),
    };
    while let Some(node) = current {
        count += 1;
        current = match node {
            Entry::Normal { next, .. } => next.as_deref(),
            Entry::NoValue { next, .. } => next.as_deref(),
            Entry::Embedded { next, .. } => next.as_deref(),
        };
    }
    count
}

fn existing_as_link<K, V>(slot: Slot<K, V>) -> Option<Box<Entry<K, V>>> {
    match slot {
        Slot::Empty => None,
        Slot::Key(key) => Some(Box::new(Entry::NoValue { key, next: None })),
        Slot::Chain(entry) => Some(entry),
    }
}

fn splice_key_into<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, idx: usize, key: K) {
    let existing = std::mem::take(&mut dict.tables[1].slots[idx]);
    let new_slot = match existing {
        Slot::Empty => Slot::Key(key),
        other => Slot::Chain(Box::new(Entry::NoValue {
            key,
            next: existing_as_link(other),
        })),
    };
    dict.tables[1].slots[idx] = new_slot;
}

fn splice_chain_into<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, idx: usize, mut head: Box<Entry<K, V>>) {
    // A lone node goes through `splice_entry_into`, which is the one place
    // that knows how to collapse a `no_value`+`keys_are_odd` entry back
    // into a bare `Slot::Key` when it lands alone in an empty bucket.
    if head.next_mut().is_none() {
        splice_entry_into(dict, idx, head);
        return;
    }
    let existing = std::mem::take(&mut dict.tables[1].slots[idx]);
    let tail_next = existing_as_link(existing);
    let mut cursor: *mut Entry<K, V> = head.as_mut();
    // SAFETY: walks the freshly-taken chain we exclusively own; each
    // iteration re-borrows exactly once and never aliases `cursor`.
    unsafe {
        while (*cursor).next_mut().is_some() {
            cursor = (*cursor).next_mut().as_mut().unwrap().as_mut();
        }
        *(*cursor).next_mut() = tail_next;
    }
    dict.tables[1].slots[idx] = Slot::Chain(head);
}

fn splice_entry_into<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, idx: usize, mut node: Box<Entry<K, V>>) {
    let existing = std::mem::take(&mut dict.tables[1].slots[idx]);
    if matches!(existing, Slot::Empty) {
        let flags = dict.descriptor.flags();
        let collapsible = flags.no_value
            && flags.keys_are_odd
            && matches!(node.as_ref(), Entry::NoValue { next: None, .. });
        if collapsible {
            let key = match *node {
                Entry::NoValue { key, .. } => key,
                _ => unreachable!("collapsible checked above"),
            };
            dict.tables[1].slots[idx] = Slot::Key(key);
            return;
        }
    }
    node.set_next(existing_as_link(existing));
    dict.tables[1].slots[idx] = Slot::Chain(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DictType;

    struct U64Dict;
    impl DictType<u64, u64> for U64Dict {
        fn hash(&self, key: &u64) -> u64 {
            crate::hashing::fxhash_bytes(&key.to_le_bytes())
        }
        fn key_eq(&self, a: &u64, b: &u64) -> bool {
            a == b
        }
    }

    #[test]
    fn growth_redistributes_a_full_bucket() {
        let mut dict: Dict<u64, u64, U64Dict> = Dict::new(U64Dict);
        for i in 0..64u64 {
            dict.add(i, crate::value::EntryValue::U64(i)).unwrap();
        }
        assert!(!dict.is_rehashing());
        assert_eq!(dict.len(), 64);
        for i in 0..64u64 {
            assert_eq!(dict.get(&i).map(|v| v.as_u64()), Some(i));
        }
    }

    #[test]
    fn shrink_reuses_bucket_index_without_recomputing_hash() {
        let mut dict: Dict<u64, u64, U64Dict> = Dict::new(U64Dict);
        for i in 0..64u64 {
            dict.add(i, crate::value::EntryValue::U64(i)).unwrap();
        }
        for i in 0..60u64 {
            dict.delete(&i);
        }
        // Drive any pending incremental rehash (from deletes' maybe_shrink)
        // to completion so the post-shrink layout is observable.
        rehash_all(&mut dict);
        assert_eq!(dict.len(), 4);
        for i in 60..64u64 {
            assert_eq!(dict.get(&i).map(|v| v.as_u64()), Some(i));
        }
    }
}
