//! Live iteration over a `Dict` while mutation may be happening around it
//! (spec §6): a "safe" iterator that pauses rehashing for its lifetime,
//! and an "unsafe" one that doesn't, trading that pause for a fingerprint
//! check that aborts the process if the table shape changed anyway.

use crate::descriptor::DictType;
use crate::dict::Dict;
use crate::embedded::EmbeddedKey;
use crate::entry::Entry;
use crate::value::EntryValue;

/// One entry yielded by [`SafeIter`] or [`UnsafeIter`]. Borrowed from the
/// call to `next` that produced it — call `next` again (or let the
/// iterator drop) once done with it.
pub enum IterItem<'a, K, V> {
    KeyOnly(&'a K),
    KeyValue(&'a K, &'a mut EntryValue<V>),
    Embedded(&'a EmbeddedKey, &'a mut EntryValue<V>),
}

fn make_item<K, V>(node: &mut Entry<K, V>) -> IterItem<'_, K, V> {
    match node {
        Entry::Normal { key, value, .. } => IterItem::KeyValue(key, value),
        Entry::NoValue { key, .. } => IterItem::KeyOnly(key),
        Entry::Embedded { key, value, .. } => IterItem::Embedded(key, value),
    }
}

fn nth_mut<K, V>(entry: &mut Entry<K, V>, depth: usize) -> Option<&mut Entry<K, V>> {
    if depth == 0 {
        return Some(entry);
    }
    match entry.next_mut() {
        Some(next) => nth_mut(next.as_mut(), depth - 1),
        None => None,
    }
}

/// Shared bucket-walking state machine both iterators use.
struct Cursor {
    table_idx: usize,
    bucket_idx: usize,
    depth: usize,
    visit_table1: bool,
}

impl Cursor {
    fn new(visit_table1: bool) -> Self {
        Cursor {
            table_idx: 0,
            bucket_idx: 0,
            depth: 0,
            visit_table1,
        }
    }

    fn advance<'d, K, V, T: DictType<K, V>>(&mut self, dict: &'d mut Dict<K, V, T>) -> Option<IterItem<'d, K, V>> {
        loop {
            if self.table_idx > 1 || (self.table_idx == 1 && !self.visit_table1) {
                return None;
            }
            let table = &mut dict.tables[self.table_idx];
            if table.is_absent() || self.bucket_idx >= table.size() {
                self.table_idx += 1;
                self.bucket_idx = 0;
                self.depth = 0;
                continue;
            }
            match &mut table.slots[self.bucket_idx] {
                crate::entry::Slot::Empty => {
                    self.bucket_idx += 1;
                    self.depth = 0;
                    continue;
                }
                crate::entry::Slot::Key(k) => {
                    if self.depth == 0 {
                        self.depth += 1;
                        return Some(IterItem::KeyOnly(k));
                    }
                    self.bucket_idx += 1;
                    self.depth = 0;
                    continue;
                }
                crate::entry::Slot::Chain(entry) => {
                    let depth = self.depth;
                    match nth_mut(entry.as_mut(), depth) {
                        Some(node) => {
                            self.depth += 1;
                            return Some(make_item(node));
                        }
                        None => {
                            self.bucket_idx += 1;
                            self.depth = 0;
                            continue;
                        }
                    }
                }
            }
        }
    }
}

/// Pauses rehashing for as long as it's alive, so bucket indices it's
/// holding internally stay valid without a fingerprint check.
pub struct SafeIter<'a, K, V, T: DictType<K, V>> {
    dict: &'a mut Dict<K, V, T>,
    cursor: Cursor,
}

impl<'a, K, V, T: DictType<K, V>> SafeIter<'a, K, V, T> {
    pub(crate) fn new(dict: &'a mut Dict<K, V, T>) -> Self {
        dict.pause_rehash += 1;
        let visit_table1 = dict.is_rehashing();
        SafeIter {
            dict,
            cursor: Cursor::new(visit_table1),
        }
    }

    pub fn next(&mut self) -> Option<IterItem<'_, K, V>> {
        self.cursor.advance(&mut *self.dict)
    }
}

impl<'a, K, V, T: DictType<K, V>> Drop for SafeIter<'a, K, V, T> {
    fn drop(&mut self) {
        self.dict.pause_rehash = self.dict.pause_rehash.saturating_sub(1);
    }
}

/// Does not pause rehashing. Checks [`Dict::fingerprint`] against the
/// value captured on its first `next()` call when it drops, and aborts
/// the process on a mismatch rather than let the caller silently read
/// through entries that moved mid-iteration — the same trust-but-verify
/// contract the spec's "unsafe iterator" gives: fast, but only correct if
/// the caller keeps its promise not to resize/rehash the dict while
/// holding one.
pub struct UnsafeIter<'a, K, V, T: DictType<K, V>> {
    dict: &'a mut Dict<K, V, T>,
    cursor: Cursor,
    fingerprint: Option<u64>,
}

impl<'a, K, V, T: DictType<K, V>> UnsafeIter<'a, K, V, T> {
    pub(crate) fn new(dict: &'a mut Dict<K, V, T>) -> Self {
        let visit_table1 = dict.is_rehashing();
        UnsafeIter {
            dict,
            cursor: Cursor::new(visit_table1),
            fingerprint: None,
        }
    }

    pub fn next(&mut self) -> Option<IterItem<'_, K, V>> {
        if self.fingerprint.is_none() {
            self.fingerprint = Some(self.dict.fingerprint());
        }
        self.cursor.advance(&mut *self.dict)
    }
}

impl<'a, K, V, T: DictType<K, V>> Drop for UnsafeIter<'a, K, V, T> {
    fn drop(&mut self) {
        if let Some(expected) = self.fingerprint {
            if expected != self.dict.fingerprint() {
                log::error!(
                    "dict mutated while an unsafe iterator was alive; aborting process per contract"
                );
                std::process::abort();
            }
        }
    }
}

impl<K, V, T: DictType<K, V>> Dict<K, V, T> {
    /// A live iterator that pauses this dict's rehashing for as long as
    /// it's alive.
    pub fn iter_safe(&mut self) -> SafeIter<'_, K, V, T> {
        SafeIter::new(self)
    }

    /// A live iterator that does not pause rehashing and aborts the
    /// process if the dict is resized or rehashed while it's alive.
    pub fn iter_unsafe(&mut self) -> UnsafeIter<'_, K, V, T> {
        UnsafeIter::new(self)
    }
}
