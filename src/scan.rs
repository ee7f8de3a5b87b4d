//! Stateless full-table scanning via a reverse-bit cursor: the caller
//! holds nothing but the `u64` returned from the previous call, and the
//! container guarantees every key present for the whole scan is visited
//! at least once even if the table resizes mid-scan.
//!
//! The trick (unchanged from the dict this spec distills) is to increment
//! the cursor in reversed-bit order instead of normal integer order. A
//! reversed-bit increment of an `n`-bit cursor only ever touches the high
//! bits first, which means: after a growth, the new low bit the bigger
//! mask adds is the *last* thing a reversed increment starts flipping, so
//! every bucket that existed before the resize still gets a distinct
//! bucket after it. The same holds in the other direction for a shrink.

use crate::descriptor::DictType;
use crate::dict::Dict;
use crate::entry::{Entry, Slot};
use crate::value::EntryValue;

/// A borrowed scanned entry, handed to the scan callback.
pub enum Scanned<'a, K, V> {
    KeyOnly(&'a K),
    KeyValue(&'a K, &'a EntryValue<V>),
    Embedded(&'a crate::embedded::EmbeddedKey, &'a EntryValue<V>),
}

impl<K, V, T: DictType<K, V>> Dict<K, V, T> {
    /// Visits one bucket's worth of entries (more than one table's worth
    /// while rehashing, since both must be covered) and returns the
    /// cursor to pass to the next call. A returned cursor of `0` means the
    /// scan has covered the whole table.
    pub fn scan(&self, cursor: u64, mut visit: impl FnMut(Scanned<'_, K, V>)) -> u64 {
        if self.tables[0].is_absent() {
            return 0;
        }
        if !self.is_rehashing() {
            let mask = self.tables[0].mask() as u64;
            visit_bucket(&self.tables[0], cursor as usize & self.tables[0].mask(), &mut visit);
            return reverse_bit_increment(cursor, mask);
        }

        // While rehashing, the smaller table's mask is a subset of the
        // larger one's, so a single cursor value (interpreted against the
        // larger table) maps onto one-or-more buckets of the smaller one;
        // visit all of them to avoid skipping entries not yet migrated.
        let (small, large) = if self.tables[0].size() <= self.tables[1].size() {
            (&self.tables[0], &self.tables[1])
        } else {
            (&self.tables[1], &self.tables[0])
        };
        let small_mask = small.mask();
        visit_bucket(large, cursor as usize & large.mask(), &mut visit);
        let mut small_idx = cursor as usize & small_mask;
        loop {
            visit_bucket(small, small_idx, &mut visit);
            small_idx += small_mask + 1;
            if small_idx > large.mask() {
                break;
            }
        }
        // Advance by the smaller table's mask so the next call re-enters
        // cleanly regardless of which table ends up current once the
        // resize in progress completes.
        reverse_bit_increment(cursor, small_mask as u64)
    }
}

fn visit_bucket<K, V>(
    table: &crate::table::Table<K, V>,
    idx: usize,
    visit: &mut impl FnMut(Scanned<'_, K, V>),
) {
    if table.is_absent() || idx >= table.size() {
        return;
    }
    match &table.slots[idx] {
        Slot::Empty => {}
        Slot::Key(k) => visit(Scanned::KeyOnly(k)),
        Slot::Chain(entry) => {
            let mut current: Option<&Entry<K, V>> = Some(entry);
            while let Some(node) = current {
                let scanned = match node {
                    Entry::Normal { key, value, .. } => Scanned::KeyValue(key, value),
                    Entry::NoValue { key, .. } => Scanned::KeyOnly(key),
                    Entry::Embedded { key, value, .. } => Scanned::Embedded(key, value),
                };
                visit(scanned);
                current = match node {
                    Entry::Normal { next, .. } => next.as_deref(),
                    Entry::NoValue { next, .. } => next.as_deref(),
                    Entry::Embedded { next, .. } => next.as_deref(),
                };
            }
        }
    }
}

/// Increments `cursor` as if its bits (within `mask`'s width) were
/// reversed, then reverses them back.
fn reverse_bit_increment(cursor: u64, mask: u64) -> u64 {
    if mask == 0 {
        return 0;
    }
    let mut v = cursor | !mask;
    v = v.reverse_bits();
    v = v.wrapping_add(1);
    v.reverse_bits() & mask
}

#[cfg(test)]
mod tests {
    use super::reverse_bit_increment;

    #[test]
    fn covers_every_bucket_exactly_once_before_returning_zero() {
        let mask = 0b1111u64;
        let mut cursor = 0u64;
        let mut seen = std::collections::HashSet::new();
        loop {
            seen.insert(cursor);
            cursor = reverse_bit_increment(cursor, mask);
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), 16);
    }
}
