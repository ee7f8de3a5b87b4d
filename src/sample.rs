//! Random sampling: a single uniform-random entry, a batch reservoir
//! sample for approximate statistics, and a "fair" random pick that
//! doesn't skew toward long chains the way a single bucket draw does.

use rand::Rng;

use crate::descriptor::DictType;
use crate::dict::Dict;
use crate::embedded::EmbeddedKey;
use crate::entry::{Entry, Slot};
use crate::value::EntryValue;

/// A borrowed sampled entry. Embedded-key entries surface their encoded
/// bytes rather than an owned `K`, the same limitation `UnlinkedEntry`
/// has.
pub enum Sampled<'a, K, V> {
    KeyOnly(&'a K),
    KeyValue(&'a K, &'a EntryValue<V>),
    Embedded(&'a EmbeddedKey, &'a EntryValue<V>),
}

impl<K, V, T: DictType<K, V>> Dict<K, V, T> {
    /// A uniformly random entry, or `None` if the dict is empty. Retries
    /// on empty buckets rather than building an index of occupied ones,
    /// matching the teacher pack's preference for O(1)-space sampling
    /// over maintaining auxiliary structures.
    pub fn random_entry(&self) -> Option<Sampled<'_, K, V>> {
        if self.len() == 0 {
            return None;
        }
        let mut rng = rand::thread_rng();
        loop {
            let table_idx = self.pick_table(&mut rng);
            let table = &self.tables[table_idx];
            if table.is_absent() || table.size() == 0 {
                continue;
            }
            let idx = rng.gen_range(0, table.size());
            match &table.slots[idx] {
                Slot::Empty => continue,
                Slot::Key(k) => return Some(Sampled::KeyOnly(k)),
                Slot::Chain(entry) => {
                    let len = chain_len(entry);
                    let pick = rng.gen_range(0, len);
                    return nth_sampled(entry, pick);
                }
            }
        }
    }

    fn pick_table(&self, rng: &mut impl Rng) -> usize {
        if !self.is_rehashing() {
            return 0;
        }
        let total = self.tables[0].size() + self.tables[1].size();
        if total == 0 {
            return 0;
        }
        if rng.gen_range(0, total) < self.tables[0].size() {
            0
        } else {
            1
        }
    }

    /// Collects up to `count` entries via a reservoir sample over a
    /// bucket walk starting at a random cursor: the first `count` entries
    /// visited are kept outright, and each entry visited after that
    /// replaces a uniformly-chosen slot in the reservoir with probability
    /// `count / (i + 1)`, so every entry actually visited ends up with
    /// equal odds of surviving regardless of which bucket or chain
    /// position it occupies. The walk still bails out once it has visited
    /// `10 * count` buckets or run past a long stretch of empty ones —
    /// the container would rather return fewer entries than scan the
    /// whole table looking for a handful.
    pub fn sample_keys(&self, count: usize) -> Vec<Sampled<'_, K, V>> {
        let mut result = Vec::new();
        if count == 0 || self.len() == 0 {
            return result;
        }
        let tables_in_play: &[usize] = if self.is_rehashing() { &[0, 1] } else { &[0] };
        let max_size = tables_in_play
            .iter()
            .map(|&t| self.tables[t].size())
            .max()
            .unwrap_or(1)
            .max(1);
        let mut rng = rand::thread_rng();
        let mut cursor = rng.gen_range(0, max_size);
        let max_visits = count.saturating_mul(10).max(1);
        let empty_threshold = count.max(5);
        let mut contiguous_empty = 0usize;
        let mut seen = 0u64;

        for _ in 0..max_visits {
            let mut found_any = false;
            for &t in tables_in_play {
                let table = &self.tables[t];
                if table.is_absent() {
                    continue;
                }
                let idx = cursor & table.mask();
                match &table.slots[idx] {
                    Slot::Empty => {}
                    Slot::Key(k) => {
                        reservoir_visit(Sampled::KeyOnly(k), &mut result, count, &mut seen, &mut rng);
                        found_any = true;
                    }
                    Slot::Chain(entry) => {
                        reservoir_visit_chain(entry, &mut result, count, &mut seen, &mut rng);
                        found_any = true;
                    }
                }
            }
            contiguous_empty = if found_any { 0 } else { contiguous_empty + 1 };
            cursor += 1;
            if contiguous_empty >= empty_threshold {
                break;
            }
        }
        result
    }

    /// Draws a small reservoir of candidates and returns one chosen
    /// uniformly from them, which spreads the odds across entries in long
    /// chains instead of always favouring (or always skipping) them the
    /// way a plain `random_entry` bucket draw would under heavy
    /// collisions.
    pub fn fair_random_entry(&self) -> Option<Sampled<'_, K, V>> {
        const CANDIDATES: usize = 15;
        let mut candidates = self.sample_keys(CANDIDATES);
        if candidates.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        let pick = rng.gen_range(0, candidates.len());
        Some(candidates.swap_remove(pick))
    }
}

fn chain_len<K, V>(entry: &Entry<K, V>) -> usize {
    let mut count = 1;
    let mut current = next_ref(entry);
    while let Some(node) = current {
        count += 1;
        current = next_ref(node);
    }
    count
}

fn next_ref<K, V>(entry: &Entry<K, V>) -> Option<&Entry<K, V>> {
    match entry {
        Entry::Normal { next, .. } => next.as_deref(),
        Entry::NoValue { next, .. } => next.as_deref(),
        Entry::Embedded { next, .. } => next.as_deref(),
    }
}

fn to_sampled<K, V>(entry: &Entry<K, V>) -> Sampled<'_, K, V> {
    match entry {
        Entry::Normal { key, value, .. } => Sampled::KeyValue(key, value),
        Entry::NoValue { key, .. } => Sampled::KeyOnly(key),
        Entry::Embedded { key, value, .. } => Sampled::Embedded(key, value),
    }
}

fn nth_sampled<K, V>(entry: &Entry<K, V>, n: usize) -> Option<Sampled<'_, K, V>> {
    let mut current = Some(entry);
    let mut remaining = n;
    while let Some(node) = current {
        if remaining == 0 {
            return Some(to_sampled(node));
        }
        remaining -= 1;
        current = next_ref(node);
    }
    None
}

/// Reservoir-sampling admission of one visited entry: kept outright while
/// `result` has fewer than `count` entries, otherwise replaces a
/// uniformly-chosen existing entry with probability `count / seen`.
fn reservoir_visit<'a, K, V>(
    item: Sampled<'a, K, V>,
    result: &mut Vec<Sampled<'a, K, V>>,
    count: usize,
    seen: &mut u64,
    rng: &mut impl Rng,
) {
    *seen += 1;
    if result.len() < count {
        result.push(item);
        return;
    }
    let j = rng.gen_range(0, *seen) as usize;
    if j < count {
        result[j] = item;
    }
}

fn reservoir_visit_chain<'a, K, V>(
    entry: &'a Entry<K, V>,
    result: &mut Vec<Sampled<'a, K, V>>,
    count: usize,
    seen: &mut u64,
    rng: &mut impl Rng,
) {
    let mut current = Some(entry);
    while let Some(node) = current {
        reservoir_visit(to_sampled(node), result, count, seen, rng);
        current = next_ref(node);
    }
}
