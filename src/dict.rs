//! The main container: two bucket arrays, a descriptor, and the
//! bookkeeping needed to migrate between them a little at a time.

use crate::descriptor::DictType;
use crate::entry::{Entry, Link, Slot};
use crate::error::{DictError, Result};
use crate::resize::{exponent_for, resize_state, ResizeOutcome, ResizeState, FORCE_RATIO, MIN_FILL};
use crate::table::Table;
use crate::value::EntryValue;

/// An in-memory key/value container. `K` and `V` are whatever the
/// descriptor `T` says they are; `Dict` itself never compares, hashes, or
/// drops them except through `T`'s callbacks.
pub struct Dict<K, V, T: DictType<K, V>> {
    pub(crate) descriptor: T,
    pub(crate) tables: [Table<K, V>; 2],
    /// Index of the next bucket to migrate, or `-1` when not rehashing.
    pub(crate) rehash_idx: i64,
    /// Nonzero while a live iterator or two-phase unlink holds rehashing
    /// paused.
    pub(crate) pause_rehash: u16,
    /// Nonzero while automatic expand/shrink is suppressed (distinct from
    /// the process-wide [`ResizeState`], which callers rarely toggle
    /// mid-traversal).
    pub(crate) pause_auto_resize: u16,
    metadata: Vec<u8>,
}

/// Snapshot of in-progress migration state, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RehashingInfo {
    pub in_progress: bool,
    pub from_exponent: u32,
    pub to_exponent: u32,
    pub cursor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

/// An entry removed from its table but not yet destroyed — the result of
/// [`Dict::unlink`] and the handle [`TwoPhaseUnlink`] wraps.
pub enum UnlinkedEntry<K, V> {
    Boxed(Box<Entry<K, V>>),
    BareKey(K),
}

impl<K, V> UnlinkedEntry<K, V> {
    /// The removed key, when this entry owns one directly. Embedded-key
    /// entries hold only the encoded bytes, not an owned `K`, and return
    /// `None` here — callers that need the key already have it, since they
    /// passed it in to find the entry in the first place.
    pub fn key(&self) -> Option<&K> {
        match self {
            UnlinkedEntry::Boxed(entry) => match entry.as_ref() {
                Entry::Normal { key, .. } => Some(key),
                Entry::NoValue { key, .. } => Some(key),
                Entry::Embedded { .. } => None,
            },
            UnlinkedEntry::BareKey(key) => Some(key),
        }
    }

    pub fn value(&self) -> Option<&EntryValue<V>> {
        match self {
            UnlinkedEntry::Boxed(entry) => entry.value(),
            UnlinkedEntry::BareKey(_) => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut EntryValue<V>> {
        match self {
            UnlinkedEntry::Boxed(entry) => entry.value_mut(),
            UnlinkedEntry::BareKey(_) => None,
        }
    }
}

/// RAII handle for the two-call unlink/free protocol (spec §6): finding the
/// entry pauses rehashing until either [`TwoPhaseUnlink::free`] is called or
/// the handle is dropped.
pub struct TwoPhaseUnlink<'a, K, V, T: DictType<K, V>> {
    dict: &'a mut Dict<K, V, T>,
    entry: Option<UnlinkedEntry<K, V>>,
}

impl<'a, K, V, T: DictType<K, V>> TwoPhaseUnlink<'a, K, V, T> {
    pub fn entry(&self) -> Option<&UnlinkedEntry<K, V>> {
        self.entry.as_ref()
    }

    pub fn entry_mut(&mut self) -> Option<&mut UnlinkedEntry<K, V>> {
        self.entry.as_mut()
    }

    pub fn is_found(&self) -> bool {
        self.entry.is_some()
    }

    /// Completes the removal: drops the entry (firing `destroy_key` /
    /// `destroy_value`) and resumes rehashing.
    pub fn free(mut self) {
        if let Some(entry) = self.entry.take() {
            destroy_unlinked(self.dict, entry);
        }
    }
}

impl<'a, K, V, T: DictType<K, V>> Drop for TwoPhaseUnlink<'a, K, V, T> {
    fn drop(&mut self) {
        if self.entry.is_some() {
            self.dict.pause_rehash = self.dict.pause_rehash.saturating_sub(1);
        }
    }
}

fn destroy_unlinked<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, entry: UnlinkedEntry<K, V>) {
    match entry {
        UnlinkedEntry::Boxed(boxed) => {
            let (key, value) = boxed.into_key_value();
            if let Some(k) = &key {
                dict.descriptor.destroy_key(k);
            }
            if let Some(v) = value.as_ref().and_then(|v| v.as_ptr_checked()) {
                dict.descriptor.destroy_value(v);
            }
        }
        UnlinkedEntry::BareKey(key) => {
            dict.descriptor.destroy_key(&key);
        }
    }
    dict.pause_rehash = dict.pause_rehash.saturating_sub(1);
}

impl<V> EntryValue<V> {
    /// Non-panicking peek used only by destructor bookkeeping, which must
    /// not assume every entry carries a `Ptr` value.
    pub(crate) fn as_ptr_checked(&self) -> Option<&V> {
        match self {
            EntryValue::Ptr(v) => Some(v),
            _ => None,
        }
    }
}

impl<K, V, T: DictType<K, V>> Dict<K, V, T> {
    pub fn new(descriptor: T) -> Self {
        descriptor.flags().validate();
        let metadata = vec![0u8; descriptor.metadata_bytes()];
        Dict {
            descriptor,
            tables: [Table::absent(), Table::absent()],
            rehash_idx: -1,
            pause_rehash: 0,
            pause_auto_resize: 0,
            metadata,
        }
    }

    /// Builds a `Dict` whose first table is already sized to hold
    /// `capacity` entries without an initial expand.
    pub fn with_capacity(descriptor: T, capacity: usize) -> Result<Self> {
        let mut dict = Dict::new(descriptor);
        if capacity > 0 {
            let exponent = exponent_for(capacity).ok_or(DictError::ResizeOverflow {
                requested: capacity,
            })?;
            dict.tables[0] = Table::try_with_exponent(exponent)?;
        }
        Ok(dict)
    }

    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx >= 0
    }

    pub fn len(&self) -> usize {
        self.tables[0].used + self.tables[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn buckets(&self) -> usize {
        self.tables[0].size() + if self.is_rehashing() { self.tables[1].size() } else { 0 }
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut [u8] {
        &mut self.metadata
    }

    pub fn descriptor(&self) -> &T {
        &self.descriptor
    }

    /// A value that changes whenever the table layout changes (resize,
    /// rehash progress) but not when entry contents change in place.
    /// Unsafe iterators snapshot this on first use and abort the process
    /// if it differs on release (spec §6): any resize or rehash step while
    /// the iterator is alive invalidates bucket indices it may have
    /// cached.
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = fxhash::FxHasher::default();
        for table in &self.tables {
            (table.slots.as_ptr() as usize).hash(&mut hasher);
            table.exponent.hash(&mut hasher);
            table.used.hash(&mut hasher);
        }
        hasher.finish()
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.tables[0].is_absent() {
            self.tables[0] = Table::try_with_exponent(crate::resize::INITIAL_EXPONENT)?;
        }
        Ok(())
    }

    /// Opportunistically migrates a little of any in-progress rehash.
    /// Called at the top of every mutating and lookup operation, the way
    /// the teacher's own amortized-work callers expect to pay a bounded
    /// cost per call rather than stall on a resize.
    fn rehash_step_if_due(&mut self) {
        if self.pause_rehash == 0 && crate::hint::unlikely(self.is_rehashing()) {
            crate::rehash::rehash_steps(self, 1);
        }
    }

    fn bucket_index(&self, table_idx: usize, hash: u64) -> usize {
        crate::hashing::bucket_index(hash, self.tables[table_idx].mask())
    }

    /// Looks up `key`, checking `T[0]` then (if rehashing) `T[1]`.
    pub fn get(&self, key: &K) -> Option<&EntryValue<V>> {
        if self.tables[0].is_absent() {
            return None;
        }
        let hash = self.descriptor.hash(key);
        for table_idx in self.search_order() {
            if self.tables[table_idx].is_absent() {
                continue;
            }
            let idx = self.bucket_index(table_idx, hash);
            match &self.tables[table_idx].slots[idx] {
                Slot::Empty => continue,
                Slot::Key(_) => continue,
                Slot::Chain(entry) => {
                    if let Some(found) = find_in_chain(entry, &self.descriptor, key) {
                        return found.value();
                    }
                }
            }
        }
        None
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut EntryValue<V>> {
        self.rehash_step_if_due();
        if self.tables[0].is_absent() {
            return None;
        }
        let hash = self.descriptor.hash(key);
        let descriptor = &self.descriptor;
        for table_idx in search_order(self.rehash_idx) {
            let table = &mut self.tables[table_idx];
            if table.is_absent() {
                continue;
            }
            let idx = crate::hashing::bucket_index(hash, table.mask());
            if let Slot::Chain(entry) = &mut table.slots[idx] {
                if let Some(found) = find_in_chain_mut(entry, descriptor, key) {
                    return found.value_mut();
                }
            }
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        if self.tables[0].is_absent() {
            return false;
        }
        let hash = self.descriptor.hash(key);
        for table_idx in self.search_order() {
            if self.tables[table_idx].is_absent() {
                continue;
            }
            let idx = self.bucket_index(table_idx, hash);
            match &self.tables[table_idx].slots[idx] {
                Slot::Empty => continue,
                Slot::Key(k) => {
                    if self.descriptor.key_eq(k, key) {
                        return true;
                    }
                }
                Slot::Chain(entry) => {
                    if find_in_chain(entry, &self.descriptor, key).is_some() {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn search_order(&self) -> [usize; 2] {
        search_order(self.rehash_idx)
    }

    /// Inserts `key`/`value`, failing (without overwriting) if the key is
    /// already present.
    pub fn add(&mut self, key: K, value: EntryValue<V>) -> Result<InsertOutcome> {
        match self.add_or_find_position(&key)? {
            Ok(_) => Ok(InsertOutcome::AlreadyPresent),
            Err((table_idx, idx)) => {
                self.insert_new(table_idx, idx, key, value);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    /// Inserts a `no_value` key, or no-ops if already present.
    pub fn add_key_only(&mut self, key: K) -> Result<InsertOutcome> {
        match self.add_or_find_position(&key)? {
            Ok(_) => Ok(InsertOutcome::AlreadyPresent),
            Err((table_idx, idx)) => {
                self.insert_new_key_only(table_idx, idx, key);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    /// Inserts or overwrites: on collision, the old value is replaced (and
    /// its destructor hook fired) rather than leaving the key untouched.
    pub fn replace(&mut self, key: K, value: EntryValue<V>) -> Result<()> {
        self.rehash_step_if_due();
        self.ensure_initialized()?;
        self.maybe_expand()?;
        let hash = self.descriptor.hash(&key);
        for table_idx in self.search_order() {
            if self.tables[table_idx].is_absent() {
                continue;
            }
            let idx = self.bucket_index(table_idx, hash);
            let descriptor = &self.descriptor;
            if let Slot::Chain(entry) = &mut self.tables[table_idx].slots[idx] {
                if let Some(found) = find_in_chain_mut(entry, descriptor, &key) {
                    if let Some(old) = found.value_mut() {
                        let replaced = std::mem::replace(old, value);
                        if let Some(v) = replaced.as_ptr_checked() {
                            self.descriptor.destroy_value(v);
                        }
                    }
                    return Ok(());
                }
            }
        }
        let table_idx = self.insertion_table();
        let idx = self.bucket_index(table_idx, hash);
        self.insert_new(table_idx, idx, key, value);
        Ok(())
    }

    /// Finds `key`, inserting an absent entry with `default` if missing,
    /// and returns whether it was freshly created.
    pub fn add_or_find(&mut self, key: K, default: impl FnOnce() -> EntryValue<V>) -> Result<InsertOutcome> {
        match self.add_or_find_position(&key)? {
            Ok(_) => Ok(InsertOutcome::AlreadyPresent),
            Err((table_idx, idx)) => {
                self.insert_new(table_idx, idx, key, default());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    /// Inserts a key cloned via [`DictType::dup_key`] rather than taking
    /// ownership of a borrowed one. Panics if the descriptor does not
    /// implement `dup_key` — a programmer error, the same family as
    /// calling an unsupported entry-variant operation.
    pub fn add_raw(&mut self, key: &K, value: EntryValue<V>) -> Result<InsertOutcome> {
        let owned = self
            .descriptor
            .dup_key(key)
            .expect("add_raw requires DictType::dup_key to be implemented");
        self.add(owned, value)
    }

    /// Returns `Ok(())` (existing bucket index) if `key` is already
    /// present, or `Err((table, bucket))` naming where a fresh entry
    /// belongs.
    fn add_or_find_position(&mut self, key: &K) -> Result<std::result::Result<(), (usize, usize)>> {
        self.rehash_step_if_due();
        self.ensure_initialized()?;
        self.maybe_expand()?;
        if self.contains_key(key) {
            return Ok(Ok(()));
        }
        let hash = self.descriptor.hash(key);
        let table_idx = self.insertion_table();
        let idx = self.bucket_index(table_idx, hash);
        Ok(Err((table_idx, idx)))
    }

    fn insertion_table(&self) -> usize {
        if self.is_rehashing() {
            1
        } else {
            0
        }
    }

    fn insert_new(&mut self, table_idx: usize, idx: usize, key: K, value: EntryValue<V>) {
        let slot = std::mem::take(&mut self.tables[table_idx].slots[idx]);
        let next: Link<K, V> = match slot {
            Slot::Empty => None,
            Slot::Key(existing_key) => Some(Box::new(Entry::NoValue {
                key: existing_key,
                next: None,
            })),
            Slot::Chain(entry) => Some(entry),
        };
        let new_entry = if let Some(embedded) = self.embed_if_requested(&key) {
            Entry::Embedded {
                key: embedded,
                value,
                next,
            }
        } else {
            Entry::Normal { key, value, next }
        };
        self.tables[table_idx].slots[idx] = Slot::Chain(Box::new(new_entry));
        self.tables[table_idx].used += 1;
    }

    fn insert_new_key_only(&mut self, table_idx: usize, idx: usize, key: K) {
        let slot = std::mem::take(&mut self.tables[table_idx].slots[idx]);
        match slot {
            Slot::Empty if self.descriptor.flags().keys_are_odd => {
                self.tables[table_idx].slots[idx] = Slot::Key(key);
            }
            Slot::Empty => {
                self.tables[table_idx].slots[idx] = Slot::Chain(Box::new(Entry::NoValue { key, next: None }));
            }
            Slot::Key(existing_key) => {
                self.tables[table_idx].slots[idx] = Slot::Chain(Box::new(Entry::NoValue {
                    key,
                    next: Some(Box::new(Entry::NoValue {
                        key: existing_key,
                        next: None,
                    })),
                }));
            }
            Slot::Chain(entry) => {
                self.tables[table_idx].slots[idx] = Slot::Chain(Box::new(Entry::NoValue {
                    key,
                    next: Some(entry),
                }));
            }
        }
        self.tables[table_idx].used += 1;
    }

    fn embed_if_requested(&self, key: &K) -> Option<crate::embedded::EmbeddedKey> {
        if self.descriptor.flags().embedded_entry {
            self.descriptor.embed_key(key)
        } else {
            None
        }
    }

    /// Removes `key`, firing `destroy_key`/`destroy_value` immediately.
    pub fn delete(&mut self, key: &K) -> DeleteOutcome {
        match self.unlink(key) {
            Some(unlinked) => {
                destroy_unlinked(self, unlinked);
                DeleteOutcome::Deleted
            }
            None => DeleteOutcome::Absent,
        }
    }

    /// Removes `key` from its table without destroying it, returning the
    /// detached entry and pausing rehashing until [`Dict::free_unlinked`]
    /// (or the found entry's drop inside [`TwoPhaseUnlink`]) resumes it.
    pub fn unlink(&mut self, key: &K) -> Option<UnlinkedEntry<K, V>> {
        self.rehash_step_if_due();
        if self.tables[0].is_absent() {
            return None;
        }
        let hash = self.descriptor.hash(key);
        for table_idx in self.search_order() {
            if self.tables[table_idx].is_absent() {
                continue;
            }
            let idx = self.bucket_index(table_idx, hash);
            if let Some(unlinked) = remove_from_bucket(&mut self.tables[table_idx].slots[idx], &self.descriptor, key) {
                self.tables[table_idx].used -= 1;
                self.maybe_shrink();
                self.pause_rehash += 1;
                return Some(unlinked);
            }
        }
        None
    }

    /// Completes removal of an entry returned by [`Dict::unlink`]: fires
    /// the destructor hooks and resumes rehashing.
    pub fn free_unlinked(&mut self, entry: UnlinkedEntry<K, V>) {
        destroy_unlinked(self, entry);
    }

    /// Begins the two-phase unlink protocol: locates `key`, removes it
    /// from the table, and pauses rehashing until the returned handle is
    /// freed or dropped.
    pub fn two_phase_unlink(&mut self, key: &K) -> TwoPhaseUnlink<'_, K, V, T> {
        let found = self.unlink(key);
        TwoPhaseUnlink {
            dict: self,
            entry: found,
        }
    }

    pub fn set_value_ptr(&mut self, key: &K, value: V) -> bool {
        match self.get_mut(key) {
            Some(slot) => {
                *slot = EntryValue::Ptr(value);
                true
            }
            None => false,
        }
    }

    pub fn set_value_i64(&mut self, key: &K, value: i64) -> bool {
        self.set_numeric(key, EntryValue::I64(value))
    }

    pub fn set_value_u64(&mut self, key: &K, value: u64) -> bool {
        self.set_numeric(key, EntryValue::U64(value))
    }

    pub fn set_value_f64(&mut self, key: &K, value: f64) -> bool {
        self.set_numeric(key, EntryValue::F64(value))
    }

    fn set_numeric(&mut self, key: &K, value: EntryValue<V>) -> bool {
        match self.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn increment_value_i64(&mut self, key: &K, by: i64) -> Option<i64> {
        self.get_mut(key).map(|v| v.increment_i64(by))
    }

    pub fn increment_value_u64(&mut self, key: &K, by: u64) -> Option<u64> {
        self.get_mut(key).map(|v| v.increment_u64(by))
    }

    pub fn increment_value_f64(&mut self, key: &K, by: f64) -> Option<f64> {
        self.get_mut(key).map(|v| v.increment_f64(by))
    }

    /// Drops every entry and returns both tables to their unallocated
    /// state, firing `destroy_key`/`destroy_value` for everything removed.
    pub fn clear(&mut self) {
        for table in &mut self.tables {
            for slot in table.slots.drain(..) {
                destroy_slot(&self.descriptor, slot);
            }
            *table = Table::absent();
        }
        self.rehash_idx = -1;
    }

    fn maybe_expand(&mut self) -> Result<()> {
        if self.pause_auto_resize > 0 || self.is_rehashing() {
            return Ok(());
        }
        if resize_state() == ResizeState::Forbid {
            return Ok(());
        }
        let (is_absent, used, size) = {
            let table = &self.tables[0];
            (table.is_absent(), table.used, table.size())
        };
        if is_absent {
            return Ok(());
        }
        let load_factor_one = used >= size;
        let over_forced_ratio = used >= size * FORCE_RATIO;
        let should_expand = match resize_state() {
            ResizeState::Enabled => load_factor_one,
            ResizeState::Avoid => over_forced_ratio,
            ResizeState::Forbid => false,
        };
        if should_expand {
            let target = (used + 1).max(size * 2);
            self.try_expand(target)?;
        }
        Ok(())
    }

    fn maybe_shrink(&mut self) {
        if self.pause_auto_resize > 0 || self.is_rehashing() {
            return;
        }
        if resize_state() == ResizeState::Forbid {
            return;
        }
        let (is_absent, exponent, used, size) = {
            let table = &self.tables[0];
            (table.is_absent(), table.exponent, table.used, table.size())
        };
        if is_absent || exponent <= crate::resize::INITIAL_EXPONENT || used == 0 {
            return;
        }
        let under_min_fill = size / used >= MIN_FILL;
        let under_forced_ratio = size / used >= MIN_FILL * FORCE_RATIO;
        let should_shrink = match resize_state() {
            ResizeState::Enabled => under_min_fill,
            ResizeState::Avoid => under_forced_ratio,
            ResizeState::Forbid => false,
        };
        if should_shrink {
            let _ = self.try_shrink(used);
        }
    }

    /// Starts (or immediately completes, for `no_incremental_rehash`
    /// descriptors) a resize to fit at least `target` entries.
    pub fn try_expand(&mut self, target: usize) -> Result<ResizeOutcome> {
        self.start_resize(exponent_for(target).ok_or(DictError::ResizeOverflow { requested: target })?)
    }

    pub fn try_shrink(&mut self, target: usize) -> Result<ResizeOutcome> {
        self.start_resize(exponent_for(target).ok_or(DictError::ResizeOverflow { requested: target })?)
    }

    fn start_resize(&mut self, exponent: u32) -> Result<ResizeOutcome> {
        if self.is_rehashing() {
            return Ok(ResizeOutcome::NoOp);
        }
        self.ensure_initialized()?;
        if exponent == self.tables[0].exponent {
            return Ok(ResizeOutcome::NoOp);
        }
        let new_bytes = (1usize << exponent) * std::mem::size_of::<Slot<K, V>>();
        let fill_factor = self.tables[0].used as f64 / (1usize << exponent) as f64;
        if !self.descriptor.resize_allowed(new_bytes, fill_factor) {
            return Ok(ResizeOutcome::Vetoed);
        }
        self.tables[1] = Table::try_with_exponent(exponent)?;
        self.rehash_idx = 0;
        self.descriptor.rehash_started();
        if self.descriptor.flags().no_incremental_rehash {
            crate::rehash::rehash_all(self);
        }
        Ok(ResizeOutcome::Resized)
    }

    /// Migrates buckets for up to `micros` microseconds, or until the
    /// rehash completes, whichever comes first. Returns whether rehashing
    /// is still in progress afterward.
    pub fn rehash_for_micros(&mut self, micros: u64) -> bool {
        crate::rehash::rehash_timed(self, std::time::Duration::from_micros(micros))
    }

    pub fn rehashing_info(&self) -> RehashingInfo {
        RehashingInfo {
            in_progress: self.is_rehashing(),
            from_exponent: self.tables[0].exponent,
            to_exponent: self.tables[1].exponent,
            cursor: self.rehash_idx,
        }
    }
}

impl<K, V, T: DictType<K, V>> Drop for Dict<K, V, T> {
    fn drop(&mut self) {
        self.clear();
    }
}

pub(crate) fn search_order(rehash_idx: i64) -> [usize; 2] {
    if rehash_idx >= 0 {
        [0, 1]
    } else {
        [0, 0]
    }
}

fn find_in_chain<'a, K, V, T: DictType<K, V>>(
    entry: &'a Entry<K, V>,
    descriptor: &T,
    key: &K,
) -> Option<&'a Entry<K, V>> {
    let mut current = Some(entry);
    while let Some(e) = current {
        if e.key_matches(descriptor, key) {
            return Some(e);
        }
        current = match e {
            Entry::Normal { next, .. } => next.as_deref(),
            Entry::NoValue { next, .. } => next.as_deref(),
            Entry::Embedded { next, .. } => next.as_deref(),
        };
    }
    None
}

fn find_in_chain_mut<'a, K, V, T: DictType<K, V>>(
    entry: &'a mut Entry<K, V>,
    descriptor: &T,
    key: &K,
) -> Option<&'a mut Entry<K, V>> {
    let mut current: *mut Entry<K, V> = entry;
    loop {
        // SAFETY: `current` always points at a live node owned by the
        // chain we're walking; we never alias it mutably more than once
        // per iteration and never outlive the chain's own borrow.
        let node: &'a mut Entry<K, V> = unsafe { &mut *current };
        if node.key_matches(descriptor, key) {
            return Some(node);
        }
        match node.next_mut() {
            Some(boxed) => current = boxed.as_mut(),
            None => return None,
        }
    }
}

/// Removes the entry matching `key` from a single bucket slot, splicing
/// its chain neighbours together.
fn remove_from_bucket<K, V, T: DictType<K, V>>(
    slot: &mut Slot<K, V>,
    descriptor: &T,
    key: &K,
) -> Option<UnlinkedEntry<K, V>> {
    match slot {
        Slot::Empty => None,
        Slot::Key(k) => {
            if descriptor.key_eq(k, key) {
                let taken = std::mem::replace(slot, Slot::Empty);
                match taken {
                    Slot::Key(k) => Some(UnlinkedEntry::BareKey(k)),
                    _ => unreachable!(),
                }
            } else {
                None
            }
        }
        Slot::Chain(head) => {
            if head.key_matches(descriptor, key) {
                let mut head = match std::mem::replace(slot, Slot::Empty) {
                    Slot::Chain(h) => h,
                    _ => unreachable!(),
                };
                if let Some(next) = head.take_next() {
                    *slot = Slot::Chain(next);
                }
                return Some(UnlinkedEntry::Boxed(head));
            }
            let mut prev: &mut Entry<K, V> = head;
            loop {
                let found_next = match prev.next_mut() {
                    Some(next) if next.key_matches(descriptor, key) => true,
                    Some(_) => false,
                    None => return None,
                };
                if found_next {
                    let mut removed = prev.next_mut().take().unwrap();
                    *prev.next_mut() = removed.take_next();
                    return Some(UnlinkedEntry::Boxed(removed));
                }
                prev = prev.next_mut().as_mut().unwrap();
            }
        }
    }
}

fn destroy_slot<K, V, T: DictType<K, V>>(descriptor: &T, slot: Slot<K, V>) {
    match slot {
        Slot::Empty => {}
        Slot::Key(key) => descriptor.destroy_key(&key),
        Slot::Chain(mut entry) => loop {
            let next = entry.take_next();
            let (key, value) = entry.into_key_value();
            if let Some(k) = &key {
                descriptor.destroy_key(k);
            }
            if let Some(v) = value.as_ref().and_then(|v| v.as_ptr_checked()) {
                descriptor.destroy_value(v);
            }
            match next {
                Some(n) => entry = n,
                None => break,
            }
        },
    }
}
