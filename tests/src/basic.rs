use std::cell::Cell;
use std::collections::HashSet;

use rehashdict::{Dict, DictFlags, DictType, EntryValue, InsertOutcome, ResizeState};

/// A descriptor over `String` keys and `u64` values, counting how many
/// times each destructor hook fires so tests can assert on them.
#[derive(Default)]
struct StringKeys {
    keys_destroyed: Cell<usize>,
    values_destroyed: Cell<usize>,
}

impl DictType<String, u64> for StringKeys {
    fn hash(&self, key: &String) -> u64 {
        rehashdict::hashing::siphash24(key.as_bytes())
    }

    fn key_eq(&self, a: &String, b: &String) -> bool {
        a == b
    }

    fn dup_key(&self, key: &String) -> Option<String> {
        Some(key.clone())
    }

    fn destroy_key(&self, _key: &String) {
        self.keys_destroyed.set(self.keys_destroyed.get() + 1);
    }

    fn destroy_value(&self, _value: &u64) {
        self.values_destroyed.set(self.values_destroyed.get() + 1);
    }
}

fn key(n: u32) -> String {
    format!("key-{n}")
}

#[test]
fn insert_get_delete_roundtrip() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    assert_eq!(dict.add(key(1), EntryValue::U64(1)).unwrap(), InsertOutcome::Inserted);
    assert_eq!(dict.get(&key(1)).map(|v| v.as_u64()), Some(1));
    assert_eq!(
        dict.add(key(1), EntryValue::U64(2)).unwrap(),
        InsertOutcome::AlreadyPresent
    );
    assert_eq!(dict.get(&key(1)).map(|v| v.as_u64()), Some(1));
    assert!(dict.contains_key(&key(1)));
    assert!(!dict.contains_key(&key(2)));

    dict.replace(key(1), EntryValue::U64(99)).unwrap();
    assert_eq!(dict.get(&key(1)).map(|v| v.as_u64()), Some(99));

    assert_eq!(dict.delete(&key(1)), rehashdict::DeleteOutcome::Deleted);
    assert!(dict.get(&key(1)).is_none());
    assert_eq!(dict.delete(&key(1)), rehashdict::DeleteOutcome::Absent);
}

#[test]
fn growth_survives_many_inserts_and_keeps_every_key_reachable() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    for i in 0..2000u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
    }
    assert_eq!(dict.len(), 2000);
    for i in 0..2000u32 {
        assert_eq!(dict.get(&key(i)).map(|v| v.as_u64()), Some(i as u64));
    }
}

#[test]
fn shrink_follows_mass_deletion() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    for i in 0..1000u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
    }
    for i in 0..990u32 {
        dict.delete(&key(i));
    }
    // Drive any pending incremental rehash to completion.
    while dict.rehashing_info().in_progress {
        dict.rehash_for_micros(1_000_000);
    }
    assert_eq!(dict.len(), 10);
    for i in 990..1000u32 {
        assert!(dict.contains_key(&key(i)));
    }
}

#[test]
fn destructor_hooks_fire_on_delete_and_clear() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    for i in 0..10u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
    }
    dict.delete(&key(0));
    assert_eq!(dict.descriptor().keys_destroyed.get(), 1);
    assert_eq!(dict.descriptor().values_destroyed.get(), 1);
    dict.clear();
    assert_eq!(dict.descriptor().keys_destroyed.get(), 10);
    assert_eq!(dict.descriptor().values_destroyed.get(), 10);
}

#[test]
fn unlink_defers_destructors_until_freed() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    dict.add(key(1), EntryValue::U64(7)).unwrap();

    let unlinked = dict.unlink(&key(1)).expect("key was present");
    assert_eq!(dict.descriptor().keys_destroyed.get(), 0);
    assert!(dict.get(&key(1)).is_none());
    assert_eq!(unlinked.value().map(|v| v.as_u64()), Some(7));

    dict.free_unlinked(unlinked);
    assert_eq!(dict.descriptor().keys_destroyed.get(), 1);
    assert_eq!(dict.descriptor().values_destroyed.get(), 1);
}

#[test]
fn two_phase_unlink_resumes_rehashing_on_drop() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    for i in 0..256u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
    }
    assert!(dict.rehashing_info().in_progress || dict.len() == 256);

    {
        let handle = dict.two_phase_unlink(&key(0));
        assert!(handle.is_found());
    }
    // After the handle drops, normal operations (including further
    // rehash steps) proceed as usual.
    assert!(dict.get(&key(0)).is_none());
    for i in 1..256u32 {
        assert!(dict.contains_key(&key(i)));
    }
}

#[test]
fn scan_cursor_visits_every_key_exactly_once_eventually() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    let mut expected = HashSet::new();
    for i in 0..300u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
        expected.insert(key(i));
    }

    let mut seen = HashSet::new();
    let mut cursor = 0u64;
    loop {
        cursor = dict.scan(cursor, |item| {
            if let rehashdict::Scanned::KeyValue(k, _) = item {
                seen.insert(k.clone());
            }
        });
        if cursor == 0 {
            break;
        }
    }
    assert_eq!(seen, expected);
}

#[test]
fn scan_survives_a_resize_that_starts_mid_scan() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    let mut expected = HashSet::new();
    for i in 0..50u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
        expected.insert(key(i));
    }

    let mut seen = HashSet::new();
    let mut cursor = 0u64;
    let mut grown = false;
    loop {
        cursor = dict.scan(cursor, |item| {
            if let rehashdict::Scanned::KeyValue(k, _) = item {
                seen.insert(k.clone());
            }
        });
        if !grown {
            // Trigger a growth partway through the scan, while the
            // pre-resize key set must still be fully covered.
            dict.try_expand(4096).unwrap();
            grown = true;
        }
        if cursor == 0 {
            break;
        }
    }
    assert_eq!(seen, expected);
}

#[test]
fn sampling_only_ever_returns_present_keys() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    for i in 0..64u32 {
        dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
    }

    for _ in 0..200 {
        if let Some(sample) = dict.random_entry() {
            let found = match sample {
                rehashdict::Sampled::KeyValue(k, _) => dict.contains_key(k),
                rehashdict::Sampled::KeyOnly(k) => dict.contains_key(k),
                rehashdict::Sampled::Embedded(..) => true,
            };
            assert!(found);
        }
    }

    let candidates = dict.sample_keys(10);
    assert!(!candidates.is_empty());
    assert!(candidates.len() <= 10);
}

#[test]
fn resize_forbid_keeps_table_layout_stable() {
    rehashdict::set_resize_state(ResizeState::Forbid);
    let result = std::panic::catch_unwind(|| {
        let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
        for i in 0..200u32 {
            dict.add(key(i), EntryValue::U64(i as u64)).unwrap();
        }
        dict.buckets()
    });
    rehashdict::set_resize_state(ResizeState::Enabled);
    let buckets = result.expect("forbidden-resize insertions should not panic");
    assert_eq!(buckets, 1 << rehashdict::resize::INITIAL_EXPONENT);
}

#[test]
fn increment_helpers_operate_in_place() {
    let mut dict: Dict<String, u64, StringKeys> = Dict::new(StringKeys::default());
    dict.add(key(1), EntryValue::U64(10)).unwrap();
    assert_eq!(dict.increment_value_u64(&key(1), 5), Some(15));
    assert_eq!(dict.get(&key(1)).map(|v| v.as_u64()), Some(15));
    assert_eq!(dict.increment_value_u64(&key(2), 5), None);
}

struct NoValueKeys;
impl DictType<String, ()> for NoValueKeys {
    fn hash(&self, key: &String) -> u64 {
        rehashdict::hashing::siphash24(key.as_bytes())
    }
    fn key_eq(&self, a: &String, b: &String) -> bool {
        a == b
    }
    fn flags(&self) -> DictFlags {
        DictFlags {
            no_value: true,
            keys_are_odd: true,
            ..DictFlags::default()
        }
    }
}

#[test]
fn key_only_set_semantics() {
    let mut dict: Dict<String, (), NoValueKeys> = Dict::new(NoValueKeys);
    assert_eq!(dict.add_key_only(key(1)).unwrap(), InsertOutcome::Inserted);
    assert_eq!(dict.add_key_only(key(1)).unwrap(), InsertOutcome::AlreadyPresent);
    assert!(dict.contains_key(&key(1)));
    assert_eq!(dict.delete(&key(1)), rehashdict::DeleteOutcome::Deleted);
    assert!(!dict.contains_key(&key(1)));
}
