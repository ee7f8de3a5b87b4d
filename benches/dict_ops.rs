use criterion::{criterion_group, criterion_main, Bencher, BenchmarkId, Criterion, Throughput};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::Rng;

use rehashdict::{Dict, DictType, EntryValue};

const CAPACITY: [usize; 3] = [512, 4096, 65536];
const LOAD_FACTORS: [f32; 2] = [0.3, 0.8];
const TOTAL_OPERATIONS: u64 = 10_000;

static RANDOM_KEYS: Lazy<Vec<u64>> = Lazy::new(|| {
    let mut rng = rand::thread_rng();
    let mut keys = Vec::with_capacity(TOTAL_OPERATIONS as usize);
    for _ in 0..TOTAL_OPERATIONS {
        keys.push(rng.gen_range(0, TOTAL_OPERATIONS));
    }
    keys
});

struct U64Keys;

impl DictType<u64, u64> for U64Keys {
    fn hash(&self, key: &u64) -> u64 {
        rehashdict::hashing::fxhash_bytes(&key.to_ne_bytes())
    }

    fn key_eq(&self, a: &u64, b: &u64) -> bool {
        a == b
    }
}

fn filled_dict(capacity: usize, load_factor: f32) -> Dict<u64, u64, U64Keys> {
    let mut dict = Dict::with_capacity(U64Keys, capacity).unwrap();
    let to_fill = (capacity as f32 * load_factor) as u64;
    for i in 0..to_fill {
        dict.add(i, EntryValue::U64(i)).unwrap();
    }
    dict
}

fn insert(b: &mut Bencher, capacity: usize, load_factor: f32) {
    b.iter(|| {
        let mut dict = filled_dict(capacity, load_factor);
        for key in RANDOM_KEYS.iter() {
            dict.add(*key, EntryValue::U64(*key)).unwrap();
        }
    });
}

fn random_get(b: &mut Bencher, capacity: usize, load_factor: f32) {
    let dict = filled_dict(capacity, load_factor);
    b.iter(|| {
        for key in RANDOM_KEYS.iter() {
            criterion::black_box(dict.get(key));
        }
    });
}

fn read_modify_write(b: &mut Bencher, capacity: usize, load_factor: f32) {
    let mut dict = filled_dict(capacity, load_factor);
    b.iter(|| {
        for key in RANDOM_KEYS.iter() {
            dict.increment_value_u64(key, 1);
        }
    });
}

fn rehash_step(b: &mut Bencher, capacity: usize, load_factor: f32) {
    b.iter(|| {
        let mut dict = filled_dict(capacity, load_factor);
        // Force a growth and time the incremental steps it takes to drain.
        dict.try_expand(capacity * 2).unwrap();
        while dict.rehashing_info().in_progress {
            dict.rehash_for_micros(50);
        }
    });
}

fn dict_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict_ops");
    group.throughput(Throughput::Elements(TOTAL_OPERATIONS));

    for input in CAPACITY.iter().cartesian_product(LOAD_FACTORS.iter()) {
        let (&capacity, &load_factor) = input;
        let description = format!("capacity: {}, load_factor: {}", capacity, load_factor);

        group.bench_with_input(
            BenchmarkId::new("Insert", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| insert(b, capacity, load_factor),
        );
        group.bench_with_input(
            BenchmarkId::new("Random Get", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| random_get(b, capacity, load_factor),
        );
        group.bench_with_input(
            BenchmarkId::new("RMW", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| read_modify_write(b, capacity, load_factor),
        );
        group.bench_with_input(
            BenchmarkId::new("Incremental rehash drain", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| rehash_step(b, capacity, load_factor),
        );
    }

    group.finish()
}

criterion_group!(benches, dict_ops);
criterion_main!(benches);
