//! The per-entry value representation: a word-sized union of a caller
//! value, or one of three numeric forms that avoid boxing a caller type
//! just to hold a counter.
//!
//! Modeled per the spec's own redesign note as a variant enum rather than
//! an actual union, with accessors that panic (a caller contract
//! violation, same family as an unsupported entry-variant macro use) when
//! the active variant doesn't match what was asked for.

/// A value held by a `Normal` or `Embedded` entry.
#[derive(Debug, Clone)]
pub enum EntryValue<V> {
    Ptr(V),
    I64(i64),
    U64(u64),
    F64(f64),
}

impl<V> EntryValue<V> {
    pub fn as_ptr(&self) -> &V {
        match self {
            EntryValue::Ptr(v) => v,
            _ => panic!("entry value is not the Ptr variant"),
        }
    }

    pub fn as_ptr_mut(&mut self) -> &mut V {
        match self {
            EntryValue::Ptr(v) => v,
            _ => panic!("entry value is not the Ptr variant"),
        }
    }

    pub fn into_ptr(self) -> V {
        match self {
            EntryValue::Ptr(v) => v,
            _ => panic!("entry value is not the Ptr variant"),
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            EntryValue::I64(v) => *v,
            _ => panic!("entry value is not the I64 variant"),
        }
    }

    pub fn as_u64(&self) -> u64 {
        match self {
            EntryValue::U64(v) => *v,
            _ => panic!("entry value is not the U64 variant"),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            EntryValue::F64(v) => *v,
            _ => panic!("entry value is not the F64 variant"),
        }
    }

    /// Increments an `I64` value in place, returning the post-increment
    /// value, as the spec's incrementers do.
    pub fn increment_i64(&mut self, by: i64) -> i64 {
        match self {
            EntryValue::I64(v) => {
                *v += by;
                *v
            }
            _ => panic!("entry value is not the I64 variant"),
        }
    }

    pub fn increment_u64(&mut self, by: u64) -> u64 {
        match self {
            EntryValue::U64(v) => {
                *v += by;
                *v
            }
            _ => panic!("entry value is not the U64 variant"),
        }
    }

    pub fn increment_f64(&mut self, by: f64) -> f64 {
        match self {
            EntryValue::F64(v) => {
                *v += by;
                *v
            }
            _ => panic!("entry value is not the F64 variant"),
        }
    }
}
