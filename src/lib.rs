#![cfg_attr(feature = "nightly", feature(core_intrinsics))]

//! An in-memory associative container with incremental rehashing.
//!
//! `Dict` maps opaque keys to opaque values behind a caller-supplied
//! [`DictType`](descriptor::DictType) descriptor, the way a database engine's
//! primary key space would: insert, lookup, replace, delete, random
//! sampling, a stateless cursor for resumable full scans, and live
//! iteration. Growth and shrink are amortised across many small operations
//! instead of pausing for work proportional to table size.
//!
//! The crate is single-owner: there is no internal locking, and the two
//! pause counters (`pause_rehash`, `pause_auto_resize`) exist only to let a
//! re-entrant callback on the same thread coordinate with in-progress work,
//! not to support concurrent access from multiple threads.

pub mod descriptor;
pub mod dict;
pub mod embedded;
pub mod error;
pub mod hashing;
pub mod iter;
pub mod resize;
pub mod sample;
pub mod scan;
pub mod stats;
pub mod value;

mod entry;
mod hint;
mod rehash;
mod table;

pub use descriptor::{DictFlags, DictType};
pub use dict::{Dict, DeleteOutcome, InsertOutcome, RehashingInfo, TwoPhaseUnlink, UnlinkedEntry};
pub use embedded::EmbeddedKey;
pub use error::{DictError, Result};
pub use iter::{IterItem, SafeIter, UnsafeIter};
pub use resize::{resize_state, set_resize_state, ResizeOutcome, ResizeState};
pub use sample::Sampled;
pub use scan::Scanned;
pub use stats::{DictStats, TableStats};
pub use value::EntryValue;
