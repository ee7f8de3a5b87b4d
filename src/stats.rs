//! Table-shape diagnostics: per-table bucket/used counts and a chain
//! length histogram, plus a human-readable rendering of the same,
//! mirroring the kind of stats dump a dict implementation usually exposes
//! for operators rather than for the hot path.

use std::fmt::Write as _;

use crate::descriptor::DictType;
use crate::dict::Dict;
use crate::entry::{Entry, Slot};
use crate::table::Table;

/// Bucket-chain-length buckets above this are folded into one "longer"
/// bucket in the histogram, so a single pathological chain can't blow up
/// the stats struct's size.
const HISTOGRAM_CAP: usize = 32;

#[derive(Debug, Clone)]
pub struct TableStats {
    pub buckets: usize,
    pub used: usize,
    pub min_chain_length: usize,
    pub max_chain_length: usize,
    pub avg_chain_length: f64,
    /// `chain_length_histogram[n]` counts buckets whose chain is exactly
    /// `n` long, for `n < HISTOGRAM_CAP`; `chain_length_histogram.last()`
    /// folds in everything `>= HISTOGRAM_CAP`.
    pub chain_length_histogram: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct DictStats {
    pub rehashing: bool,
    pub table0: TableStats,
    pub table1: Option<TableStats>,
}

fn chain_length<K, V>(entry: &Entry<K, V>) -> usize {
    let mut len = 1;
    let mut current = match entry {
        Entry::Normal { next, .. } => next.as_deref(),
        Entry::NoValue { next, .. } => next.as_deref(),
        Entry::Embedded { next, .. } => next.as_deref(),
    };
    while let Some(node) = current {
        len += 1;
        current = match node {
            Entry::Normal { next, .. } => next.as_deref(),
            Entry::NoValue { next, .. } => next.as_deref(),
            Entry::Embedded { next, .. } => next.as_deref(),
        };
    }
    len
}

fn table_stats<K, V>(table: &Table<K, V>) -> TableStats {
    let mut histogram = vec![0usize; HISTOGRAM_CAP + 1];
    let mut min_chain = usize::MAX;
    let mut max_chain = 0usize;
    let mut occupied_buckets = 0usize;
    let mut total_chain_length = 0usize;

    for slot in &table.slots {
        let len = match slot {
            Slot::Empty => 0,
            Slot::Key(_) => 1,
            Slot::Chain(entry) => chain_length(entry),
        };
        let bucket = len.min(HISTOGRAM_CAP);
        histogram[bucket] += 1;
        if len > 0 {
            occupied_buckets += 1;
            total_chain_length += len;
            min_chain = min_chain.min(len);
            max_chain = max_chain.max(len);
        }
    }
    if occupied_buckets == 0 {
        min_chain = 0;
    }

    TableStats {
        buckets: table.size(),
        used: table.used,
        min_chain_length: min_chain,
        max_chain_length: max_chain,
        avg_chain_length: if occupied_buckets == 0 {
            0.0
        } else {
            total_chain_length as f64 / occupied_buckets as f64
        },
        chain_length_histogram: histogram,
    }
}

impl<K, V, T: DictType<K, V>> Dict<K, V, T> {
    pub fn stats(&self) -> DictStats {
        DictStats {
            rehashing: self.is_rehashing(),
            table0: table_stats(&self.tables[0]),
            table1: if self.is_rehashing() {
                Some(table_stats(&self.tables[1]))
            } else {
                None
            },
        }
    }

    /// Renders [`Dict::stats`] the way an operator reading logs would want
    /// it: one block per active table, occupied-bucket chain-length
    /// distribution included.
    pub fn stats_message(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        write_table_stats(&mut out, "table 0", &stats.table0);
        if let Some(table1) = &stats.table1 {
            write_table_stats(&mut out, "table 1 (rehash target)", table1);
        }
        out
    }
}

fn write_table_stats(out: &mut String, label: &str, stats: &TableStats) {
    let fill = if stats.buckets == 0 {
        0.0
    } else {
        stats.used as f64 / stats.buckets as f64
    };
    let _ = writeln!(
        out,
        "{label}: {} buckets, {} entries, fill factor {:.3}",
        stats.buckets, stats.used, fill
    );
    let _ = writeln!(
        out,
        "  chain length: min {} max {} avg {:.3}",
        stats.min_chain_length, stats.max_chain_length, stats.avg_chain_length
    );
    for (len, count) in stats.chain_length_histogram.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        if len == HISTOGRAM_CAP {
            let _ = writeln!(out, "  buckets with chain length >= {len}: {count}");
        } else {
            let _ = writeln!(out, "  buckets with chain length {len}: {count}");
        }
    }
}
