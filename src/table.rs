//! A single bucket array: one of the two tables a [`crate::dict::Dict`]
//! juggles while rehashing.

use crate::entry::Slot;
use crate::error::DictError;

/// One of `Dict`'s two bucket arrays (`T[0]` or `T[1]`).
pub(crate) struct Table<K, V> {
    pub(crate) slots: Vec<Slot<K, V>>,
    /// `slots.len() == 1 << exponent`, or `slots` is empty and `exponent`
    /// is meaningless (the table hasn't been allocated yet).
    pub(crate) exponent: u32,
    pub(crate) used: usize,
}

impl<K, V> Table<K, V> {
    /// The not-yet-allocated table: both real tables start this way, and
    /// `T[1]` returns to it every time a rehash finishes.
    pub(crate) fn absent() -> Self {
        Table {
            slots: Vec::new(),
            exponent: 0,
            used: 0,
        }
    }

    pub(crate) fn is_absent(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn size(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn mask(&self) -> usize {
        self.slots.len().wrapping_sub(1)
    }

    /// Allocates a table of `1 << exponent` empty slots, falling back to
    /// [`DictError::AllocFailure`] instead of aborting the process the way
    /// an infallible `Vec::with_capacity` would.
    pub(crate) fn try_with_exponent(exponent: u32) -> Result<Self, DictError> {
        let requested_buckets = 1usize
            .checked_shl(exponent)
            .ok_or(DictError::ResizeOverflow {
                requested: usize::MAX,
            })?;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(requested_buckets)
            .map_err(|_| DictError::AllocFailure { requested_buckets })?;
        slots.resize_with(requested_buckets, || Slot::Empty);
        Ok(Table {
            slots,
            exponent,
            used: 0,
        })
    }
}
