//! Inline key storage for the `embedded_entry` descriptor flag.
//!
//! The original two-call buffer-sizing protocol (query the needed length
//! with a null buffer, then write into a caller-allocated one) collapses
//! in safe Rust into a single allocating call: `DictType::embed_key`
//! returns an `EmbeddedKey` directly. The small-buffer optimization itself
//! is grounded in `andjo403-Interner`, which reaches for `smallvec` (with
//! its `union` feature) for exactly this kind of inline-until-it-doesn't-fit
//! byte storage.

use smallvec::SmallVec;

/// Inline capacity before an embedded key spills to the heap. Chosen to
/// comfortably hold short fixed-width keys (e.g. a `u64` or a UUID) without
/// an allocation.
const INLINE_CAPACITY: usize = 23;

/// A key encoded by [`crate::descriptor::DictType::embed_key`] and stored
/// directly inside the entry allocation instead of boxing a separate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedKey {
    bytes: SmallVec<[u8; INLINE_CAPACITY]>,
}

impl EmbeddedKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: SmallVec::from_slice(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether this key's encoding lives inline or spilled to the heap.
    pub fn is_inline(&self) -> bool {
        !self.bytes.spilled()
    }
}
