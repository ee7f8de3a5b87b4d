//! Resize policy: the global [`ResizeState`] switch, grow/shrink
//! thresholds, and the power-of-two exponent arithmetic every table size
//! is expressed in.

use std::sync::atomic::{AtomicU8, Ordering};

/// Table exponent below which a `Dict` never shrinks. `2^2 = 4` matches
/// the teacher pack's own `zumic` dict reimplementation
/// (`INITIAL_SIZE: usize = 4`) and the upstream dict this spec distills.
pub const INITIAL_EXPONENT: u32 = 2;

/// Ratio used both as the "avoid" expand threshold and as the shrink
/// threshold multiplier in `avoid` mode.
pub const FORCE_RATIO: usize = 4;

/// Shrink fires once load factor falls below `1 / MIN_FILL`.
pub const MIN_FILL: usize = 8;

/// Process-wide switch gating all automatic (and, for `Forbid`, all
/// explicit) resize behaviour across every `Dict` in the process. A
/// single global, exactly as the spec requires — set it once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResizeState {
    Enabled = 0,
    Avoid = 1,
    Forbid = 2,
}

static RESIZE_STATE: AtomicU8 = AtomicU8::new(ResizeState::Enabled as u8);

pub fn set_resize_state(state: ResizeState) {
    RESIZE_STATE.store(state as u8, Ordering::SeqCst);
}

pub fn resize_state() -> ResizeState {
    match RESIZE_STATE.load(Ordering::SeqCst) {
        0 => ResizeState::Enabled,
        1 => ResizeState::Avoid,
        _ => ResizeState::Forbid,
    }
}

/// The distinct-from-error outcome of a resize attempt (spec §7: a no-op
/// resize is reported distinctly from a failure, not folded into one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// A new table was allocated and incremental migration started (or,
    /// for `no_incremental_rehash` descriptors, completed immediately).
    Resized,
    /// The target exponent matched the current one; nothing changed.
    NoOp,
    /// `resize_allowed` vetoed the resize; nothing changed.
    Vetoed,
}

/// Smallest exponent `e` with `2^e >= max(n, 2^INITIAL_EXPONENT)`.
/// Returns `None` on overflow (the target would not fit in `usize`).
pub fn exponent_for(n: usize) -> Option<u32> {
    let floor = 1usize << INITIAL_EXPONENT;
    let target = n.max(floor);
    if target > (1usize << (usize::BITS - 1)) {
        return None;
    }
    Some(target.next_power_of_two().trailing_zeros())
}
