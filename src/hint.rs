//! Branch prediction hints for the hot per-mutation path. Nightly-only
//! intrinsics, same gate the teacher uses for its own `likely`/`unlikely`
//! in `table::imp` — falls back to a no-op on stable.

cfg_if::cfg_if! {
    if #[cfg(feature = "nightly")] {
        pub(crate) use core::intrinsics::{likely, unlikely};
    } else {
        #[inline]
        pub(crate) fn likely(b: bool) -> bool {
            b
        }
        #[inline]
        pub(crate) fn unlikely(b: bool) -> bool {
            b
        }
    }
}
