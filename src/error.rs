use thiserror::Error;

/// The only genuinely exceptional outcomes a `Dict` can report.
///
/// `Absent` (key not found) and `NoOp` (resize to an equivalent size, a
/// rehash call while not rehashing, ...) are *not* errors — they are
/// ordinary variants of each operation's own outcome type (see
/// [`crate::dict::InsertOutcome`], [`crate::resize::ResizeOutcome`]). This
/// type exists only for the cases a caller truly cannot proceed past.
#[derive(Error, Debug)]
pub enum DictError {
    #[error("allocation failed while resizing to {requested_buckets} buckets")]
    AllocFailure { requested_buckets: usize },
    #[error("resize to {requested} elements would overflow the address space")]
    ResizeOverflow { requested: usize },
}

pub type Result<T> = std::result::Result<T, DictError>;
