use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`TextBuffer`](crate::TextBuffer) mutations.
pub enum BufferError {
    #[error("buffer is read-only")]
    /// The whole buffer is read-only.
    ReadOnly,

    #[error("range {start}..{end} touches a read-only region")]
    /// The edit overlaps a guarded (read-only) region.
    ReadOnlyRange {
        /// Start character offset of the rejected edit.
        start: usize,
        /// End character offset of the rejected edit.
        end: usize,
    },

    #[error("invalid range {start}..{end} for buffer of length {len}")]
    /// The range is reversed or extends past the end of the buffer.
    InvalidRange {
        /// Start character offset.
        start: usize,
        /// End character offset.
        end: usize,
        /// Buffer length in characters.
        len: usize,
    },

    #[error("invalid line {0}")]
    /// The line index does not exist.
    InvalidLine(usize),
}

/// The join was canceled through the progress channel.
///
/// The buffer keeps whatever partial progress was made before cancellation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("join lines canceled")]
pub struct Canceled;
