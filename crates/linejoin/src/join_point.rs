use crate::buffer::TextBuffer;
use std::ops::Range;

/// Offsets describing the boundary between `line` and `line + 1`.
///
/// Recomputed before every use; never kept across an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct JoinPoint {
    pub(crate) line_start: usize,
    pub(crate) line_end: usize,
    /// Just past the last non-space character of the line (the line start for a blank line).
    pub(crate) last_non_space: usize,
    /// First non-space character of the next line (its end if the next line is blank).
    pub(crate) first_non_space_in_next: usize,
}

impl JoinPoint {
    /// `None` when `line` is the last line of the buffer.
    pub(crate) fn at(buffer: &TextBuffer, line: usize) -> Option<Self> {
        if line + 1 >= buffer.line_count() {
            return None;
        }
        let line_start = buffer.line_start(line).ok()?;
        let line_end = buffer.line_end(line).ok()?;
        let next_start = buffer.line_start(line + 1).ok()?;
        let next_end = buffer.line_end(line + 1).ok()?;

        Some(Self {
            line_start,
            line_end,
            last_non_space: buffer.skip_spaces_backward(line_end, line_start),
            first_non_space_in_next: buffer.skip_spaces_forward(next_start, next_end),
        })
    }

    pub(crate) fn is_blank_line(&self) -> bool {
        self.last_non_space == self.line_start
    }

    /// Range offered to raw strategies: from the end of the left content to the next content,
    /// blank lines included.
    pub(crate) fn raw_range(&self, buffer: &TextBuffer) -> Range<usize> {
        self.last_non_space..buffer.skip_whitespace_forward(self.first_non_space_in_next)
    }
}
