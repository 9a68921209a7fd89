//! Caret input, line-range resolution and final caret placement.

use crate::buffer::TextBuffer;
use std::ops::Range;

/// A caret, optionally with a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caret {
    /// Caret offset (characters).
    pub offset: usize,
    /// Selected range, `start <= end`. An empty range counts as no selection.
    pub selection: Option<Range<usize>>,
    /// Whether this is the primary caret; only the primary caret asks for scrolling.
    pub primary: bool,
}

impl Caret {
    /// A primary caret at `offset`, without selection.
    pub fn at(offset: usize) -> Self {
        Self {
            offset,
            selection: None,
            primary: true,
        }
    }

    /// A primary caret at the end of `selection`.
    pub fn with_selection(selection: Range<usize>) -> Self {
        Self {
            offset: selection.end,
            selection: Some(selection),
            primary: true,
        }
    }

    /// Mark the caret as secondary.
    pub fn secondary(mut self) -> Self {
        self.primary = false;
        self
    }

    /// The selection, if it is not empty.
    pub fn selected_range(&self) -> Option<Range<usize>> {
        self.selection.clone().filter(|range| !range.is_empty())
    }

    /// Returns `true` if the caret has a non-empty selection.
    pub fn has_selection(&self) -> bool {
        self.selected_range().is_some()
    }
}

/// Lines to join: `line_count` boundaries starting after `start_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    /// First line of the range.
    pub start_line: usize,
    /// Number of line boundaries to remove.
    pub line_count: usize,
}

/// Compute the lines to join for `caret`.
///
/// Without a selection this is the caret line and the one after it. With a selection it is every
/// line the selection touches; a selection ending exactly at the start of a line does not include
/// that line. Returns `None` when the buffer is not writable or there is nothing to join.
pub fn resolve_line_range(buffer: &TextBuffer, caret: &Caret) -> Option<LineRange> {
    if !buffer.is_writable() {
        return None;
    }

    let (start_line, end_line) = match caret.selected_range() {
        None => {
            let line = buffer.line_of_offset(caret.offset);
            (line, line + 1)
        }
        Some(selection) => {
            let start_line = buffer.line_of_offset(selection.start);
            let mut end_line = buffer.line_of_offset(selection.end);
            if end_line > start_line && buffer.line_start(end_line).ok() == Some(selection.end) {
                end_line -= 1;
            }
            (start_line, end_line)
        }
    };

    let last_line = buffer.line_count().saturating_sub(1);
    let line_count = end_line.min(last_line).checked_sub(start_line)?;
    (line_count > 0).then_some(LineRange {
        start_line,
        line_count,
    })
}

/// Caret position proposed during a run. The first proposal wins.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaretCandidate(Option<usize>);

impl CaretCandidate {
    /// Propose `offset`. Returns `true` if it was taken.
    pub fn offer(&mut self, offset: usize) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(offset);
        true
    }

    /// The chosen offset.
    pub fn get(&self) -> Option<usize> {
        self.0
    }
}

/// Move `caret` after a completed run.
///
/// A caret with a selection goes to where the selection end ended up (`selection_end`) and loses
/// its selection. Otherwise the caret goes to the candidate, if any. Returns
/// `(moved, scroll_to_caret)`.
pub(crate) fn place_caret(
    caret: &mut Caret,
    selection_end: Option<usize>,
    candidate: CaretCandidate,
) -> (bool, bool) {
    if caret.has_selection() {
        if let Some(end) = selection_end {
            caret.offset = end;
            caret.selection = None;
            return (true, false);
        }
    }

    match candidate.get() {
        Some(offset) => {
            caret.offset = offset;
            caret.selection = None;
            (true, caret.primary)
        }
        None => (false, false),
    }
}
