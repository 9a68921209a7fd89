//! Position-stable markers.
//!
//! A marker is a tracked range of character offsets stored in an index-based set owned by the
//! buffer. Every mutation of the buffer translates all live markers through the
//! [`EditRecord`] it produced, so a marker keeps referring to the same logical position across
//! a sequence of edits. Markers are greedy on both sides: text inserted exactly at a marker's
//! boundary ends up inside it.
//!
//! A [`MarkerKind::Caret`] marker behaves like an editor caret instead: an edit that swallows it
//! moves it to the end of the inserted text rather than invalidating it.
//!
//! Translation of a range `[a, b]` through an edit that deletes `[s, e)` and inserts `n`
//! characters:
//!
//! | case | result |
//! |---|---|
//! | pure insertion before `a` | shifted by `n` |
//! | pure insertion in `a..=b` | `[a, b + n]` |
//! | `e <= a` | shifted by `n - (e - s)` |
//! | `s >= b` | unchanged (`b + n` when `s == b`) |
//! | `s < a && b < e` | invalidated (caret markers: `[s + n, s + n]`) |
//! | other overlap | `[min(a, s), b' ]`, `b'` shifted when `b >= e`, else `s + n` |

use crate::edit_log::EditRecord;
use slotmap::{SlotMap, new_key_type};
use std::ops::Range;

new_key_type! {
    /// Handle to a marker owned by a [`TextBuffer`](crate::TextBuffer).
    pub struct MarkerId;
}

/// How a marker reacts to an edit that strictly encloses it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// The marker is invalidated.
    #[default]
    Range,
    /// The marker collapses to the end of the inserted text.
    Caret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedRange {
    start: usize,
    end: usize,
    kind: MarkerKind,
    valid: bool,
}

impl TrackedRange {
    fn at(offset: usize, kind: MarkerKind) -> Self {
        Self {
            start: offset,
            end: offset,
            kind,
            valid: true,
        }
    }

    fn translate(&mut self, record: &EditRecord) {
        if !self.valid {
            return;
        }

        let s = record.start;
        let e = record.end();
        let n = record.inserted_len();
        let shift = |x: usize| x - (e - s) + n;

        if s == e {
            if s < self.start {
                self.start += n;
                self.end += n;
            } else if s <= self.end {
                self.end += n;
            }
            return;
        }

        if e <= self.start {
            self.start = shift(self.start);
            self.end = shift(self.end);
        } else if s >= self.end {
            if s == self.end {
                self.end += n;
            }
        } else if s < self.start && self.end < e {
            match self.kind {
                MarkerKind::Range => self.valid = false,
                MarkerKind::Caret => {
                    self.start = s + n;
                    self.end = s + n;
                }
            }
        } else {
            let end = if self.end >= e { shift(self.end) } else { s + n };
            self.start = self.start.min(s);
            self.end = end.max(self.start);
        }
    }
}

/// The set of live markers of one buffer.
#[derive(Debug, Default)]
pub(crate) struct MarkerSet {
    ranges: SlotMap<MarkerId, TrackedRange>,
    scopes: Vec<Vec<MarkerId>>,
}

impl MarkerSet {
    pub(crate) fn create(&mut self, offset: usize, kind: MarkerKind) -> MarkerId {
        let id = self.ranges.insert(TrackedRange::at(offset, kind));
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(id);
        }
        id
    }

    /// Current start offset, or `None` if the marker was released or invalidated.
    pub(crate) fn offset(&self, id: MarkerId) -> Option<usize> {
        self.range(id).map(|range| range.start)
    }

    pub(crate) fn range(&self, id: MarkerId) -> Option<Range<usize>> {
        self.ranges
            .get(id)
            .filter(|range| range.valid)
            .map(|range| range.start..range.end)
    }

    pub(crate) fn release(&mut self, id: MarkerId) -> bool {
        self.ranges.remove(id).is_some()
    }

    pub(crate) fn apply(&mut self, record: &EditRecord) {
        for range in self.ranges.values_mut() {
            range.translate(record);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.ranges.len()
    }

    pub(crate) fn begin_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Release every marker created since the matching [`MarkerSet::begin_scope`].
    pub(crate) fn end_scope(&mut self) -> usize {
        let Some(ids) = self.scopes.pop() else {
            return 0;
        };
        ids.into_iter().filter(|id| self.release(*id)).count()
    }
}
