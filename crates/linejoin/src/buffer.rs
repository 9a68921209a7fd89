//! Rope-backed text buffer.
//!
//! Provides line/offset conversion, range edits, an edit log, markers, read-only regions and a
//! bulk-edit scope. All offsets are character offsets.

use crate::edit_log::{EditLog, EditRecord};
use crate::error::BufferError;
use crate::marker::{MarkerId, MarkerKind, MarkerSet};
use ropey::Rope;
use std::ops::{Deref, DerefMut, Range};

/// Returns `true` for the whitespace that can appear inside a line (space and tab).
pub fn is_inline_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Returns `true` for inline whitespace and line-break characters.
pub fn is_whitespace(ch: char) -> bool {
    is_inline_whitespace(ch) || ch == '\n' || ch == '\r'
}

/// Mutable text buffer.
///
/// `ropey` treats `\n`, `\r\n` and a few Unicode separators as line breaks; line ends reported by
/// this type exclude the separator.
pub struct TextBuffer {
    rope: Rope,
    log: EditLog,
    markers: MarkerSet,
    read_only: bool,
    guarded: Vec<Range<usize>>,
    bulk_depth: usize,
}

impl TextBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create a buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            log: EditLog::default(),
            markers: MarkerSet::default(),
            read_only: false,
            guarded: Vec::new(),
            bulk_depth: 0,
        }
    }

    /// Get complete text
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Total character count.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns `true` if the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Total line count. An empty buffer has one line.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Character at `offset`, if any.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.rope.get_char(offset)
    }

    /// Text in `range` (clamped to the buffer).
    pub fn slice(&self, range: Range<usize>) -> String {
        let len = self.len_chars();
        let end = range.end.min(len);
        let start = range.start.min(end);
        self.rope.slice(start..end).to_string()
    }

    /// Start offset of `line`.
    pub fn line_start(&self, line: usize) -> Result<usize, BufferError> {
        self.rope
            .try_line_to_char(line)
            .ok()
            .filter(|_| line < self.line_count())
            .ok_or(BufferError::InvalidLine(line))
    }

    /// End offset of `line`, excluding its line separator.
    pub fn line_end(&self, line: usize) -> Result<usize, BufferError> {
        let start = self.line_start(line)?;
        let len = self.rope.line(line).len_chars();
        Ok(start + len - self.line_separator_len(line))
    }

    /// Length in characters of the separator ending `line` (0 for the last line).
    pub fn line_separator_len(&self, line: usize) -> usize {
        if line >= self.line_count() {
            return 0;
        }
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        match (
            len.checked_sub(2).map(|i| slice.char(i)),
            len.checked_sub(1).map(|i| slice.char(i)),
        ) {
            (Some('\r'), Some('\n')) => 2,
            (_, Some(ch)) if is_line_break(ch) => 1,
            _ => 0,
        }
    }

    /// Line containing `offset` (clamped to the buffer).
    pub fn line_of_offset(&self, offset: usize) -> usize {
        self.rope.char_to_line(offset.min(self.len_chars()))
    }

    /// Text of `line`, excluding its separator.
    pub fn line_text(&self, line: usize) -> Option<String> {
        let start = self.line_start(line).ok()?;
        let end = self.line_end(line).ok()?;
        Some(self.slice(start..end))
    }

    /// Convert a character offset to a byte offset.
    pub fn char_to_byte(&self, offset: usize) -> usize {
        self.rope.char_to_byte(offset.min(self.len_chars()))
    }

    /// Convert a byte offset to a character offset.
    pub fn byte_to_char(&self, byte: usize) -> usize {
        self.rope.byte_to_char(byte.min(self.rope.len_bytes()))
    }

    /// Scan backward from `offset` over spaces and tabs, never below `floor`.
    pub fn skip_spaces_backward(&self, offset: usize, floor: usize) -> usize {
        let mut offset = offset.min(self.len_chars());
        while offset > floor && self.char_at(offset - 1).is_some_and(is_inline_whitespace) {
            offset -= 1;
        }
        offset
    }

    /// Scan forward from `offset` over spaces and tabs, never past `ceiling`.
    pub fn skip_spaces_forward(&self, offset: usize, ceiling: usize) -> usize {
        let ceiling = ceiling.min(self.len_chars());
        let mut offset = offset.min(ceiling);
        while offset < ceiling && self.char_at(offset).is_some_and(is_inline_whitespace) {
            offset += 1;
        }
        offset
    }

    /// Scan forward from `offset` over all whitespace, line breaks included.
    pub fn skip_whitespace_forward(&self, offset: usize) -> usize {
        let len = self.len_chars();
        let mut offset = offset.min(len);
        while offset < len && self.char_at(offset).is_some_and(is_whitespace) {
            offset += 1;
        }
        offset
    }

    /// Returns `false` if the whole buffer is read-only.
    pub fn is_writable(&self) -> bool {
        !self.read_only
    }

    /// Make the whole buffer read-only (or writable again).
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Protect `range` against edits. Guarded ranges do not move with edits.
    pub fn guard_range(&mut self, range: Range<usize>) {
        self.guarded.push(range);
    }

    /// Number of edits applied so far.
    pub fn version(&self) -> u64 {
        self.log.version()
    }

    /// Edits applied after `version`, oldest first.
    ///
    /// Returns `None` when `version` is in the future or was dropped by
    /// [`TextBuffer::compact_log`].
    pub fn edits_since(&self, version: u64) -> Option<&[EditRecord]> {
        self.log.since(version)
    }

    /// Oldest version [`TextBuffer::edits_since`] can still answer for.
    pub fn oldest_version(&self) -> u64 {
        self.log.base_version()
    }

    /// Drop the edit records older than `before` (clamped to the current version).
    ///
    /// Observers synced to a dropped version have to resync from the full text. Returns the
    /// number of records dropped.
    pub fn compact_log(&mut self, before: u64) -> usize {
        let dropped = self.log.compact(before);
        if dropped > 0 {
            tracing::debug!(dropped, oldest = self.log.base_version(), "edit log compacted");
        }
        dropped
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), BufferError> {
        self.replace(offset..offset, text)
    }

    /// Delete `range`.
    pub fn delete(&mut self, range: Range<usize>) -> Result<(), BufferError> {
        self.replace(range, "")
    }

    /// Replace `range` with `text`.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Result<(), BufferError> {
        let len = self.len_chars();
        if range.start > range.end || range.end > len {
            return Err(BufferError::InvalidRange {
                start: range.start,
                end: range.end,
                len,
            });
        }
        self.check_writable(&range)?;
        if range.is_empty() && text.is_empty() {
            return Ok(());
        }

        let record = EditRecord {
            start: range.start,
            deleted_text: self.slice(range.clone()),
            inserted_text: text.to_string(),
        };
        self.rope.remove(range.clone());
        self.rope.insert(range.start, text);
        self.markers.apply(&record);
        tracing::trace!(
            start = record.start,
            deleted = record.deleted_len(),
            inserted = record.inserted_len(),
            bulk = self.is_in_bulk(),
            "buffer edit"
        );
        self.log.push(record);
        Ok(())
    }

    fn check_writable(&self, range: &Range<usize>) -> Result<(), BufferError> {
        if self.read_only {
            return Err(BufferError::ReadOnly);
        }
        let hits_guard = self.guarded.iter().any(|guard| {
            if range.is_empty() {
                guard.start < range.start && range.start < guard.end
            } else {
                guard.start < range.end && range.start < guard.end
            }
        });
        if hits_guard {
            return Err(BufferError::ReadOnlyRange {
                start: range.start,
                end: range.end,
            });
        }
        Ok(())
    }

    /// Run `f` inside a bulk-edit scope when `enabled` is `true`.
    ///
    /// The scope is a performance hint for collaborators observing the buffer; it has no effect on
    /// the resulting text.
    pub fn in_bulk<R>(&mut self, enabled: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        if !enabled {
            return f(self);
        }
        self.bulk_depth += 1;
        let mut scope = BulkScope {
            version: self.version(),
            buffer: self,
        };
        f(&mut scope)
    }

    /// Returns `true` while a bulk-edit scope is active.
    pub fn is_in_bulk(&self) -> bool {
        self.bulk_depth > 0
    }

    /// Create a marker at `offset` (clamped to the buffer).
    pub fn create_marker(&mut self, offset: usize) -> MarkerId {
        self.create_marker_of_kind(offset, MarkerKind::Range)
    }

    /// Create a marker that survives being swallowed by an edit, the way a caret does.
    pub fn create_caret_marker(&mut self, offset: usize) -> MarkerId {
        self.create_marker_of_kind(offset, MarkerKind::Caret)
    }

    /// Create a marker of the given kind at `offset` (clamped to the buffer).
    pub fn create_marker_of_kind(&mut self, offset: usize, kind: MarkerKind) -> MarkerId {
        let offset = offset.min(self.len_chars());
        self.markers.create(offset, kind)
    }

    /// Current offset of a marker, or `None` if it was released or invalidated by an edit.
    pub fn marker_offset(&self, id: MarkerId) -> Option<usize> {
        self.markers.offset(id)
    }

    /// Current range of a marker. Greedy markers grow when text is inserted at their boundary.
    pub fn marker_range(&self, id: MarkerId) -> Option<Range<usize>> {
        self.markers.range(id)
    }

    /// Release a marker. Returns `false` if it was already released.
    pub fn release_marker(&mut self, id: MarkerId) -> bool {
        self.markers.release(id)
    }

    /// Number of live (unreleased) markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Open a marker scope: every marker created through the returned guard is released when the
    /// guard is dropped.
    pub fn marker_scope(&mut self) -> MarkerScope<'_> {
        self.markers.begin_scope();
        MarkerScope { buffer: self }
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("len_chars", &self.len_chars())
            .field("line_count", &self.line_count())
            .field("version", &self.version())
            .field("markers", &self.markers.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Guard closing a bulk-edit scope, even when the scoped closure unwinds.
struct BulkScope<'a> {
    buffer: &'a mut TextBuffer,
    version: u64,
}

impl Deref for BulkScope<'_> {
    type Target = TextBuffer;

    fn deref(&self) -> &TextBuffer {
        &*self.buffer
    }
}

impl DerefMut for BulkScope<'_> {
    fn deref_mut(&mut self) -> &mut TextBuffer {
        &mut *self.buffer
    }
}

impl Drop for BulkScope<'_> {
    fn drop(&mut self) {
        self.buffer.bulk_depth -= 1;
        tracing::debug!(
            edits = self.buffer.version().saturating_sub(self.version),
            "bulk edit finished"
        );
    }
}

/// Guard releasing the markers created while it is alive.
///
/// Dereferences to the underlying [`TextBuffer`].
pub struct MarkerScope<'a> {
    buffer: &'a mut TextBuffer,
}

impl Deref for MarkerScope<'_> {
    type Target = TextBuffer;

    fn deref(&self) -> &TextBuffer {
        &*self.buffer
    }
}

impl DerefMut for MarkerScope<'_> {
    fn deref_mut(&mut self) -> &mut TextBuffer {
        &mut *self.buffer
    }
}

impl Drop for MarkerScope<'_> {
    fn drop(&mut self) {
        let released = self.buffer.markers.end_scope();
        if released > 0 {
            tracing::trace!(released, "released scoped markers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_offsets() {
        let buffer = TextBuffer::from_text("ab\r\ncd\nef");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line_start(1), Ok(4));
        assert_eq!(buffer.line_end(0), Ok(2));
        assert_eq!(buffer.line_separator_len(0), 2);
        assert_eq!(buffer.line_separator_len(1), 1);
        assert_eq!(buffer.line_separator_len(2), 0);
        assert_eq!(buffer.line_end(2), Ok(9));
        assert_eq!(buffer.line_of_offset(5), 1);
        assert_eq!(buffer.line_start(3), Err(BufferError::InvalidLine(3)));
    }

    #[test]
    fn test_trailing_newline_adds_empty_line() {
        let buffer = TextBuffer::from_text("foo\n");
        assert_eq!(buffer.line_count(), 2);
        assert_eq!(buffer.line_start(1), Ok(4));
        assert_eq!(buffer.line_end(1), Ok(4));
        assert_eq!(buffer.line_text(0).as_deref(), Some("foo"));
    }

    #[test]
    fn test_skip_helpers() {
        let buffer = TextBuffer::from_text("a \t\n  \n  b");
        assert_eq!(buffer.skip_spaces_backward(3, 0), 1);
        assert_eq!(buffer.skip_spaces_backward(3, 2), 2);
        assert_eq!(buffer.skip_spaces_forward(4, 6), 6);
        assert_eq!(buffer.skip_whitespace_forward(1), 9);
    }

    #[test]
    fn test_replace_logs_and_moves_markers() {
        let mut buffer = TextBuffer::from_text("hello world");
        let marker = buffer.create_marker(6);

        buffer.replace(0..5, "hi").unwrap();
        assert_eq!(buffer.text(), "hi world");
        assert_eq!(buffer.marker_offset(marker), Some(3));
        assert_eq!(buffer.version(), 1);

        let edits = buffer.edits_since(0).unwrap();
        assert_eq!(edits[0].deleted_text, "hello");
        assert_eq!(edits[0].inserted_text, "hi");
    }

    #[test]
    fn test_read_only_and_guarded_ranges() {
        let mut buffer = TextBuffer::from_text("abcdef");
        buffer.guard_range(2..4);

        assert_eq!(
            buffer.delete(3..5),
            Err(BufferError::ReadOnlyRange { start: 3, end: 5 })
        );
        assert!(buffer.insert(2, "x").is_ok());
        assert_eq!(buffer.text(), "abxcdef");

        buffer.set_read_only(true);
        assert_eq!(buffer.insert(0, "y"), Err(BufferError::ReadOnly));
        assert!(!buffer.is_writable());
    }

    #[test]
    fn test_invalid_range() {
        let mut buffer = TextBuffer::from_text("abc");
        assert_eq!(
            buffer.delete(2..9),
            Err(BufferError::InvalidRange {
                start: 2,
                end: 9,
                len: 3
            })
        );
    }

    #[test]
    fn test_marker_scope_releases_on_drop() {
        let mut buffer = TextBuffer::from_text("a\nb\nc");
        let kept = buffer.create_marker(0);
        {
            let mut scope = buffer.marker_scope();
            scope.create_marker(1);
            scope.create_marker(3);
            assert_eq!(scope.marker_count(), 3);
        }
        assert_eq!(buffer.marker_count(), 1);
        assert_eq!(buffer.marker_offset(kept), Some(0));
    }

    #[test]
    fn test_bulk_scope_is_transparent() {
        let mut buffer = TextBuffer::from_text("a\nb");
        let inside = buffer.in_bulk(true, |buffer| {
            buffer.delete(1..2).unwrap();
            buffer.is_in_bulk()
        });
        assert!(inside);
        assert!(!buffer.is_in_bulk());
        assert_eq!(buffer.text(), "ab");
    }

    #[test]
    fn test_bulk_scope_closes_on_panic() {
        let mut buffer = TextBuffer::from_text("a\nb");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            buffer.in_bulk(true, |buffer| {
                buffer.delete(1..2).unwrap();
                panic!("collaborator failed");
            })
        }));
        assert!(result.is_err());
        assert!(!buffer.is_in_bulk());
        assert_eq!(buffer.text(), "ab");
    }

    #[test]
    fn test_caret_marker_survives_swallowing_edit() {
        let mut buffer = TextBuffer::from_text("ab    c");
        let caret = buffer.create_caret_marker(4);
        let range = buffer.create_marker(4);

        buffer.replace(2..6, " ").unwrap();
        assert_eq!(buffer.marker_offset(caret), Some(3));
        assert_eq!(buffer.marker_offset(range), None);
    }

    #[test]
    fn test_compact_log_drops_old_records() {
        let mut buffer = TextBuffer::from_text("abc");
        buffer.insert(0, "x").unwrap();
        buffer.insert(0, "y").unwrap();
        buffer.delete(0..1).unwrap();

        assert_eq!(buffer.compact_log(2), 2);
        assert_eq!(buffer.version(), 3);
        assert_eq!(buffer.oldest_version(), 2);
        assert!(buffer.edits_since(1).is_none());
        assert_eq!(buffer.edits_since(2).map(<[_]>::len), Some(1));

        // Compaction never runs past the current version.
        assert_eq!(buffer.compact_log(10), 1);
        assert_eq!(buffer.version(), 3);
        assert_eq!(buffer.edits_since(3).map(<[_]>::len), Some(0));
        assert_eq!(buffer.compact_log(1), 0);
    }
}
