//! Structured record of buffer mutations.
//!
//! Every mutation of a [`TextBuffer`](crate::TextBuffer) is appended to its edit log. Derived
//! state (markers, structural views) catches up by replaying the records it has not seen yet,
//! instead of diffing old and new text. Offsets are **character offsets**.

/// A single text edit expressed in character offsets.
///
/// Semantics:
/// - `start` is a character offset in the buffer **at the time this edit is applied**.
/// - The deleted range is defined by the length (in `char`s) of `deleted_text`.
/// - Records must be replayed **in order**.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    /// Start character offset of the edit.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl EditRecord {
    /// Length of `deleted_text` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end character offset in the pre-edit buffer.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }

    /// Returns `true` if the record only inserts text.
    pub fn is_insertion(&self) -> bool {
        self.deleted_text.is_empty()
    }
}

/// Append-only list of [`EditRecord`]s.
///
/// The version of a buffer is the number of records ever pushed. Old records can be dropped
/// with [`EditLog::compact`]; `base` counts them.
#[derive(Debug, Default, Clone)]
pub(crate) struct EditLog {
    base: u64,
    records: Vec<EditRecord>,
}

impl EditLog {
    pub(crate) fn push(&mut self, record: EditRecord) {
        self.records.push(record);
    }

    pub(crate) fn version(&self) -> u64 {
        self.base + self.records.len() as u64
    }

    /// Oldest version [`EditLog::since`] still answers for.
    pub(crate) fn base_version(&self) -> u64 {
        self.base
    }

    /// Records applied after `version`, or `None` if `version` is in the future or compacted.
    pub(crate) fn since(&self, version: u64) -> Option<&[EditRecord]> {
        let index = usize::try_from(version.checked_sub(self.base)?).ok()?;
        self.records.get(index..)
    }

    /// Drop the records older than `before`. Returns how many were dropped.
    pub(crate) fn compact(&mut self, before: u64) -> usize {
        let before = before.min(self.version());
        let count = usize::try_from(before.saturating_sub(self.base))
            .unwrap_or(self.records.len())
            .min(self.records.len());
        self.records.drain(..count);
        self.base += count as u64;
        count
    }
}
