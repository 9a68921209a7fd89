//! Formatting service consumed by the join pipeline.

use crate::buffer::{TextBuffer, is_inline_whitespace};
use crate::error::BufferError;
use std::ops::{Deref, DerefMut};

/// Formatting collaborator.
pub trait Formatter {
    /// Number of spaces wanted in front of the content starting at `offset`, or `None` when the
    /// formatter has no opinion.
    fn spacing_at(&self, buffer: &TextBuffer, offset: usize) -> Option<usize>;

    /// Re-indent `line` and return the offset of its first non-whitespace character.
    fn adjust_line_indent(&mut self, buffer: &mut TextBuffer, line: usize)
    -> Result<usize, BufferError>;

    /// Enable or disable reactive formatting.
    ///
    /// While disabled, the formatter must not reformat text on its own in response to edits;
    /// explicit requests ([`Formatter::spacing_at`], [`Formatter::adjust_line_indent`]) are still
    /// honored.
    fn set_disabled(&mut self, disabled: bool);

    /// Returns `true` while reactive formatting is disabled.
    fn is_disabled(&self) -> bool;
}

/// Guard keeping a formatter disabled while alive; restores the previous mode on drop.
pub struct FormatterDisabled<'a> {
    formatter: &'a mut dyn Formatter,
    was_disabled: bool,
}

impl<'a> FormatterDisabled<'a> {
    /// Disable `formatter` until the guard is dropped.
    pub fn new(formatter: &'a mut dyn Formatter) -> Self {
        let was_disabled = formatter.is_disabled();
        formatter.set_disabled(true);
        Self {
            formatter,
            was_disabled,
        }
    }
}

impl<'a> Deref for FormatterDisabled<'a> {
    type Target = dyn Formatter + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.formatter
    }
}

impl<'a> DerefMut for FormatterDisabled<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.formatter
    }
}

impl Drop for FormatterDisabled<'_> {
    fn drop(&mut self) {
        self.formatter.set_disabled(self.was_disabled);
    }
}

/// A small brace-aware formatter.
///
/// Spacing: no space after `(`/`[` and none before `)`, `]`, `,`, `;` or `.`; no opinion
/// otherwise. Indentation: a line gets the indentation of the closest non-blank line above it,
/// one unit deeper when that line ends with an opening bracket and one unit shallower when the
/// line itself starts with a closing bracket.
#[derive(Debug, Clone)]
pub struct IndentFormatter {
    indent_unit: String,
    disabled: bool,
}

impl IndentFormatter {
    /// Create a formatter indenting with `indent_unit` (e.g. four spaces or a tab).
    pub fn new(indent_unit: impl Into<String>) -> Self {
        Self {
            indent_unit: indent_unit.into(),
            disabled: false,
        }
    }

    /// Indentation unit.
    pub fn indent_unit(&self) -> &str {
        &self.indent_unit
    }

    fn desired_indent(&self, buffer: &TextBuffer, line: usize) -> String {
        let Some(above) = (0..line)
            .rev()
            .filter_map(|l| buffer.line_text(l))
            .find(|text| !text.trim().is_empty())
        else {
            return String::new();
        };

        let mut indent: String = above.chars().take_while(|c| is_inline_whitespace(*c)).collect();
        if above.trim_end().ends_with(['{', '(', '[']) {
            indent.push_str(&self.indent_unit);
        }

        let current = buffer.line_text(line).unwrap_or_default();
        if current.trim_start().starts_with(['}', ')', ']']) {
            let keep = indent.strip_suffix(self.indent_unit.as_str()).map(str::len);
            if let Some(keep) = keep {
                indent.truncate(keep);
            }
        }
        indent
    }
}

impl Default for IndentFormatter {
    fn default() -> Self {
        Self::new("    ")
    }
}

impl Formatter for IndentFormatter {
    fn spacing_at(&self, buffer: &TextBuffer, offset: usize) -> Option<usize> {
        if buffer
            .char_at(offset)
            .is_some_and(|ch| matches!(ch, ')' | ']' | ',' | ';' | '.'))
        {
            return Some(0);
        }
        let before = buffer.skip_spaces_backward(offset, 0);
        let left = before.checked_sub(1).and_then(|at| buffer.char_at(at));
        if matches!(left, Some('(' | '[')) {
            return Some(0);
        }
        None
    }

    fn adjust_line_indent(
        &mut self,
        buffer: &mut TextBuffer,
        line: usize,
    ) -> Result<usize, BufferError> {
        let start = buffer.line_start(line)?;
        let end = buffer.line_end(line)?;
        let content = buffer.skip_spaces_forward(start, end);
        let indent = self.desired_indent(buffer, line);

        if buffer.slice(start..content) != indent {
            buffer.replace(start..content, &indent)?;
        }
        Ok(start + indent.chars().count())
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }
}
