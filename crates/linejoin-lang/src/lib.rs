#![warn(missing_docs)]
//! `linejoin-lang` - data-driven language configuration helpers for `linejoin`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any parsing or
//! formatting system. It describes the comment syntax of a language so the join-lines engine can
//! rewrite comments in a language-aware way.

/// Comment tokens/config for a given language.
///
/// The join-lines engine uses this to turn a trailing line comment into a block comment before
/// the line below is appended to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
    /// Whether the language distinguishes documentation comments from plain line comments.
    ///
    /// Only documentation-aware configs allow line comments to be rewritten, because only they
    /// can tell a plain `// note` from a `/// doc` that must keep its form.
    pub doc_aware: bool,
}

impl CommentConfig {
    /// Create a config that supports only line comments.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            ..Self::default()
        }
    }

    /// Create a config that supports only block comments.
    pub fn block(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            block_start: Some(start.into()),
            block_end: Some(end.into()),
            ..Self::default()
        }
    }

    /// Create a config that supports both line and block comments.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
            doc_aware: false,
        }
    }

    /// `//`, `/* */`, documentation-aware. Fits C, C++, Java, Rust, Go, JavaScript.
    pub fn c_style() -> Self {
        Self::line_and_block("//", "/*", "*/").documentation_aware()
    }

    /// Mark the config as documentation-aware.
    pub fn documentation_aware(mut self) -> Self {
        self.doc_aware = true;
        self
    }

    /// Returns `true` if a line comment token is configured.
    pub fn has_line(&self) -> bool {
        self.line.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if both block comment tokens are configured.
    pub fn has_block(&self) -> bool {
        self.block_start.as_deref().is_some_and(|s| !s.is_empty())
            && self.block_end.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns `true` if a line comment written with this config can be rewritten as a block
    /// comment.
    pub fn can_convert_line_to_block(&self) -> bool {
        self.doc_aware && self.has_line() && self.has_block()
    }

    /// Rewrite the text of a line comment (`// text`) as a block comment (`/* text*/`).
    ///
    /// The line prefix is stripped, occurrences of the block end token inside the text are
    /// broken up by a space after their first character (`*/` becomes `* /`) and the result is
    /// wrapped in the block tokens. Returns `None` when the config cannot convert.
    pub fn line_to_block(&self, comment: &str) -> Option<String> {
        if !self.can_convert_line_to_block() {
            return None;
        }
        let line = self.line.as_deref()?;
        let start = self.block_start.as_deref()?;
        let end = self.block_end.as_deref()?;

        let mut body = comment.strip_prefix(line).unwrap_or(comment).to_string();
        let mut end_chars = end.chars();
        if let Some(first) = end_chars.next() {
            let rest = end_chars.as_str();
            if !rest.is_empty() {
                body = body.replace(end, &format!("{first} {rest}"));
            }
        }

        Some(format!("{start}{body}{end}"))
    }
}
