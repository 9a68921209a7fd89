//! Structural view of a buffer.
//!
//! The join pipeline only needs a small slice of a syntax tree: "which comment covers this
//! offset", "replace this comment" and "catch up with the buffer". [`SyntaxView`] is that slice.
//! [`LexicalSyntax`] implements it with a comment scanner driven by a [`CommentConfig`];
//! `linejoin-treesitter` implements it on top of a real parse tree.

use crate::buffer::TextBuffer;
use crate::error::BufferError;
use linejoin_lang::CommentConfig;
use std::ops::Range;

/// Kind of a comment node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// A plain line comment (`// note`).
    Line,
    /// A documentation line comment (`/// doc`, `//! doc`).
    Doc,
    /// A block comment (`/* note */`).
    Block,
}

/// A comment located in the buffer (character offsets, half-open, line break excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    /// Character range of the comment.
    pub range: Range<usize>,
    /// Comment kind.
    pub kind: CommentKind,
}

/// Structural view consumed by the join pipeline.
pub trait SyntaxView {
    /// The comment covering `offset`, if any.
    fn comment_at(&self, buffer: &TextBuffer, offset: usize) -> Option<CommentNode>;

    /// Replace a comment node with `text`.
    ///
    /// The default implementation edits the buffer; the view is resynchronized by the caller.
    fn replace_comment(
        &mut self,
        buffer: &mut TextBuffer,
        node: &CommentNode,
        text: &str,
    ) -> Result<(), BufferError> {
        buffer.replace(node.range.clone(), text)
    }

    /// Bring the view up to date with the buffer.
    fn resync(&mut self, buffer: &TextBuffer);
}

/// A [`SyntaxView`] that finds comments lexically.
///
/// Double-quoted string literals (with backslash escapes) are skipped so that `"http://x"` is not
/// mistaken for a comment. When the config is documentation-aware, a line comment whose prefix is
/// followed by `!` or by the prefix's last character once more (`//!`, `///`, but not `////`) is
/// reported as [`CommentKind::Doc`].
#[derive(Debug, Clone)]
pub struct LexicalSyntax {
    config: CommentConfig,
    comments: Vec<CommentNode>,
    synced_version: Option<u64>,
}

impl LexicalSyntax {
    /// Create a view for the given comment syntax. Call [`SyntaxView::resync`] before use.
    pub fn new(config: CommentConfig) -> Self {
        Self {
            config,
            comments: Vec::new(),
            synced_version: None,
        }
    }

    /// Create a view already synchronized with `buffer`.
    pub fn for_buffer(config: CommentConfig, buffer: &TextBuffer) -> Self {
        let mut syntax = Self::new(config);
        syntax.resync(buffer);
        syntax
    }

    /// Comment syntax this view scans for.
    pub fn config(&self) -> &CommentConfig {
        &self.config
    }

    /// All comments found by the last scan, in buffer order.
    pub fn comments(&self) -> &[CommentNode] {
        &self.comments
    }

    fn scan(&self, text: &str) -> Vec<CommentNode> {
        let chars: Vec<char> = text.chars().collect();
        let line = token_chars(self.config.line.as_deref());
        let block_start = token_chars(self.config.block_start.as_deref());
        let block_end = token_chars(self.config.block_end.as_deref());

        let mut comments = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '"' {
                i = skip_string(&chars, i + 1);
                continue;
            }

            if let (Some(start), Some(end)) = (&block_start, &block_end) {
                if matches_at(&chars, i, start) {
                    let close = find_from(&chars, i + start.len(), end)
                        .map_or(chars.len(), |at| at + end.len());
                    comments.push(CommentNode {
                        range: i..close,
                        kind: CommentKind::Block,
                    });
                    i = close;
                    continue;
                }
            }

            if let Some(prefix) = &line {
                if matches_at(&chars, i, prefix) {
                    let end = chars[i..]
                        .iter()
                        .position(|ch| *ch == '\n' || *ch == '\r')
                        .map_or(chars.len(), |len| i + len);
                    let kind = if self.config.doc_aware
                        && is_doc_tail(&chars[i + prefix.len()..end], prefix)
                    {
                        CommentKind::Doc
                    } else {
                        CommentKind::Line
                    };
                    comments.push(CommentNode {
                        range: i..end,
                        kind,
                    });
                    i = end;
                    continue;
                }
            }

            i += 1;
        }
        comments
    }
}

impl SyntaxView for LexicalSyntax {
    fn comment_at(&self, _buffer: &TextBuffer, offset: usize) -> Option<CommentNode> {
        let index = self
            .comments
            .partition_point(|comment| comment.range.start <= offset);
        let comment = self.comments.get(index.checked_sub(1)?)?;
        comment.range.contains(&offset).then(|| comment.clone())
    }

    fn resync(&mut self, buffer: &TextBuffer) {
        let version = buffer.version();
        if self.synced_version == Some(version) {
            return;
        }
        self.comments = self.scan(&buffer.text());
        self.synced_version = Some(version);
        tracing::trace!(version, comments = self.comments.len(), "lexical syntax resynced");
    }
}

fn token_chars(token: Option<&str>) -> Option<Vec<char>> {
    token
        .filter(|token| !token.is_empty())
        .map(|token| token.chars().collect())
}

fn matches_at(chars: &[char], at: usize, token: &[char]) -> bool {
    chars.get(at..at + token.len()) == Some(token)
}

fn find_from(chars: &[char], from: usize, token: &[char]) -> Option<usize> {
    (from..chars.len()).find(|at| matches_at(chars, *at, token))
}

fn skip_string(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            '\n' => return i,
            _ => i += 1,
        }
    }
    chars.len()
}

fn is_doc_tail(tail: &[char], prefix: &[char]) -> bool {
    match (tail.first(), tail.get(1), prefix.last()) {
        (Some('!'), _, _) => true,
        (Some(first), second, Some(last)) => first == last && second != Some(last),
        _ => false,
    }
}
