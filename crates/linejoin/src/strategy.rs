//! Join strategies and their registry.
//!
//! A strategy is asked, boundary by boundary, whether it wants to join two lines itself. It gets
//! the whitespace run between the left and the right content as a half-open range
//! `start..end` (`start` is just past the last non-whitespace character on the left, `end` is
//! the first non-whitespace character on the right), may edit the buffer, and returns the offset
//! where the caret should end up. `None` means "not applicable".
//!
//! *Raw* strategies are asked first, while the line separator and all original whitespace are
//! still in place. *Standard* strategies are asked after the separator is gone. Raw strategies
//! also take part in the standard round through their [`LineJoiner`] face.

use crate::buffer::TextBuffer;
use crate::syntax::{CommentKind, SyntaxView};
use linejoin_lang::CommentConfig;
use std::fmt;
use std::ops::Range;

/// Everything a strategy may look at or edit.
pub struct JoinContext<'a> {
    /// The buffer being joined.
    pub buffer: &'a mut TextBuffer,
    /// Structural view of the buffer, synchronized before each round.
    pub syntax: &'a mut dyn SyntaxView,
    /// Comment syntax of the buffer's language.
    pub comments: &'a CommentConfig,
}

/// A standard join rule, run after the line separator has been removed.
pub trait LineJoiner {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Join the boundary `range`, returning the caret offset, or `None` if not applicable.
    fn try_join_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize>;
}

/// A raw join rule, run before the line separator is removed.
pub trait RawLineJoiner: LineJoiner {
    /// Join the boundary `range` (which still contains the line separator and may span blank
    /// lines), returning the caret offset, or `None` if not applicable.
    fn try_join_raw_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize>;
}

/// Kind of a [`JoinStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Runs before separator removal (and again in the standard round).
    Raw,
    /// Runs after separator removal.
    Standard,
}

/// A registered strategy.
pub enum JoinStrategy {
    /// A raw strategy.
    Raw(Box<dyn RawLineJoiner>),
    /// A standard strategy.
    Standard(Box<dyn LineJoiner>),
}

impl JoinStrategy {
    /// Wrap a raw joiner.
    pub fn raw(joiner: impl RawLineJoiner + 'static) -> Self {
        Self::Raw(Box::new(joiner))
    }

    /// Wrap a standard joiner.
    pub fn standard(joiner: impl LineJoiner + 'static) -> Self {
        Self::Standard(Box::new(joiner))
    }

    /// Kind of this strategy.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Raw(_) => StrategyKind::Raw,
            Self::Standard(_) => StrategyKind::Standard,
        }
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        self.joiner().name()
    }

    /// The standard face, available for every strategy.
    pub fn joiner(&self) -> &dyn LineJoiner {
        match self {
            Self::Raw(joiner) => {
                let joiner: &dyn LineJoiner = joiner.as_ref();
                joiner
            }
            Self::Standard(joiner) => joiner.as_ref(),
        }
    }

    /// The raw face, for raw strategies only.
    pub fn as_raw(&self) -> Option<&dyn RawLineJoiner> {
        match self {
            Self::Raw(joiner) => Some(joiner.as_ref()),
            Self::Standard(_) => None,
        }
    }
}

impl fmt::Debug for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(match self.kind() {
            StrategyKind::Raw => "Raw",
            StrategyKind::Standard => "Standard",
        })
        .field(&self.name())
        .finish()
    }
}

/// Ordered list of strategies. Registration order is query order.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: Vec<JoinStrategy>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategies: [`LineCommentJoiner`], [`ContinuationJoiner`]
    /// and [`TrailingCommaJoiner`].
    pub fn builtin() -> Self {
        Self::new()
            .with(JoinStrategy::raw(LineCommentJoiner))
            .with(JoinStrategy::raw(ContinuationJoiner::default()))
            .with(JoinStrategy::standard(TrailingCommaJoiner))
    }

    /// Append a strategy (builder style).
    pub fn with(mut self, strategy: JoinStrategy) -> Self {
        self.push(strategy);
        self
    }

    /// Append a strategy.
    pub fn push(&mut self, strategy: JoinStrategy) {
        self.strategies.push(strategy);
    }

    /// All strategies, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &JoinStrategy> {
        self.strategies.iter()
    }

    /// Raw strategies, in registration order.
    pub fn raw(&self) -> impl Iterator<Item = (&str, &dyn RawLineJoiner)> {
        self.strategies
            .iter()
            .filter_map(|strategy| strategy.as_raw().map(|raw| (strategy.name(), raw)))
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` if no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Merges two consecutive line comments: `// a` + `// b` becomes `// a b`.
///
/// Raw only: once the separator is gone the two comments read as one.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCommentJoiner;

impl LineJoiner for LineCommentJoiner {
    fn name(&self) -> &str {
        "line-comment"
    }

    fn try_join_lines(&self, _cx: &mut JoinContext<'_>, _range: Range<usize>) -> Option<usize> {
        None
    }
}

impl RawLineJoiner for LineCommentJoiner {
    fn try_join_raw_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        let prefix = cx.comments.line.as_deref().filter(|p| !p.is_empty())?;
        if cx.buffer.slice(range.clone()).matches('\n').count() != 1 {
            return None;
        }

        let left = cx.syntax.comment_at(cx.buffer, range.start.checked_sub(1)?)?;
        let right = cx.syntax.comment_at(cx.buffer, range.end)?;
        if left.kind != CommentKind::Line
            || right.kind != CommentKind::Line
            || right.range.start != range.end
        {
            return None;
        }

        let text_start = range.end + prefix.chars().count();
        if cx.buffer.slice(range.end..text_start) != prefix {
            return None;
        }
        let text_start = cx.buffer.skip_spaces_forward(text_start, right.range.end);
        let glue = if text_start == right.range.end { "" } else { " " };
        cx.buffer.replace(range.start..text_start, glue).ok()?;
        Some(range.start)
    }
}

/// Joins a line ending in an explicit continuation token (`\` by default) by removing the token,
/// the separator and the whitespace up to the next content, leaving a single space.
#[derive(Debug, Clone)]
pub struct ContinuationJoiner {
    token: String,
}

impl ContinuationJoiner {
    /// Use `token` as the continuation token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn join(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        if self.token.is_empty() {
            return None;
        }
        let token_start = range.start.checked_sub(self.token.chars().count())?;
        if cx.buffer.slice(token_start..range.start) != self.token
            || cx.syntax.comment_at(cx.buffer, token_start).is_some()
        {
            return None;
        }

        let left = cx.buffer.skip_spaces_backward(token_start, 0);
        let glue = if range.end >= cx.buffer.len_chars() {
            ""
        } else {
            " "
        };
        cx.buffer.replace(left..range.end, glue).ok()?;
        Some(left)
    }
}

impl Default for ContinuationJoiner {
    fn default() -> Self {
        Self::new("\\")
    }
}

impl LineJoiner for ContinuationJoiner {
    fn name(&self) -> &str {
        "continuation"
    }

    fn try_join_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        self.join(cx, range)
    }
}

impl RawLineJoiner for ContinuationJoiner {
    fn try_join_raw_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        self.join(cx, range)
    }
}

/// Drops a trailing comma when the joined content starts with a closing bracket:
/// `f(a,` + `)` becomes `f(a)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrailingCommaJoiner;

impl LineJoiner for TrailingCommaJoiner {
    fn name(&self) -> &str {
        "trailing-comma"
    }

    fn try_join_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        let comma = range.start.checked_sub(1)?;
        if cx.buffer.char_at(comma) != Some(',')
            || !matches!(cx.buffer.char_at(range.end), Some(')' | ']' | '}'))
            || cx.syntax.comment_at(cx.buffer, comma).is_some()
        {
            return None;
        }
        cx.buffer.delete(comma..range.end).ok()?;
        Some(comma)
    }
}
