#![warn(missing_docs)]
//! linejoin - Headless Join-Lines Engine
//!
//! # Overview
//!
//! `linejoin` implements the "join lines" editing command without any editor attached: it merges
//! the line under the caret (or every line a selection touches) with the following line(s),
//! letting language-aware strategies decide how each boundary is glued, and falls back to a
//! formatter-driven whitespace rule otherwise.
//!
//! # Pipeline
//!
//! ```text
//! resolve range → convert end-of-line comments → raw strategies
//!     → remove line breaks (markers) → standard strategies → adjust whitespace → caret
//! ```
//!
//! Every phase reports progress and checks for cancellation through a [`ProgressReporter`].
//!
//! # Quick Start
//!
//! ```rust
//! use linejoin::{
//!     Caret, CommentConfig, IndentFormatter, JoinLines, JoinTarget, LexicalSyntax, NoProgress,
//!     TextBuffer,
//! };
//!
//! let comments = CommentConfig::c_style();
//! let mut buffer = TextBuffer::from_text("let x = 1; // one\n    let y = 2;\n");
//! let mut syntax = LexicalSyntax::for_buffer(comments.clone(), &buffer);
//! let mut formatter = IndentFormatter::default();
//! let mut caret = Caret::at(0);
//!
//! let engine = JoinLines::builtin();
//! let outcome = engine
//!     .run(
//!         JoinTarget {
//!             buffer: &mut buffer,
//!             syntax: &mut syntax,
//!             formatter: &mut formatter,
//!             comments: &comments,
//!         },
//!         &mut caret,
//!         &mut NoProgress,
//!     )
//!     .unwrap();
//!
//! assert_eq!(buffer.text(), "let x = 1; /* one*/ let y = 2;\n");
//! assert_eq!(outcome.lines_removed, 1);
//! assert_eq!(caret.offset, 19);
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - Rope-backed text buffer with an edit log and tracked markers
//! - [`syntax`] - Structural view of the buffer (comments)
//! - [`format`] - Formatting service and the formatter-disabled guard
//! - [`strategy`] - Join strategies and their registry
//! - [`progress`] - Progress reporting and cancellation
//! - [`caret`] - Line-range resolution and caret placement
//! - [`engine`] - The pipeline

pub mod buffer;
pub mod caret;
mod comments;
pub mod config;
pub mod edit_log;
pub mod engine;
pub mod error;
pub mod format;
mod join_point;
mod marker;
pub mod progress;
pub mod strategy;
pub mod syntax;

pub use buffer::{MarkerScope, TextBuffer};
pub use caret::{Caret, CaretCandidate, LineRange, resolve_line_range};
pub use config::JoinConfig;
pub use edit_log::EditRecord;
pub use engine::{JoinLines, JoinOutcome, JoinTarget};
pub use error::{BufferError, Canceled};
pub use format::{Formatter, FormatterDisabled, IndentFormatter};
pub use linejoin_lang::CommentConfig;
pub use marker::{MarkerId, MarkerKind};
pub use progress::{CancelFlag, NoProgress, Phase, ProgressContext, ProgressReporter};
pub use strategy::{
    ContinuationJoiner, JoinContext, JoinStrategy, LineCommentJoiner, LineJoiner, RawLineJoiner,
    StrategyKind, StrategyRegistry, TrailingCommaJoiner,
};
pub use syntax::{CommentKind, CommentNode, LexicalSyntax, SyntaxView};
