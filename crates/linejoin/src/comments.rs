//! End-of-line comment conversion.
//!
//! A line comment that ends a line would swallow the joined text, so before any line break is
//! removed `x = 1; // note` followed by code is rewritten as `x = 1; /* note*/`.

use crate::buffer::TextBuffer;
use crate::caret::LineRange;
use crate::error::Canceled;
use crate::join_point::JoinPoint;
use crate::progress::ProgressContext;
use crate::syntax::{CommentKind, CommentNode, SyntaxView};
use linejoin_lang::CommentConfig;

/// Convert every trailing line comment in `lines` whose next content is not itself a comment.
///
/// Returns the number of comments converted.
pub(crate) fn convert_end_comments(
    buffer: &mut TextBuffer,
    syntax: &mut dyn SyntaxView,
    comments: &CommentConfig,
    lines: LineRange,
    progress: &mut ProgressContext<'_>,
) -> Result<usize, Canceled> {
    let mut candidates = Vec::new();
    for i in 0..lines.line_count {
        progress.check_canceled()?;
        progress.set_step(0.0, 0.05, i, lines.line_count);

        let Some(point) = JoinPoint::at(buffer, lines.start_line + i) else {
            break;
        };
        if point.is_blank_line() {
            continue;
        }
        let Some(comment) = syntax.comment_at(buffer, point.last_non_space - 1) else {
            continue;
        };
        let next = buffer.skip_whitespace_forward(point.first_non_space_in_next);
        if syntax.comment_at(buffer, next).is_none() {
            candidates.push(comment);
        }
    }

    // Bottom-up, so earlier candidates keep their offsets.
    let total = candidates.len();
    let mut converted = 0;
    for (i, comment) in candidates.iter().rev().enumerate() {
        progress.check_canceled()?;
        progress.set_step(0.05, 0.05, i, total);
        if convert(buffer, syntax, comments, comment) {
            converted += 1;
        }
    }

    if converted > 0 {
        tracing::debug!(converted, "converted end-of-line comments");
        syntax.resync(buffer);
    }
    Ok(converted)
}

fn convert(
    buffer: &mut TextBuffer,
    syntax: &mut dyn SyntaxView,
    comments: &CommentConfig,
    comment: &CommentNode,
) -> bool {
    if comment.kind != CommentKind::Line {
        return false;
    }
    let text = buffer.slice(comment.range.clone());
    let Some(block) = comments.line_to_block(&text) else {
        return false;
    };

    match syntax.replace_comment(buffer, comment, &block) {
        Ok(()) => true,
        Err(err) => {
            tracing::info!(%err, start = comment.range.start, "cannot convert line comment");
            false
        }
    }
}
