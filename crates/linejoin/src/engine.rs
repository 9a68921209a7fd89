//! The join-lines pipeline.
//!
//! One run goes through these phases, in order:
//!
//! 1. convert trailing line comments to block comments;
//! 2. offer every boundary to the raw strategies, deferring the ones nobody takes;
//! 3. remove the deferred line separators, leaving a marker at each join point;
//! 4. offer every marker to all strategies (standard round);
//! 5. normalize the whitespace at the markers nobody took.
//!
//! Each phase checks for cancellation between units of work. Edits already applied when a run is
//! canceled stay in the buffer; the caret is left alone.

use crate::buffer::TextBuffer;
use crate::caret::{Caret, CaretCandidate, LineRange, place_caret, resolve_line_range};
use crate::comments::convert_end_comments;
use crate::config::JoinConfig;
use crate::error::Canceled;
use crate::format::{Formatter, FormatterDisabled};
use crate::join_point::JoinPoint;
use crate::marker::MarkerId;
use crate::progress::{Phase, ProgressContext, ProgressReporter};
use crate::strategy::{JoinContext, StrategyRegistry};
use crate::syntax::SyntaxView;
use linejoin_lang::CommentConfig;
use std::ops::Range;

/// Collaborators of one run.
pub struct JoinTarget<'a> {
    /// Buffer to edit.
    pub buffer: &'a mut TextBuffer,
    /// Structural view of `buffer`.
    pub syntax: &'a mut dyn SyntaxView,
    /// Formatting service.
    pub formatter: &'a mut dyn Formatter,
    /// Comment syntax of the buffer's language.
    pub comments: &'a CommentConfig,
}

/// Result of a completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The caret was moved.
    pub caret_moved: bool,
    /// The host should scroll the caret into view.
    pub scroll_to_caret: bool,
    /// Lines the buffer lost.
    pub lines_removed: usize,
}

/// The join-lines engine: a strategy registry plus configuration.
#[derive(Debug, Default)]
pub struct JoinLines {
    registry: StrategyRegistry,
    config: JoinConfig,
}

impl JoinLines {
    /// Create an engine.
    pub fn new(registry: StrategyRegistry, config: JoinConfig) -> Self {
        Self { registry, config }
    }

    /// Engine with the built-in strategies and default configuration.
    pub fn builtin() -> Self {
        Self::new(StrategyRegistry::builtin(), JoinConfig::default())
    }

    /// Registered strategies.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Mutable access to the registry.
    pub fn registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// Configuration.
    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Join the lines selected by `caret`.
    ///
    /// Does nothing (and returns a default outcome) when the buffer is not writable or the caret
    /// is on the last line.
    pub fn run(
        &self,
        target: JoinTarget<'_>,
        caret: &mut Caret,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<JoinOutcome, Canceled> {
        let Some(lines) = resolve_line_range(target.buffer, caret) else {
            return Ok(JoinOutcome::default());
        };
        let _span = tracing::debug_span!(
            "join_lines",
            start_line = lines.start_line,
            line_count = lines.line_count
        )
        .entered();

        let lines_before = target.buffer.line_count();
        let mut progress = ProgressContext::new(reporter);
        let mut formatter = FormatterDisabled::new(target.formatter);
        let mut buffer = target.buffer.marker_scope();
        let selection_end = caret
            .selected_range()
            .map(|selection| buffer.create_caret_marker(selection.end));

        let mut run = JoinRun {
            buffer: &mut buffer,
            syntax: target.syntax,
            formatter: &mut *formatter,
            comments: target.comments,
            registry: &self.registry,
            config: &self.config,
            progress: &mut progress,
            start_line: lines.start_line,
            candidate: CaretCandidate::default(),
        };
        run.process(lines)?;
        let candidate = run.candidate;

        let selection_end = selection_end.and_then(|id| buffer.marker_offset(id));
        let (caret_moved, scroll_to_caret) = place_caret(caret, selection_end, candidate);
        let lines_removed = lines_before.saturating_sub(buffer.line_count());
        tracing::debug!(lines_removed, caret = caret.offset, "join lines finished");

        Ok(JoinOutcome {
            caret_moved,
            scroll_to_caret,
            lines_removed,
        })
    }
}

/// State of one run.
struct JoinRun<'r, 'p> {
    buffer: &'r mut TextBuffer,
    syntax: &'r mut dyn SyntaxView,
    formatter: &'r mut dyn Formatter,
    comments: &'r CommentConfig,
    registry: &'r StrategyRegistry,
    config: &'r JoinConfig,
    progress: &'r mut ProgressContext<'p>,
    start_line: usize,
    candidate: CaretCandidate,
}

impl JoinRun<'_, '_> {
    fn process(&mut self, lines: LineRange) -> Result<(), Canceled> {
        self.syntax.resync(self.buffer);

        self.progress.set_phase(Phase::ConvertingComments);
        if self.config.convert_end_comments {
            convert_end_comments(
                self.buffer,
                self.syntax,
                self.comments,
                lines,
                self.progress,
            )?;
        }
        self.progress.check_canceled()?;

        self.progress.set_phase(Phase::RemovingLineBreaks);
        let deferred = self.join_raw(lines.line_count)?;
        let markers = self.remove_line_breaks(deferred)?;
        self.syntax.resync(self.buffer);
        self.progress.check_canceled()?;

        self.progress.set_phase(Phase::Postprocessing);
        let unprocessed = self.join_standard(markers)?;
        self.progress.check_canceled()?;

        self.progress.set_phase(Phase::AdjustingWhitespace);
        self.adjust_whitespace(unprocessed)?;
        self.progress.set_fraction(1.0);
        Ok(())
    }

    /// Offer each boundary to the raw strategies. Returns how many boundaries are left for
    /// generic removal; they all follow `start_line`, since a taken boundary merges into it.
    fn join_raw(&mut self, line_count: usize) -> Result<usize, Canceled> {
        if self.registry.raw().next().is_none() {
            return Ok(line_count);
        }

        let mut line = self.start_line;
        let mut processed = 0;
        let mut lines_before = self.buffer.line_count();
        while processed < line_count {
            self.progress.check_canceled()?;
            self.progress.set_step(0.1, 0.2, processed, line_count);

            let Some(point) = JoinPoint::at(self.buffer, line) else {
                break;
            };
            let range = point.raw_range(self.buffer);
            if self.try_raw(range) {
                self.syntax.resync(self.buffer);
                let lines_after = self.buffer.line_count();
                processed += lines_before.saturating_sub(lines_after).max(1);
                lines_before = lines_after;
            } else {
                line += 1;
                processed += 1;
            }
        }
        Ok(line - self.start_line)
    }

    fn try_raw(&mut self, range: Range<usize>) -> bool {
        let mut cx = JoinContext {
            buffer: &mut *self.buffer,
            syntax: &mut *self.syntax,
            comments: self.comments,
        };
        for (name, joiner) in self.registry.raw() {
            if let Some(offset) = joiner.try_join_raw_lines(&mut cx, range.clone()) {
                let offset = clamp_offset(name, offset, cx.buffer.len_chars());
                tracing::trace!(strategy = name, offset, "raw join");
                self.candidate.offer(offset);
                return true;
            }
        }
        false
    }

    /// Remove `count` line separators after `start_line`, returning one marker per removed
    /// separator, last boundary first.
    fn remove_line_breaks(&mut self, count: usize) -> Result<Vec<MarkerId>, Canceled> {
        let bulk = count > self.config.bulk_threshold;
        let line = self.start_line;
        let Self {
            buffer,
            formatter,
            progress,
            candidate,
            ..
        } = self;

        buffer.in_bulk(bulk, |buffer| {
            let mut markers = Vec::with_capacity(count);
            for i in 0..count {
                progress.check_canceled()?;
                progress.set_step(0.3, 0.2, i, count);

                let Some(point) = JoinPoint::at(buffer, line) else {
                    break;
                };

                if point.is_blank_line() {
                    let range = point.line_start..point.first_non_space_in_next;
                    if let Err(err) = buffer.delete(range) {
                        tracing::warn!(%err, line, "cannot remove blank line");
                        break;
                    }
                    match formatter.adjust_line_indent(buffer, line) {
                        Ok(offset) => {
                            candidate.offer(offset);
                        }
                        Err(err) => tracing::warn!(%err, line, "cannot reindent joined line"),
                    }
                    continue;
                }

                let separator = point.line_end..point.line_end + buffer.line_separator_len(line);
                if let Err(err) = buffer.delete(separator) {
                    tracing::warn!(%err, line, "cannot remove line break");
                    break;
                }
                markers.push(buffer.create_marker(point.line_end));
            }
            markers.reverse();
            Ok(markers)
        })
    }

    /// Offer each marker to every strategy. Returns the markers nobody took.
    fn join_standard(&mut self, markers: Vec<MarkerId>) -> Result<Vec<MarkerId>, Canceled> {
        let total = markers.len();
        let mut unprocessed = Vec::new();
        for (i, id) in markers.into_iter().enumerate() {
            self.progress.check_canceled()?;
            self.progress.set_step(0.5, 0.2, i, total);

            let Some(at) = self.buffer.marker_offset(id) else {
                self.buffer.release_marker(id);
                continue;
            };

            let Self {
                buffer,
                syntax,
                comments,
                registry,
                progress,
                candidate,
                ..
            } = self;
            let joined = progress.non_cancelable(|_| {
                let mut cx = JoinContext {
                    buffer: &mut **buffer,
                    syntax: &mut **syntax,
                    comments: *comments,
                };
                join_at(&mut cx, registry, at, candidate)
            });

            if joined {
                self.buffer.release_marker(id);
            } else {
                unprocessed.push(id);
            }
        }
        Ok(unprocessed)
    }

    /// Replace the whitespace at each marker with the spacing the formatter asks for.
    ///
    /// All spacings are read before the first write.
    fn adjust_whitespace(&mut self, markers: Vec<MarkerId>) -> Result<(), Canceled> {
        let total = markers.len();
        let mut spacing = Vec::with_capacity(total);
        for (i, id) in markers.iter().enumerate() {
            self.progress.check_canceled()?;
            self.progress.set_step(0.7, 0.25, i, total);

            spacing.push(self.buffer.marker_offset(*id).map(|at| {
                let content = self.buffer.skip_spaces_forward(at, self.buffer.len_chars());
                self.formatter
                    .spacing_at(self.buffer, content)
                    .unwrap_or(self.config.default_spacing)
            }));
        }

        let bulk = total > self.config.bulk_threshold;
        let Self {
            buffer,
            progress,
            candidate,
            ..
        } = self;
        buffer.in_bulk(bulk, |buffer| {
            for (i, (id, spaces)) in markers.iter().zip(&spacing).enumerate() {
                progress.check_canceled()?;
                progress.set_step(0.95, 0.05, i, total);

                let (Some(at), Some(spaces)) = (buffer.marker_offset(*id), spaces) else {
                    buffer.release_marker(*id);
                    continue;
                };
                let start = buffer.skip_spaces_backward(at, 0);
                let end = buffer.skip_spaces_forward(at, buffer.len_chars());
                match buffer.replace(start..end, &" ".repeat(*spaces)) {
                    Ok(()) => {
                        candidate.offer(start);
                    }
                    Err(err) => tracing::warn!(%err, start, end, "cannot adjust whitespace"),
                }
                buffer.release_marker(*id);
            }
            Ok(())
        })
    }
}

/// Offer the join point at `at` to every strategy, in registration order.
fn join_at(
    cx: &mut JoinContext<'_>,
    registry: &StrategyRegistry,
    at: usize,
    candidate: &mut CaretCandidate,
) -> bool {
    let start = cx.buffer.skip_spaces_backward(at, 0);
    let end = cx.buffer.skip_spaces_forward(at, cx.buffer.len_chars());
    for strategy in registry.iter() {
        if let Some(offset) = strategy.joiner().try_join_lines(cx, start..end) {
            let offset = clamp_offset(strategy.name(), offset, cx.buffer.len_chars());
            tracing::trace!(strategy = strategy.name(), offset, "join");
            cx.syntax.resync(cx.buffer);
            candidate.offer(offset);
            return true;
        }
    }
    false
}

fn clamp_offset(strategy: &str, offset: usize, len: usize) -> usize {
    if offset > len {
        tracing::error!(strategy, offset, len, "join strategy returned an offset past the buffer end");
        return len;
    }
    offset
}
