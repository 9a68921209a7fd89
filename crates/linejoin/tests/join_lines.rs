use linejoin::{
    BufferError, CancelFlag, Canceled, Caret, CommentConfig, Formatter, IndentFormatter,
    JoinConfig, JoinContext, JoinLines, JoinOutcome, JoinStrategy, JoinTarget, LexicalSyntax,
    LineJoiner, NoProgress, Phase, ProgressReporter, StrategyRegistry, TextBuffer,
};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;

fn run_with(
    engine: &JoinLines,
    buffer: &mut TextBuffer,
    formatter: &mut dyn Formatter,
    caret: &mut Caret,
    reporter: &mut dyn ProgressReporter,
) -> Result<JoinOutcome, Canceled> {
    let comments = CommentConfig::c_style();
    let mut syntax = LexicalSyntax::new(comments.clone());
    engine.run(
        JoinTarget {
            buffer,
            syntax: &mut syntax,
            formatter,
            comments: &comments,
        },
        caret,
        reporter,
    )
}

fn join(engine: &JoinLines, text: &str, caret: &mut Caret) -> (String, JoinOutcome) {
    let mut buffer = TextBuffer::from_text(text);
    let mut formatter = IndentFormatter::default();
    let outcome = run_with(engine, &mut buffer, &mut formatter, caret, &mut NoProgress).unwrap();
    (buffer.text(), outcome)
}

fn plain() -> JoinLines {
    JoinLines::new(StrategyRegistry::new(), JoinConfig::default())
}

#[test]
fn test_join_collapses_indentation_to_one_space() {
    let mut caret = Caret::at(0);
    let (text, outcome) = join(&plain(), "foo\n    bar\n", &mut caret);

    assert_eq!(text, "foo bar\n");
    assert_eq!(caret, Caret::at(3));
    assert_eq!(
        outcome,
        JoinOutcome {
            caret_moved: true,
            scroll_to_caret: true,
            lines_removed: 1,
        }
    );
}

#[test]
fn test_join_crlf_line() {
    let mut caret = Caret::at(0);
    let (text, _) = join(&plain(), "a\r\n  b", &mut caret);
    assert_eq!(text, "a b");
}

#[test]
fn test_trailing_comment_becomes_block_comment() {
    let mut caret = Caret::at(4);
    let (text, outcome) = join(&plain(), "x()\n   // comment\ny()\n", &mut caret);

    assert_eq!(text, "x()\n   /* comment*/ y()\n");
    assert_eq!(caret.offset, 19);
    assert_eq!(outcome.lines_removed, 1);
}

#[test]
fn test_block_terminator_inside_comment_is_escaped() {
    let mut caret = Caret::at(0);
    let (text, _) = join(&plain(), "a(); // x */ y\nb();", &mut caret);
    assert_eq!(text, "a(); /* x * / y*/ b();");
}

#[test]
fn test_comment_conversion_can_be_disabled() {
    let engine = JoinLines::new(
        StrategyRegistry::new(),
        JoinConfig::default().with_end_comment_conversion(false),
    );
    let mut caret = Caret::at(0);
    let (text, _) = join(&engine, "a(); // x\nb();", &mut caret);
    assert_eq!(text, "a(); // x b();");
}

#[test]
fn test_guarded_comment_is_left_as_line_comment() {
    let mut buffer = TextBuffer::from_text("a(); // x\nb();");
    buffer.guard_range(5..9);
    let mut caret = Caret::at(0);

    run_with(
        &plain(),
        &mut buffer,
        &mut IndentFormatter::default(),
        &mut caret,
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(buffer.text(), "a(); // x b();");
}

#[test]
fn test_selection_joins_every_touched_line() {
    let text = "a\nb\nc\nd\n";
    let mut caret = Caret::with_selection(0..7);
    let (joined, outcome) = join(&plain(), text, &mut caret);

    assert_eq!(joined, "a b c d\n");
    assert_eq!(outcome.lines_removed, 3);
    assert_eq!(
        joined.matches('\n').count(),
        text.matches('\n').count() - 3
    );
    // The caret lands where the selection end went, without a selection.
    assert_eq!(caret, Caret::at(7));
    assert!(outcome.caret_moved);
    assert!(!outcome.scroll_to_caret);
}

#[test]
fn test_selection_ending_in_collapsed_indentation_keeps_caret_at_its_end() {
    let mut caret = Caret::with_selection(0..6);
    let (text, outcome) = join(&plain(), "a\nb\n    c", &mut caret);

    assert_eq!(text, "a b c");
    // The selection ended in the indentation before `c`.
    assert_eq!(caret, Caret::at(4));
    assert!(outcome.caret_moved);
    assert!(!outcome.scroll_to_caret);
}

#[test]
fn test_rejected_whitespace_adjustment_does_not_move_caret() {
    let mut buffer = TextBuffer::from_text("a\n  b");
    buffer.guard_range(2..4);
    let mut caret = Caret::at(0);

    let outcome = run_with(
        &plain(),
        &mut buffer,
        &mut IndentFormatter::default(),
        &mut caret,
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(buffer.text(), "a  b");
    assert_eq!(caret, Caret::at(0));
    assert_eq!(
        outcome,
        JoinOutcome {
            caret_moved: false,
            scroll_to_caret: false,
            lines_removed: 1,
        }
    );
}

#[test]
fn test_selection_ending_at_line_start_excludes_that_line() {
    let mut caret = Caret::with_selection(0..4);
    let (text, outcome) = join(&plain(), "a\nb\nc\nd", &mut caret);
    assert_eq!(text, "a b\nc\nd");
    assert_eq!(outcome.lines_removed, 1);
}

#[test]
fn test_blank_line_is_removed_and_next_line_reindented() {
    let mut caret = Caret::at(9);
    let (text, outcome) = join(
        &JoinLines::builtin(),
        "fn f() {\n    \n  x();\n}\n",
        &mut caret,
    );

    assert_eq!(text, "fn f() {\n    x();\n}\n");
    assert_eq!(caret.offset, 13);
    assert_eq!(outcome.lines_removed, 1);
}

#[test]
fn test_caret_on_last_line_does_nothing() {
    let mut caret = Caret::at(2);
    let (text, outcome) = join(&plain(), "a\nb", &mut caret);

    assert_eq!(text, "a\nb");
    assert_eq!(caret, Caret::at(2));
    assert_eq!(outcome, JoinOutcome::default());
}

#[test]
fn test_read_only_buffer_is_not_touched() {
    let mut buffer = TextBuffer::from_text("a\nb");
    buffer.set_read_only(true);
    let mut caret = Caret::at(0);

    let outcome = run_with(
        &plain(),
        &mut buffer,
        &mut IndentFormatter::default(),
        &mut caret,
        &mut NoProgress,
    )
    .unwrap();

    assert_eq!(outcome, JoinOutcome::default());
    assert_eq!(buffer.text(), "a\nb");
    assert_eq!(buffer.version(), 0);
}

#[test]
fn test_continuation_consumes_blank_lines() {
    let mut caret = Caret::at(0);
    let (text, outcome) = join(&JoinLines::builtin(), "a \\\n\n   b\nc", &mut caret);

    assert_eq!(text, "a b\nc");
    assert_eq!(caret.offset, 1);
    assert_eq!(outcome.lines_removed, 2);
}

#[test]
fn test_raw_join_inside_selection() {
    let text = "x \\\ny\nz";
    let mut caret = Caret::with_selection(0..text.len());
    let (joined, _) = join(&JoinLines::builtin(), text, &mut caret);

    assert_eq!(joined, "x y z");
    assert_eq!(caret, Caret::at(5));
}

#[test]
fn test_consecutive_line_comments_are_merged() {
    let mut caret = Caret::at(0);
    let (text, outcome) = join(&JoinLines::builtin(), "// a\n// b\nx", &mut caret);

    assert_eq!(text, "// a b\nx");
    assert_eq!(caret.offset, 4);
    assert_eq!(outcome.lines_removed, 1);
}

#[test]
fn test_trailing_comma_is_dropped_before_closing_bracket() {
    let mut caret = Caret::at(0);
    let (text, _) = join(&JoinLines::builtin(), "f(a,\n  )", &mut caret);

    assert_eq!(text, "f(a)");
    assert_eq!(caret.offset, 3);
}

#[test]
fn test_formatter_spacing_is_used() {
    let mut caret = Caret::with_selection(0..13);
    let (text, _) = join(&plain(), "call(\n  a\n  )", &mut caret);
    assert_eq!(text, "call(a)");
}

struct Counting {
    name: &'static str,
    calls: Rc<Cell<usize>>,
    glue: &'static str,
    result: Option<usize>,
}

impl LineJoiner for Counting {
    fn name(&self) -> &str {
        self.name
    }

    fn try_join_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        self.calls.set(self.calls.get() + 1);
        let offset = self.result?;
        cx.buffer.replace(range, self.glue).ok()?;
        Some(offset)
    }
}

fn counting(
    name: &'static str,
    glue: &'static str,
    result: Option<usize>,
) -> (JoinStrategy, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let strategy = JoinStrategy::standard(Counting {
        name,
        calls: Rc::clone(&calls),
        glue,
        result,
    });
    (strategy, calls)
}

#[test]
fn test_first_accepting_strategy_wins() {
    let (declining, declining_calls) = counting("declining", "", None);
    let (first, first_calls) = counting("first", "+", Some(1));
    let (second, second_calls) = counting("second", "-", Some(1));
    let registry = StrategyRegistry::new()
        .with(declining)
        .with(first)
        .with(second);
    let engine = JoinLines::new(registry, JoinConfig::default());

    let mut caret = Caret::at(0);
    let (text, _) = join(&engine, "a\n  b", &mut caret);

    assert_eq!(text, "a+b");
    assert_eq!(caret.offset, 1);
    assert_eq!(declining_calls.get(), 1);
    assert_eq!(first_calls.get(), 1);
    assert_eq!(second_calls.get(), 0);
}

#[test]
fn test_out_of_range_caret_offset_is_clamped() {
    let (strategy, _) = counting("overshooting", "", Some(1000));
    let engine = JoinLines::new(StrategyRegistry::new().with(strategy), JoinConfig::default());

    let mut caret = Caret::at(0);
    let (text, _) = join(&engine, "a\nb", &mut caret);

    assert_eq!(text, "ab");
    assert_eq!(caret.offset, 2);
}

/// Replaces everything from the buffer start to the join point, swallowing earlier markers.
struct Swallowing {
    calls: Rc<Cell<usize>>,
}

impl LineJoiner for Swallowing {
    fn name(&self) -> &str {
        "swallowing"
    }

    fn try_join_lines(&self, cx: &mut JoinContext<'_>, range: Range<usize>) -> Option<usize> {
        self.calls.set(self.calls.get() + 1);
        cx.buffer.replace(0..range.end, "X").ok()?;
        Some(1)
    }
}

#[test]
fn test_markers_swallowed_by_a_join_are_skipped() {
    let calls = Rc::new(Cell::new(0));
    let registry = StrategyRegistry::new().with(JoinStrategy::standard(Swallowing {
        calls: Rc::clone(&calls),
    }));
    let engine = JoinLines::new(registry, JoinConfig::default());
    let mut buffer = TextBuffer::from_text("a\nb\nc");
    let mut caret = Caret::with_selection(0..5);

    let outcome = run_with(
        &engine,
        &mut buffer,
        &mut IndentFormatter::default(),
        &mut caret,
        &mut NoProgress,
    )
    .unwrap();

    // The bottom join point swallowed the one above it, which is never offered.
    assert_eq!(buffer.text(), "Xc");
    assert_eq!(calls.get(), 1);
    assert_eq!(buffer.marker_count(), 0);
    assert_eq!(caret, Caret::at(2));
    assert_eq!(outcome.lines_removed, 2);
}

/// Cancels on the check following `allowed` checks in the line-break removal phase.
struct CancelAfter {
    phase: Option<Phase>,
    checks: usize,
    allowed: usize,
}

impl ProgressReporter for CancelAfter {
    fn set_phase(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }

    fn set_fraction(&mut self, _fraction: f64) {}

    fn is_canceled(&mut self) -> bool {
        if self.phase != Some(Phase::RemovingLineBreaks) {
            return false;
        }
        self.checks += 1;
        self.checks > self.allowed
    }
}

#[test]
fn test_cancel_keeps_completed_joins_and_releases_resources() {
    let mut buffer = TextBuffer::from_text("a\nb\nc\nd\ne\n");
    let mut formatter = IndentFormatter::default();
    let mut caret = Caret::with_selection(0..10);
    let mut reporter = CancelAfter {
        phase: None,
        checks: 0,
        allowed: 2,
    };

    let result = run_with(&plain(), &mut buffer, &mut formatter, &mut caret, &mut reporter);

    assert_eq!(result, Err(Canceled));
    assert_eq!(buffer.text(), "abc\nd\ne\n");
    assert_eq!(buffer.marker_count(), 0);
    assert!(!formatter.is_disabled());
    assert_eq!(caret, Caret::with_selection(0..10));
}

#[test]
fn test_cancel_before_start_changes_nothing() {
    let mut buffer = TextBuffer::from_text("a // x\nb");
    let mut flag = CancelFlag::new();
    flag.cancel();
    let mut caret = Caret::at(0);

    let result = run_with(
        &JoinLines::builtin(),
        &mut buffer,
        &mut IndentFormatter::default(),
        &mut caret,
        &mut flag,
    );

    assert_eq!(result, Err(Canceled));
    assert_eq!(buffer.text(), "a // x\nb");
    assert_eq!(buffer.version(), 0);
}

#[derive(Default)]
struct Recorder {
    phases: Vec<Phase>,
    fractions: Vec<f64>,
}

impl ProgressReporter for Recorder {
    fn set_phase(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    fn set_fraction(&mut self, fraction: f64) {
        self.fractions.push(fraction);
    }

    fn is_canceled(&mut self) -> bool {
        false
    }
}

#[test]
fn test_progress_visits_every_phase_monotonically() {
    let mut buffer = TextBuffer::from_text("a\nb\nc");
    let mut caret = Caret::with_selection(0..5);
    let mut recorder = Recorder::default();

    run_with(
        &JoinLines::builtin(),
        &mut buffer,
        &mut IndentFormatter::default(),
        &mut caret,
        &mut recorder,
    )
    .unwrap();

    assert_eq!(
        recorder.phases,
        vec![
            Phase::ConvertingComments,
            Phase::RemovingLineBreaks,
            Phase::Postprocessing,
            Phase::AdjustingWhitespace,
        ]
    );
    assert!(recorder.fractions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(recorder.fractions.last(), Some(&1.0));
}

/// Records the buffer and formatter state seen by every reindent request.
#[derive(Default)]
struct Observing {
    inner: IndentFormatter,
    seen: Vec<(bool, bool)>,
}

impl Formatter for Observing {
    fn spacing_at(&self, buffer: &TextBuffer, offset: usize) -> Option<usize> {
        self.inner.spacing_at(buffer, offset)
    }

    fn adjust_line_indent(
        &mut self,
        buffer: &mut TextBuffer,
        line: usize,
    ) -> Result<usize, BufferError> {
        self.seen.push((buffer.is_in_bulk(), self.inner.is_disabled()));
        self.inner.adjust_line_indent(buffer, line)
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.inner.set_disabled(disabled);
    }

    fn is_disabled(&self) -> bool {
        self.inner.is_disabled()
    }
}

fn observe_blank_lines(config: JoinConfig) -> (String, Vec<(bool, bool)>, bool) {
    let engine = JoinLines::new(StrategyRegistry::new(), config);
    let mut buffer = TextBuffer::from_text("\n\n\n\nb");
    let mut observer = Observing::default();
    let mut caret = Caret::with_selection(0..5);

    run_with(&engine, &mut buffer, &mut observer, &mut caret, &mut NoProgress).unwrap();
    let disabled = observer.is_disabled();
    (buffer.text(), observer.seen, disabled)
}

#[test]
fn test_large_batches_run_in_bulk_with_formatter_disabled() {
    let (text, seen, disabled_after) =
        observe_blank_lines(JoinConfig::default().with_bulk_threshold(3));

    assert_eq!(text, "b");
    assert_eq!(seen, vec![(true, true); 4]);
    assert!(!disabled_after);
}

#[test]
fn test_small_batches_do_not_use_bulk_mode() {
    let (text, seen, _) = observe_blank_lines(JoinConfig::default());

    assert_eq!(text, "b");
    assert_eq!(seen, vec![(false, true); 4]);
}
