//! Progress reporting and cooperative cancellation.

use crate::error::Canceled;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phase of the join pipeline, used as the progress label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Rewriting trailing line comments as block comments.
    ConvertingComments,
    /// Raw strategies and generic line-break removal.
    RemovingLineBreaks,
    /// Standard strategies on the collected markers.
    Postprocessing,
    /// Default spacing on the markers no strategy took.
    AdjustingWhitespace,
}

impl Phase {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Phase::ConvertingComments => "Converting end-of-line comments",
            Phase::RemovingLineBreaks => "Removing line-breaks",
            Phase::Postprocessing => "Postprocessing",
            Phase::AdjustingWhitespace => "Adjusting white-space",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receiver of progress updates and source of cancellation requests.
pub trait ProgressReporter {
    /// A new phase started.
    fn set_phase(&mut self, phase: Phase);

    /// Overall completion in `[0, 1]`. Never decreases within one run.
    fn set_fraction(&mut self, fraction: f64);

    /// Returns `true` once cancellation has been requested.
    fn is_canceled(&mut self) -> bool;
}

/// A reporter that ignores updates and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn set_phase(&mut self, _phase: Phase) {}

    fn set_fraction(&mut self, _fraction: f64) {}

    fn is_canceled(&mut self) -> bool {
        false
    }
}

/// A cancellation flag that can be shared with another thread (e.g. a UI "cancel" button).
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    canceled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a flag that is not canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }
}

impl ProgressReporter for CancelFlag {
    fn set_phase(&mut self, _phase: Phase) {}

    fn set_fraction(&mut self, _fraction: f64) {}

    fn is_canceled(&mut self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// Progress state threaded through every phase of one run.
///
/// Keeps the reported fraction monotonic and clamped to `[0, 1]`, and turns cancellation
/// requests into [`Canceled`] errors, except inside [`ProgressContext::non_cancelable`] sections.
pub struct ProgressContext<'a> {
    reporter: &'a mut dyn ProgressReporter,
    fraction: f64,
    phase: Option<Phase>,
    non_cancelable: usize,
}

impl<'a> ProgressContext<'a> {
    /// Wrap a reporter.
    pub fn new(reporter: &'a mut dyn ProgressReporter) -> Self {
        Self {
            reporter,
            fraction: 0.0,
            phase: None,
            non_cancelable: 0,
        }
    }

    /// Switch the phase label.
    pub fn set_phase(&mut self, phase: Phase) {
        if self.phase != Some(phase) {
            tracing::debug!(%phase, "join phase");
            self.phase = Some(phase);
            self.reporter.set_phase(phase);
        }
    }

    /// Current phase, if any was set.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Report overall completion. Values below the last reported fraction are ignored.
    pub fn set_fraction(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction > self.fraction {
            self.fraction = fraction;
            self.reporter.set_fraction(fraction);
        }
    }

    /// Report progress `done / total` inside the band `[from, from + width]`.
    pub fn set_step(&mut self, from: f64, width: f64, done: usize, total: usize) {
        let ratio = if total == 0 {
            0.0
        } else {
            done as f64 / total as f64
        };
        self.set_fraction(from + width * ratio);
    }

    /// Last reported fraction.
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Fail with [`Canceled`] if cancellation was requested.
    pub fn check_canceled(&mut self) -> Result<(), Canceled> {
        if self.non_cancelable == 0 && self.reporter.is_canceled() {
            tracing::debug!(phase = ?self.phase, fraction = self.fraction, "join canceled");
            return Err(Canceled);
        }
        Ok(())
    }

    /// Run `f` as one uninterruptible unit: cancellation is not observed inside it.
    pub fn non_cancelable<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.non_cancelable += 1;
        let result = f(self);
        self.non_cancelable -= 1;
        result
    }
}
