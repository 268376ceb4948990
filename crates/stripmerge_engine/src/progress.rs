// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progress reporting and cooperative abort.

/// Reporter's answer to a progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressControl {
    /// Keep going
    #[default]
    Continue,
    /// Stop the merge; visibility is still restored
    Abort,
}

/// Receives whole-percent progress updates
pub trait ProgressReporter {
    /// Called with a percentage in `0..=100`, never twice with the same value
    /// and never with a smaller one than before
    fn report(&mut self, percent: u8) -> ProgressControl;
}

impl<F> ProgressReporter for F
where
    F: FnMut(u8) -> ProgressControl,
{
    fn report(&mut self, percent: u8) -> ProgressControl {
        self(percent)
    }
}

/// Reporter that ignores all updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _percent: u8) -> ProgressControl {
        ProgressControl::Continue
    }
}

/// Converts work steps into bounded-cadence percentage reports
pub struct ProgressTracker<'a> {
    reporter: &'a mut dyn ProgressReporter,
    total: usize,
    done: usize,
    reported: u8,
}

impl<'a> ProgressTracker<'a> {
    /// Track `total_steps` units of work
    pub fn new(reporter: &'a mut dyn ProgressReporter, total_steps: usize) -> Self {
        Self {
            reporter,
            total: total_steps.max(1),
            done: 0,
            reported: 0,
        }
    }

    /// Record one finished step
    pub fn step(&mut self) -> ProgressControl {
        self.done = self.done.saturating_add(1);
        // Rounded up, clamped at 100
        let percent = (self.done.saturating_mul(100).div_ceil(self.total)).min(100) as u8;
        if percent == self.reported {
            return ProgressControl::Continue;
        }
        self.reported = percent;
        self.reporter.report(percent)
    }
}
