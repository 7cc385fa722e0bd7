//! Callbacks a front end receives while a fetch or apply runs, and the flag
//! it uses to stop one early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pipeline::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Work is outstanding but its size is not known yet
    Indeterminate,
    /// Completed share of the work, 0.0 to 1.0
    Fraction(f64),
}

impl Progress {
    pub fn of(done: usize, total: usize) -> Self {
        if total == 0 {
            Progress::Fraction(1.0)
        } else {
            Progress::Fraction(done as f64 / total as f64)
        }
    }
}

/// Receives progress, status lines and pipeline transitions.
///
/// All methods default to doing nothing.
pub trait Observer: Send + Sync {
    fn on_progress(&self, _progress: Progress) {}

    fn on_status(&self, _message: &str) {}

    fn on_transition(&self, _state: &PipelineState) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Best-effort stop request, checked between suspension points.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
