// src/progress.rs
use std::time::Duration;

use crate::pacer::Eta;
use crate::store::SkipReason;

/// What the harvest loop reports while it runs. Frontends render these; the
/// loop itself never prints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Worklist ready. `already_done` ids were filtered out by the store.
    Begin { total: usize, already_done: usize },
    Fetching { id: String, index: usize, total: usize },
    Saved { id: String, steamid: String, image: Option<String> },
    Skipped { id: String, reason: SkipReason, detail: Option<String> },
    RateLimited { id: String, attempt: u32 },
    CooldownStarted { duration: Duration },
    CooldownTick { remaining: Duration, eta: Eta },
    CooldownEnded { skipped: bool },
    /// After every terminal outcome.
    Advanced { processed: usize, total: usize, eta: Eta },
    SourceRetry { detail: String },
    Finished { processed: usize, succeeded: usize, skipped: usize },
}

/// Observer for long-running harvests. Every method has a no-op default.
pub trait Progress {
    fn on_progress(&mut self, _event: &ProgressEvent) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Keeps every event; handy in tests and for post-run summaries.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub events: Vec<ProgressEvent>,
}

impl Progress for RecordingProgress {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}

impl RecordingProgress {
    pub fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}
