// src/pacer.rs
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::Instant;
use tracing::debug;

/// Keeps request starts at least `3600 / requests_per_hour` seconds apart.
///
/// Uses tokio's clock, so tests under a paused runtime see virtual time.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_request: Option<Instant>,
    run_start: Instant,
}

impl Pacer {
    pub fn new(requests_per_hour: u32) -> Self {
        Self::with_interval(interval_for(requests_per_hour))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, last_request: None, run_start: Instant::now() }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the ETA clock over at now.
    pub fn restart_clock(&mut self) {
        self.run_start = Instant::now();
    }

    pub fn run_start(&self) -> Instant {
        self.run_start
    }

    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// Sleep until the interval since the last request has passed, then
    /// mark now as the latest request. Returns how long it slept.
    pub async fn wait_if_needed(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        if let Some(last) = self.last_request {
            let ready_at = last + self.interval;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                debug!(wait_ms = waited.as_millis() as u64, "pacing");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last_request = Some(Instant::now());
        waited
    }

    pub fn eta(&self, completed: usize, total: usize) -> Eta {
        estimate_completion(completed, total, self.run_start, Instant::now())
    }
}

pub fn interval_for(requests_per_hour: u32) -> Duration {
    Duration::from_secs_f64(3600.0 / f64::from(requests_per_hour.max(1)))
}

/// Linear projection from throughput so far. No confidence bound; assumes
/// the rate stays where it has been.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eta {
    /// Nothing finished yet.
    Calculating,
    Remaining(Duration),
}

impl Eta {
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Eta::Calculating => None,
            Eta::Remaining(d) => Some(*d),
        }
    }

    /// Wall-clock finish time, for display.
    pub fn finish_at(&self) -> Option<DateTime<Local>> {
        let d = chrono::Duration::from_std(self.remaining()?).ok()?;
        Local::now().checked_add_signed(d)
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.finish_at() {
            Some(at) => write!(f, "{} ({} left)", at.format("%Y-%m-%d %H:%M"), fmt_hms(self.remaining().unwrap_or_default())),
            None => f.write_str("calculating"),
        }
    }
}

pub fn estimate_completion(completed: usize, total: usize, run_start: Instant, now: Instant) -> Eta {
    if completed == 0 {
        return Eta::Calculating;
    }
    let elapsed = now.saturating_duration_since(run_start).as_secs_f64();
    let left = total.saturating_sub(completed) as f64;
    // per-item time = elapsed / completed
    Eta::Remaining(Duration::from_secs_f64(left * elapsed / completed as f64))
}

pub fn fmt_hms(d: Duration) -> String {
    let secs = d.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
