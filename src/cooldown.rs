// src/cooldown.rs
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::pacer::Eta;
use crate::progress::{Progress, ProgressEvent};

/// Operator "skip the cooldown" flag. Set by the listener task, consumed by
/// the cooldown loop.
#[derive(Clone, Debug, Default)]
pub struct SkipSignal(Arc<AtomicBool>);

impl SkipSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Read and clear.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raise `signal` for every line (i.e. Enter) read from `input`; ends on EOF
/// or a read error. Runs on its own OS thread: a blocking read can't be
/// cancelled, and a detached thread never holds up runtime shutdown.
pub fn spawn_line_listener<R>(input: R, signal: SkipSignal) -> io::Result<thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new().name("enter-listener".into()).spawn(move || {
        for line in input.lines() {
            match line {
                Ok(_) => signal.trigger(),
                Err(e) => {
                    warn!(error = %e, "input listener stopped");
                    return;
                }
            }
        }
        debug!("input closed, listener done");
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownEnd {
    Elapsed,
    /// Operator cut it short.
    Skipped,
}

/// Long pause after the wiki throttles us.
#[derive(Clone, Debug)]
pub struct Cooldown {
    duration: Duration,
    tick: Duration,
    signal: SkipSignal,
}

impl Cooldown {
    pub fn new(duration: Duration, signal: SkipSignal) -> Self {
        Self { duration, tick: Duration::from_secs(1), signal }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn signal(&self) -> &SkipSignal {
        &self.signal
    }

    /// Sleep for the configured duration, one tick at a time, reporting the
    /// time left and a fresh ETA every tick. Returns early on the skip
    /// signal. Presses from before the cooldown started are ignored.
    pub async fn wait(&self, progress: &mut dyn Progress, eta: &dyn Fn() -> Eta) -> CooldownEnd {
        self.signal.take();
        info!(secs = self.duration.as_secs(), "cooldown started");
        progress.on_progress(&ProgressEvent::CooldownStarted { duration: self.duration });

        let deadline = Instant::now() + self.duration;
        let end = loop {
            let now = Instant::now();
            if now >= deadline {
                break CooldownEnd::Elapsed;
            }
            if self.signal.take() {
                break CooldownEnd::Skipped;
            }
            let remaining = deadline - now;
            progress.on_progress(&ProgressEvent::CooldownTick { remaining, eta: eta() });
            tokio::time::sleep(self.tick.min(remaining)).await;
        };

        info!(?end, "cooldown over");
        progress.on_progress(&ProgressEvent::CooldownEnded { skipped: end == CooldownEnd::Skipped });
        end
    }
}
