//! Background progress monitor for long-running pipeline stages.
//!
//! Periodically logs stage counters (episodes processed, frames sampled,
//! requests written, windows skipped) so operators can follow a run without
//! reading per-item log lines.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

/// Default interval between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Snapshot of stage progress counters at a point in time.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub episodes: usize,
    pub frames: usize,
    pub requests: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Shared atomic counters for stage progress tracking.
///
/// Cloned into the stage loop and incremented via `fetch_add`. The background
/// monitor reads them periodically.
#[derive(Debug, Clone)]
pub struct ProgressCounters {
    /// Episodes fully processed.
    pub episodes: Arc<AtomicUsize>,
    /// Frames sampled to disk.
    pub frames: Arc<AtomicUsize>,
    /// Request records written.
    pub requests: Arc<AtomicUsize>,
    /// Episodes or windows skipped because of missing inputs.
    pub skipped: Arc<AtomicUsize>,
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self {
            episodes: Arc::new(AtomicUsize::new(0)),
            frames: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(AtomicUsize::new(0)),
            skipped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn snapshot(&self, start: Instant) -> ProgressSnapshot {
        ProgressSnapshot {
            episodes: self.episodes.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
        }
    }
}

/// A background task that periodically logs stage progress.
///
/// Call [`ProgressMonitor::stop`] to cancel.
pub struct ProgressMonitor {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    /// Start logging every `interval`; `total_episodes` drives the percentage.
    pub fn start(
        stage: &'static str,
        counters: ProgressCounters,
        total_episodes: usize,
        interval: Duration,
    ) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();
        let start = Instant::now();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // skip the immediate first tick

            loop {
                tick.tick().await;
                if flag.load(Ordering::Relaxed) {
                    break;
                }

                let snap = counters.snapshot(start);
                let pct = if total_episodes > 0 {
                    (snap.episodes as f64 / total_episodes as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };

                tracing::info!(
                    stage,
                    episodes = snap.episodes,
                    total_episodes,
                    frames = snap.frames,
                    requests = snap.requests,
                    skipped = snap.skipped,
                    progress_pct = format!("{:.1}%", pct),
                    elapsed_secs = snap.elapsed.as_secs(),
                    "Stage progress"
                );
            }
        });

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    /// Signal the background monitor to stop and wait for it to finish.
    pub async fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
