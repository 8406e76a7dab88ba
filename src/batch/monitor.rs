//! Batch status polling and the persisted batch id.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::client::BatchApi;
use super::status::Batch;
use crate::config::{WatchConfig, BATCH_ID_FILE};
use crate::error::BatchError;

/// Width of the textual progress bar.
const PROGRESS_BAR_WIDTH: usize = 30;

const CONSOLE_BASE_URL: &str = "https://platform.openai.com";

pub fn console_url(batch_id: &str) -> String {
    format!("{}/batches/{}", CONSOLE_BASE_URL, batch_id)
}

/// Write `batch_id.txt` into `dir`, returning its path.
pub fn write_batch_id(dir: &Path, batch_id: &str) -> Result<PathBuf, BatchError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(BATCH_ID_FILE);
    std::fs::write(&path, batch_id)?;
    Ok(path)
}

pub fn read_batch_id(path: &Path) -> Result<String, BatchError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let id = content.trim().to_string();
            if id.is_empty() {
                Err(BatchError::IdFileNotFound(path.display().to_string()))
            } else {
                Ok(id)
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(BatchError::IdFileNotFound(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Use the explicit id when given, otherwise read it from `id_file`.
pub fn resolve_batch_id(explicit: Option<String>, id_file: &Path) -> Result<String, BatchError> {
    match explicit.filter(|id| !id.trim().is_empty()) {
        Some(id) => Ok(id),
        None => {
            let id = read_batch_id(id_file)?;
            tracing::info!(path = %id_file.display(), batch_id = %id, "Loaded batch id from file");
            Ok(id)
        }
    }
}

/// Local-time rendering of a unix timestamp, or `N/A` when unset.
pub fn format_timestamp(ts: Option<i64>) -> String {
    ts.filter(|t| *t > 0)
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn progress_bar(done: u64, total: u64) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((PROGRESS_BAR_WIDTH as u64 * done.min(total)) / total) as usize
    };
    format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

/// Human-readable status report for one poll.
pub fn render_report(batch: &Batch) -> String {
    let mut lines = vec![
        format!("Batch ID:     {}", batch.id),
        format!("Console URL:  {}", console_url(&batch.id)),
        format!("Status:       {}", batch.status),
        format!("Created:      {}", format_timestamp(batch.created_at)),
        format!("Expires:      {}", format_timestamp(batch.expires_at)),
        format!("Completed:    {}", format_timestamp(batch.completed_at)),
        format!("In progress:  {}", format_timestamp(batch.in_progress_at)),
        format!("Failed:       {}", format_timestamp(batch.failed_at)),
    ];

    if let Some(rc) = &batch.request_counts {
        lines.push(format!(
            "Progress:     [{}] {}/{} ({:.1}%)  failed: {}",
            progress_bar(rc.completed, rc.total),
            rc.completed,
            rc.total,
            rc.percent_done(),
            rc.failed
        ));
    }

    match &batch.output_file_id {
        Some(file_id) => {
            lines.push(format!("Output file:  {}", file_id));
            lines.push(format!("Download:     {}/files/{}", CONSOLE_BASE_URL, file_id));
        }
        None => lines.push("Output file:  not available yet".to_string()),
    }

    lines.join("\n")
}

/// Why a watch loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// The batch reached a terminal status.
    Finished(Batch),
    /// The configured number of polls ran out first.
    PollLimit(Batch),
    /// The user pressed Ctrl+C. Holds the last batch seen, if any poll
    /// completed before the interrupt.
    Interrupted(Option<Batch>),
}

impl WatchOutcome {
    pub fn batch(&self) -> Option<&Batch> {
        match self {
            Self::Finished(b) | Self::PollLimit(b) => Some(b),
            Self::Interrupted(b) => b.as_ref(),
        }
    }
}

/// Polls a batch until it reaches a terminal status.
pub struct BatchMonitor<'a> {
    api: &'a dyn BatchApi,
    config: WatchConfig,
}

impl<'a> BatchMonitor<'a> {
    pub fn new(api: &'a dyn BatchApi, config: WatchConfig) -> Self {
        Self { api, config }
    }

    /// Watch until a terminal status, the poll limit, or Ctrl+C.
    pub async fn watch(&self, batch_id: &str) -> Result<WatchOutcome, BatchError> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        self.watch_until(batch_id, ctrl_c).await
    }

    /// Watch until a terminal status, the poll limit, or `stop` resolves.
    ///
    /// `stop` is raced against both the status request and the sleep between
    /// polls, so an in-flight request is abandoned when it fires.
    pub async fn watch_until<F>(&self, batch_id: &str, stop: F) -> Result<WatchOutcome, BatchError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut last: Option<Batch> = None;
        let mut polls = 0u32;
        loop {
            let batch = tokio::select! {
                result = self.api.retrieve_batch(batch_id) => result?,
                _ = &mut stop => {
                    tracing::info!(batch_id, polls, "Watch interrupted during status request");
                    return Ok(WatchOutcome::Interrupted(last));
                }
            };
            polls = polls.saturating_add(1);

            println!("\n{}", render_report(&batch));
            tracing::debug!(batch_id, status = %batch.status, polls, "Polled batch status");

            if batch.status.is_terminal() {
                tracing::info!(batch_id, status = %batch.status, "Batch finished");
                return Ok(WatchOutcome::Finished(batch));
            }
            if self.config.max_polls.is_some_and(|max| polls >= max) {
                return Ok(WatchOutcome::PollLimit(batch));
            }

            println!(
                "\nNext check in {}s (Ctrl+C to stop watching)",
                self.config.interval.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = &mut stop => {
                    tracing::info!(batch_id, polls, "Watch interrupted");
                    return Ok(WatchOutcome::Interrupted(Some(batch)));
                }
            }
            last = Some(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::status::{BatchStatus, FileObject, RequestCounts};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use tokio::sync::Notify;

    struct ScriptedApi {
        statuses: Mutex<Vec<BatchStatus>>,
        polls: Mutex<u32>,
    }

    impl ScriptedApi {
        fn new(mut statuses: Vec<BatchStatus>) -> Self {
            statuses.reverse();
            Self {
                statuses: Mutex::new(statuses),
                polls: Mutex::new(0),
            }
        }
    }

    fn batch(status: BatchStatus) -> Batch {
        Batch {
            id: "batch_1".to_string(),
            status,
            input_file_id: None,
            output_file_id: None,
            error_file_id: None,
            created_at: Some(1_700_000_000),
            expires_at: None,
            in_progress_at: None,
            completed_at: None,
            failed_at: None,
            request_counts: Some(RequestCounts {
                total: 4,
                completed: 2,
                failed: 0,
            }),
        }
    }

    #[async_trait]
    impl BatchApi for ScriptedApi {
        async fn upload_file(&self, _path: &Path) -> Result<FileObject, BatchError> {
            unreachable!("not used by the monitor")
        }
        async fn create_batch(&self, _id: &str) -> Result<Batch, BatchError> {
            unreachable!("not used by the monitor")
        }
        async fn retrieve_batch(&self, _id: &str) -> Result<Batch, BatchError> {
            *self.polls.lock().expect("lock") += 1;
            let mut statuses = self.statuses.lock().expect("lock");
            let status = if statuses.len() > 1 {
                statuses.pop().expect("status")
            } else {
                statuses[0]
            };
            Ok(batch(status))
        }
        async fn file_content(&self, _id: &str) -> Result<String, BatchError> {
            unreachable!("not used by the monitor")
        }
    }

    #[tokio::test]
    async fn test_watch_stops_on_terminal_status() {
        let api = ScriptedApi::new(vec![
            BatchStatus::Validating,
            BatchStatus::InProgress,
            BatchStatus::Completed,
        ]);
        let monitor = BatchMonitor::new(&api, WatchConfig::new(Duration::from_millis(1)));
        let outcome = monitor.watch("batch_1").await.expect("watch");
        assert!(matches!(outcome, WatchOutcome::Finished(_)));
        assert_eq!(outcome.batch().expect("batch").status, BatchStatus::Completed);
        assert_eq!(*api.polls.lock().expect("lock"), 3);
    }

    #[tokio::test]
    async fn test_watch_respects_poll_limit() {
        let api = ScriptedApi::new(vec![BatchStatus::InProgress]);
        let config = WatchConfig::new(Duration::from_millis(1)).with_repeat(2);
        let monitor = BatchMonitor::new(&api, config);
        let outcome = monitor.watch("batch_1").await.expect("watch");
        assert!(matches!(outcome, WatchOutcome::PollLimit(_)));
        assert_eq!(*api.polls.lock().expect("lock"), 2);
    }

    /// Fires `stop` from inside the `interrupt_on`-th status request, then
    /// keeps that request hanging for a while.
    struct StallingApi {
        interrupt_on: u32,
        polls: AtomicU32,
        stop: Arc<Notify>,
    }

    impl StallingApi {
        fn new(interrupt_on: u32) -> Self {
            Self {
                interrupt_on,
                polls: AtomicU32::new(0),
                stop: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl BatchApi for StallingApi {
        async fn upload_file(&self, _path: &Path) -> Result<FileObject, BatchError> {
            unreachable!("not used by the monitor")
        }
        async fn create_batch(&self, _id: &str) -> Result<Batch, BatchError> {
            unreachable!("not used by the monitor")
        }
        async fn retrieve_batch(&self, _id: &str) -> Result<Batch, BatchError> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if poll == self.interrupt_on {
                self.stop.notify_one();
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(batch(BatchStatus::InProgress))
        }
        async fn file_content(&self, _id: &str) -> Result<String, BatchError> {
            unreachable!("not used by the monitor")
        }
    }

    #[tokio::test]
    async fn test_watch_interrupted_during_status_request() {
        let api = StallingApi::new(2);
        let stop = api.stop.clone();
        let config = WatchConfig::new(Duration::from_millis(20)).with_repeat(3);
        let started = Instant::now();

        let outcome = BatchMonitor::new(&api, config)
            .watch_until("batch_1", async move { stop.notified().await })
            .await
            .expect("watch");

        match outcome {
            WatchOutcome::Interrupted(Some(last)) => {
                assert_eq!(last.status, BatchStatus::InProgress)
            }
            other => panic!("expected Interrupted with a batch, got {:?}", other),
        }
        assert_eq!(api.polls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_watch_interrupted_before_first_status() {
        let api = StallingApi::new(1);
        let stop = api.stop.clone();
        let outcome = BatchMonitor::new(&api, WatchConfig::new(Duration::from_millis(20)))
            .watch_until("batch_1", async move { stop.notified().await })
            .await
            .expect("watch");
        assert_eq!(outcome, WatchOutcome::Interrupted(None));
        assert!(outcome.batch().is_none());
    }

    #[tokio::test]
    async fn test_watch_interrupted_between_polls() {
        let api = ScriptedApi::new(vec![BatchStatus::InProgress]);
        let stop = Arc::new(Notify::new());
        let trigger = stop.clone();
        let config = WatchConfig::new(Duration::from_secs(30));

        let monitor = BatchMonitor::new(&api, config);
        let watching = monitor
            .watch_until("batch_1", async move { stop.notified().await });
        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.notify_one();
        };
        let (outcome, _) = tokio::join!(watching, interrupt);

        assert!(matches!(outcome.expect("watch"), WatchOutcome::Interrupted(Some(_))));
        assert_eq!(*api.polls.lock().expect("lock"), 1);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 0).chars().count(), PROGRESS_BAR_WIDTH);
        assert_eq!(progress_bar(15, 30), format!("{}{}", "█".repeat(15), "░".repeat(15)));
        assert_eq!(progress_bar(10, 10), "█".repeat(30));
        assert_eq!(progress_bar(1, 3), format!("{}{}", "█".repeat(10), "░".repeat(20)));
    }

    #[test]
    fn test_format_timestamp_unset() {
        assert_eq!(format_timestamp(None), "N/A");
        assert_eq!(format_timestamp(Some(0)), "N/A");
        let formatted = format_timestamp(Some(1_700_000_000));
        assert_eq!(formatted.len(), "2023-11-14 22:13:20".len());
    }

    #[test]
    fn test_render_report() {
        let report = render_report(&batch(BatchStatus::InProgress));
        assert!(report.contains("Status:       in_progress"));
        assert!(report.contains("https://platform.openai.com/batches/batch_1"));
        assert!(report.contains("2/4 (50.0%)  failed: 0"));
        assert!(report.contains("not available yet"));
        assert!(report.contains("Expires:      N/A"));
    }

    #[test]
    fn test_batch_id_round_trip_and_resolution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_batch_id(&dir.path().join("batch"), "batch_xyz").expect("write");
        assert_eq!(read_batch_id(&path).expect("read"), "batch_xyz");
        assert_eq!(
            resolve_batch_id(Some("explicit".to_string()), &path).expect("resolve"),
            "explicit"
        );
        assert_eq!(resolve_batch_id(None, &path).expect("resolve"), "batch_xyz");
    }

    #[test]
    fn test_missing_id_file() {
        let result = resolve_batch_id(None, Path::new("/nonexistent/batch_id.txt"));
        assert!(matches!(result, Err(BatchError::IdFileNotFound(_))));
    }
}
