//! Polling directory monitor.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::diff::detect_changes;
use crate::error::{MonitorError, Result};
use crate::event::{ChangeEvent, ChangeKind, EventSink};
use crate::snapshot::Snapshot;

/// Monitor that re-scans a directory tree on a fixed interval and reports
/// every change to an [`EventSink`].
///
/// `start` performs one scan synchronously, so a bad root surfaces as an
/// error immediately, then spawns the poll loop on the current tokio runtime.
/// Queries read the latest snapshot and never wait for a walk in progress.
pub struct DirectoryMonitor {
    inner: Arc<Inner>,

    /// Parent of every per-start token; cancelled when the monitor is dropped.
    shutdown: CancellationToken,
}

struct Inner {
    config: MonitorConfig,
    sink: Arc<dyn EventSink>,
    state: RwLock<MonitorState>,

    /// Serializes scans.
    scan_lock: Mutex<()>,
}

struct MonitorState {
    snapshot: Arc<Snapshot>,
    running: bool,

    /// Incremented on every successful transition to running.
    generation: u64,

    /// Completed scans since construction.
    scans: u64,

    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl DirectoryMonitor {
    /// Create a stopped monitor with an empty snapshot. No I/O happens here.
    pub fn new(config: MonitorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sink,
                state: RwLock::new(MonitorState {
                    snapshot: Arc::new(Snapshot::new()),
                    running: false,
                    generation: 0,
                    scans: 0,
                    cancel: None,
                    task: None,
                }),
                scan_lock: Mutex::new(()),
            }),
            shutdown: CancellationToken::new(),
        }
    }

    /// The configuration this monitor was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Start monitoring.
    ///
    /// Fails with [`MonitorError::AlreadyRunning`] if already started. If the
    /// initial scan fails the monitor is left stopped and the error returned.
    pub async fn start(&self) -> Result<()> {
        self.inner.config.validate()?;

        let (generation, cancel) = {
            let mut state = self.inner.state.write().await;
            if state.running {
                return Err(MonitorError::AlreadyRunning(
                    self.inner.config.root.display().to_string(),
                ));
            }

            let cancel = self.shutdown.child_token();
            state.running = true;
            state.generation += 1;
            state.cancel = Some(cancel.clone());
            (state.generation, cancel)
        };

        if let Err(e) = self.inner.scan().await {
            let mut state = self.inner.state.write().await;
            if state.generation == generation {
                state.running = false;
                state.cancel = None;
            }
            return Err(e);
        }

        {
            let mut state = self.inner.state.write().await;
            if state.generation != generation || !state.running {
                debug!("Monitor stopped during its initial scan");
                return Ok(());
            }
            state.task = Some(tokio::spawn(poll_loop(Arc::clone(&self.inner), cancel)));
        }

        info!(
            "Monitoring {} every {:?}",
            self.inner.config.root.display(),
            self.inner.config.poll_interval
        );
        Ok(())
    }

    /// Stop the poll loop.
    ///
    /// Does not wait for a scan in progress; no further scan starts after this
    /// returns. Calling `stop` on a stopped monitor does nothing.
    pub async fn stop(&self) {
        let mut state = self.inner.state.write().await;
        if !state.running {
            return;
        }

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        state.running = false;
        info!("Directory monitor stopped");
    }

    /// Stop, then wait for the poll loop to finish its current iteration.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop().await;

        let task = self.inner.state.write().await.task.take();
        if let Some(task) = task {
            task.await?;
        }
        Ok(())
    }

    /// Check if the monitor is running.
    pub async fn is_running(&self) -> bool {
        self.inner.state.read().await.running
    }

    /// Run one scan now, outside the poll schedule.
    pub async fn scan(&self) -> Result<ScanSummary> {
        self.inner.scan().await
    }

    /// Number of scans completed so far, the initial scan included.
    pub async fn scan_count(&self) -> u64 {
        self.inner.state.read().await.scans
    }

    /// Shared handle to the current snapshot.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.state.read().await.snapshot)
    }

    /// Number of files (directories excluded) in the current snapshot.
    pub async fn file_count(&self) -> usize {
        self.snapshot().await.file_count()
    }

    /// Total size in bytes of the files in the current snapshot.
    pub async fn total_size(&self) -> u64 {
        self.snapshot().await.total_size()
    }
}

impl Drop for DirectoryMonitor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Inner {
    async fn scan(&self) -> Result<ScanSummary> {
        let _guard = self.scan_lock.lock().await;
        let started = std::time::Instant::now();

        let old = Arc::clone(&self.state.read().await.snapshot);

        // Sinks do blocking I/O, so events are recorded on the blocking pool
        // along with the walk.
        let config = self.config.clone();
        let sink = Arc::clone(&self.sink);
        let (new, events) = tokio::task::spawn_blocking(move || {
            let new = match Snapshot::capture(&config) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    if let Err(sink_err) = sink.log(&format!("Scan error: {e}")) {
                        warn!("Failed to log scan error: {sink_err}");
                    }
                    return Err(e);
                }
            };

            let events = detect_changes(&old, &new);
            record_events(sink.as_ref(), &events);
            Ok((new, events))
        })
        .await??;

        let summary = ScanSummary::new(new.len(), &events, started.elapsed());
        {
            let mut state = self.state.write().await;
            state.snapshot = Arc::new(new);
            state.scans += 1;
        }

        debug!(
            "Scanned {} entries in {}ms (created: {}, modified: {}, deleted: {})",
            summary.entries,
            summary.duration_ms,
            summary.created,
            summary.modified,
            summary.deleted
        );
        Ok(summary)
    }
}

fn record_events(sink: &dyn EventSink, events: &[ChangeEvent]) {
    for event in events {
        debug!("{} {}", event.kind, event.path.display());
        if let Err(e) = sink.record(event) {
            warn!(
                "Failed to record {} event for {}: {e}",
                event.kind,
                event.path.display()
            );
        }
    }
}

async fn poll_loop(inner: Arc<Inner>, cancel: CancellationToken) {
    let period = inner.config.poll_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = inner.scan().await {
                    warn!("Background scan failed: {e}");
                }
            }
        }
    }

    debug!("Poll loop for {} exited", inner.config.root.display());
}

/// Result of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Entries in the new snapshot, directories included.
    pub entries: usize,

    /// Number of created paths.
    pub created: usize,

    /// Number of modified files.
    pub modified: usize,

    /// Number of deleted paths.
    pub deleted: usize,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

impl ScanSummary {
    fn new(entries: usize, events: &[ChangeEvent], elapsed: Duration) -> Self {
        let count = |kind: ChangeKind| events.iter().filter(|e| e.kind == kind).count();

        Self {
            entries,
            created: count(ChangeKind::Created),
            modified: count(ChangeKind::Modified),
            deleted: count(ChangeKind::Deleted),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Total number of events emitted by the scan.
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NullSink;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use tokio::sync::oneshot;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_monitor_creation() {
        let monitor = DirectoryMonitor::new(MonitorConfig::new("/nonexistent"), Arc::new(NullSink));

        assert!(!monitor.is_running().await);
        assert_eq!(monitor.file_count().await, 0);
        assert_eq!(monitor.total_size().await, 0);
    }

    #[tokio::test]
    async fn test_start_rolls_back_on_scan_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = MonitorConfig::new(temp_dir.path().join("missing"));
        let monitor = DirectoryMonitor::new(config, Arc::new(NullSink));

        let result = monitor.start().await;
        assert!(matches!(result, Err(MonitorError::ScanIo { .. })));
        assert!(!monitor.is_running().await);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = MonitorConfig::new(temp_dir.path()).with_poll_interval(Duration::ZERO);
        let monitor = DirectoryMonitor::new(config, Arc::new(NullSink));

        assert!(matches!(monitor.start().await, Err(MonitorError::Config(_))));
        assert!(!monitor.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let monitor = DirectoryMonitor::new(MonitorConfig::new(temp_dir.path()), Arc::new(NullSink));

        monitor.stop().await;
        monitor.shutdown().await.unwrap();
        assert!(!monitor.is_running().await);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), b"abc").unwrap();
        let monitor = DirectoryMonitor::new(MonitorConfig::new(temp_dir.path()), Arc::new(NullSink));

        monitor.start().await.unwrap();
        monitor.shutdown().await.unwrap();
        assert!(!monitor.is_running().await);

        monitor.start().await.unwrap();
        assert!(monitor.is_running().await);
        assert_eq!(monitor.file_count().await, 1);
        assert_eq!(monitor.total_size().await, 3);
        monitor.shutdown().await.unwrap();
    }

    /// Blocks the first `record` call until released.
    struct GateSink {
        entered: StdMutex<Option<mpsc::Sender<()>>>,
        release: StdMutex<mpsc::Receiver<()>>,
    }

    impl EventSink for GateSink {
        fn record(&self, _event: &ChangeEvent) -> Result<()> {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_during_initial_scan_spawns_no_loop() {
        let temp_dir = TempDir::new().unwrap();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = GateSink {
            entered: StdMutex::new(Some(entered_tx)),
            release: StdMutex::new(release_rx),
        };
        let config =
            MonitorConfig::new(temp_dir.path()).with_poll_interval(Duration::from_millis(50));
        let monitor = Arc::new(DirectoryMonitor::new(config, Arc::new(sink)));

        let starting = tokio::spawn({
            let monitor = Arc::clone(&monitor);
            async move { monitor.start().await }
        });

        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();
        monitor.stop().await;
        release_tx.send(()).unwrap();

        starting.await.unwrap().unwrap();
        assert!(!monitor.is_running().await);
        assert!(monitor.inner.state.read().await.task.is_none());

        let scans = monitor.scan_count().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(monitor.scan_count().await, scans);
    }

    /// Waits inside the first `record` for a release from the test task.
    struct HandoffSink {
        entered: StdMutex<Option<oneshot::Sender<()>>>,
        release: StdMutex<Option<mpsc::Receiver<()>>>,
        released: AtomicBool,
    }

    impl EventSink for HandoffSink {
        fn record(&self, _event: &ChangeEvent) -> Result<()> {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                let _ = entered.send(());
            }
            if let Some(release) = self.release.lock().unwrap().take() {
                let released = release.recv_timeout(Duration::from_secs(5)).is_ok();
                self.released.store(released, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    // On a current-thread runtime the release can only be sent if `record`
    // is not blocking the runtime thread.
    #[tokio::test]
    async fn test_sink_runs_off_the_runtime_thread() {
        let temp_dir = TempDir::new().unwrap();
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Arc::new(HandoffSink {
            entered: StdMutex::new(Some(entered_tx)),
            release: StdMutex::new(Some(release_rx)),
            released: AtomicBool::new(false),
        });
        let monitor = DirectoryMonitor::new(MonitorConfig::new(temp_dir.path()), sink.clone());

        let (summary, ()) = tokio::join!(monitor.scan(), async move {
            entered_rx.await.unwrap();
            release_tx.send(()).unwrap();
        });

        assert_eq!(summary.unwrap().created, 1);
        assert!(sink.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scan_count_tracks_completed_scans() {
        let temp_dir = TempDir::new().unwrap();
        let monitor = DirectoryMonitor::new(MonitorConfig::new(temp_dir.path()), Arc::new(NullSink));
        assert_eq!(monitor.scan_count().await, 0);

        monitor.scan().await.unwrap();
        monitor.scan().await.unwrap();
        assert_eq!(monitor.scan_count().await, 2);
    }

    #[test]
    fn test_scan_summary_counts() {
        let events = vec![
            ChangeEvent::new(ChangeKind::Created, "/r/a"),
            ChangeEvent::new(ChangeKind::Created, "/r/b"),
            ChangeEvent::new(ChangeKind::Deleted, "/r/c"),
        ];
        let summary = ScanSummary::new(5, &events, Duration::from_millis(12));

        assert_eq!(summary.entries, 5);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.modified, 0);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.duration_ms, 12);
        assert_eq!(summary.total_changes(), 3);
    }
}
