//! Scan orchestration.
//!
//! Visits every (identity, port) record of the visit store with bounded
//! concurrency. Each visit runs the HTTP/HTTPS fallback policy against a
//! [`Renderer`], writes the outcome into its record and flushes the store.
//! A failing visit never stops its siblings.

pub mod delay;
pub mod fallback;
pub mod http;
pub mod traits;

use crate::storage::{ResponseClass, ScreenshotRef, ScreenshotWriter, SharedStore, VisitTask};
use chrono::Local;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub use delay::VisitDelay;
pub use fallback::{visit_url, FallbackPolicy, FallbackState, Scheme, VisitOutcome};
pub use http::{HttpRenderer, RendererConfig};
pub use traits::{NavigationError, NavigationErrorKind, RenderOutput, Renderer, SharedRenderer};

/// Upper bound of visit futures polled at once; the semaphore sets the
/// actual concurrency.
const MAX_IN_FLIGHT: usize = 1000;

/// Configuration for a scan job.
#[derive(Debug, Clone)]
pub struct ScanJobConfig {
    /// Number of concurrent visits.
    pub concurrency: usize,
    /// Per-navigation timeout.
    pub timeout: Duration,
    pub delay: VisitDelay,
    /// Leave records that already hold a response alone.
    pub resume: bool,
    pub show_progress: bool,
}

impl Default for ScanJobConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(30),
            delay: VisitDelay::default(),
            resume: false,
            show_progress: false,
        }
    }
}

impl ScanJobConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: VisitDelay) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Statistics of a finished (or interrupted) scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records selected for this run.
    pub total: usize,
    pub visited: usize,
    /// Tasks not started because the scan was cancelled.
    pub skipped: usize,
    /// Visits whose task died unexpectedly.
    pub task_failures: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub counts: BTreeMap<ResponseClass, usize>,
}

impl ScanSummary {
    /// Elapsed time as "N minutes and M seconds".
    pub fn elapsed_human(&self) -> String {
        let secs = self.elapsed.as_secs();
        format!("{} minutes and {} seconds", secs / 60, secs % 60)
    }
}

enum TaskResult {
    Visited(ResponseClass),
    Crashed,
    Skipped,
}

/// Drives a renderer over every task of a shared visit store.
pub struct ScanOrchestrator {
    renderer: SharedRenderer,
    store: Arc<SharedStore>,
    screenshots: Option<ScreenshotWriter>,
    cancel: CancellationToken,
    config: ScanJobConfig,
}

impl ScanOrchestrator {
    pub fn new(renderer: SharedRenderer, store: Arc<SharedStore>, config: ScanJobConfig) -> Self {
        Self {
            renderer,
            store,
            screenshots: None,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Persist captured screenshots through `writer`.
    pub fn with_screenshots(mut self, writer: ScreenshotWriter) -> Self {
        self.screenshots = Some(writer);
        self
    }

    /// Stop starting new visits once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Visit every selected record and return the run statistics.
    pub async fn run(&self) -> ScanSummary {
        let start = Instant::now();
        let tasks = self.store.snapshot().await.tasks(self.config.resume);
        let total = tasks.len();
        tracing::info!(
            "Visiting {} sockets with {} concurrent workers",
            total,
            self.config.concurrency
        );

        let progress = self.config.show_progress.then(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        });

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let results: Vec<TaskResult> = stream::iter(tasks)
            .map(|task| {
                let semaphore = Arc::clone(&semaphore);
                let progress = progress.clone();

                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return TaskResult::Skipped;
                    };
                    let result = self.run_task(&task).await;

                    if let Some(ref pb) = progress {
                        pb.inc(1);
                        if let TaskResult::Visited(response) = &result {
                            pb.set_message(format!("{} -> {}", task, response));
                        }
                    }
                    result
                }
            })
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;

        let mut summary = ScanSummary {
            total,
            cancelled: self.cancel.is_cancelled(),
            ..Default::default()
        };
        for result in results {
            match result {
                TaskResult::Visited(response) => {
                    summary.visited += 1;
                    *summary.counts.entry(response).or_default() += 1;
                }
                TaskResult::Crashed => {
                    summary.visited += 1;
                    summary.task_failures += 1;
                    *summary.counts.entry(ResponseClass::Error).or_default() += 1;
                }
                TaskResult::Skipped => summary.skipped += 1,
            }
        }
        summary.elapsed = start.elapsed();

        if let Some(pb) = progress {
            if summary.cancelled {
                pb.abandon_with_message("Scan interrupted");
            } else {
                pb.finish_with_message("Scan complete");
            }
        }

        summary
    }

    async fn run_task(&self, task: &VisitTask) -> TaskResult {
        if self.cancel.is_cancelled() {
            return TaskResult::Skipped;
        }

        tokio::select! {
            _ = self.cancel.cancelled() => return TaskResult::Skipped,
            _ = self.config.delay.wait() => {}
        }

        tracing::info!("Visiting website {}", task);

        // Each visit runs as its own task so a panicking renderer only
        // takes down this socket.
        let renderer = Arc::clone(&self.renderer);
        let identity = task.identity.clone();
        let port = task.port;
        let timeout = self.config.timeout;
        let handle = tokio::spawn(async move {
            fallback::visit_with_fallback(renderer.as_ref(), &identity, port, timeout).await
        });

        let (result, response, screenshot) = match handle.await {
            Ok(outcome) => {
                let screenshot = self.save_screenshot(task, &outcome).await;
                (TaskResult::Visited(outcome.response), outcome.response, screenshot)
            }
            Err(e) => {
                tracing::error!("Error visiting {} - {}", task, e);
                (TaskResult::Crashed, ResponseClass::Error, None)
            }
        };

        let at = Local::now().naive_local();
        let user_agent = self.renderer.user_agent().to_string();
        self.store
            .update(&task.identity, task.port, |record| {
                record.record_visit(response, user_agent, screenshot, at)
            })
            .await;
        tracing::debug!("Saved visit of {} ({})", task, response);

        result
    }

    async fn save_screenshot(&self, task: &VisitTask, outcome: &VisitOutcome) -> Option<ScreenshotRef> {
        let writer = self.screenshots.as_ref()?;
        let bytes = outcome.screenshot.as_ref()?;

        match writer
            .save(
                &task.identity,
                task.port,
                outcome.scheme.as_str(),
                bytes,
                Local::now().naive_local(),
            )
            .await
        {
            Ok(shot) => Some(shot),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::VisitStore;
    use crate::types::{HostIdentity, Port, Socket};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers by URL; unknown URLs are refused.
    struct ByUrl {
        replies: HashMap<String, Result<RenderOutput, NavigationError>>,
        seen: Mutex<Vec<String>>,
    }

    impl ByUrl {
        fn new(replies: Vec<(&str, Result<RenderOutput, NavigationError>)>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|(url, reply)| (url.to_string(), reply))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Renderer for ByUrl {
        fn user_agent(&self) -> &str {
            "pagehawk-test"
        }

        async fn visit(&self, url: &str, _timeout: Duration) -> Result<RenderOutput, NavigationError> {
            self.seen.lock().unwrap().push(url.to_string());
            self.replies.get(url).cloned().unwrap_or_else(|| {
                Err(NavigationError::new(NavigationErrorKind::Refused, "ECONNREFUSED"))
            })
        }
    }

    /// Panics on one URL, answers 200 everywhere else.
    struct Flaky;

    #[async_trait]
    impl Renderer for Flaky {
        fn user_agent(&self) -> &str {
            "flaky"
        }

        async fn visit(&self, url: &str, _timeout: Duration) -> Result<RenderOutput, NavigationError> {
            if url.contains("10.0.0.2") {
                panic!("renderer crashed");
            }
            Ok(RenderOutput::with_status(200))
        }
    }

    /// Tracks how many visits run at once.
    #[derive(Default)]
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for Gauge {
        fn user_agent(&self) -> &str {
            "gauge"
        }

        async fn visit(&self, _url: &str, _timeout: Duration) -> Result<RenderOutput, NavigationError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(RenderOutput::with_status(200))
        }
    }

    fn shared_store(dir: &tempfile::TempDir, sockets: &[&str]) -> Arc<SharedStore> {
        let sockets: Vec<Socket> = sockets.iter().map(|s| s.parse().unwrap()).collect();
        Arc::new(SharedStore::new(
            VisitStore::from_sockets(&sockets),
            dir.path().join("pagehawk_results.json"),
        ))
    }

    fn port(p: u16) -> Port {
        Port::new(p).unwrap()
    }

    #[tokio::test]
    async fn test_one_host_n_ports() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared_store(&dir, &["10.0.0.1:80", "10.0.0.1:443", "10.0.0.1:8080"]);
        let renderer = Arc::new(ByUrl::new(vec![
            ("http://10.0.0.1", Ok(RenderOutput::with_status(200))),
            ("https://10.0.0.1", Ok(RenderOutput::with_status(403))),
        ]));

        let summary = ScanOrchestrator::new(renderer, Arc::clone(&store), ScanJobConfig::default())
            .run()
            .await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.visited, 3);
        assert_eq!(summary.counts.get(&ResponseClass::Refused), Some(&1));

        let persisted = VisitStore::load(store.path()).unwrap();
        assert_eq!(persisted.socket_count(), 3);
        for record in persisted.records() {
            assert!(!record.is_pending());
            assert!(record.visited_first.is_some());
            assert!(record.visited_last >= record.visited_first);
            assert_eq!(record.user_agent, "pagehawk-test");
        }
        let identity = HostIdentity::from_host("10.0.0.1");
        assert_eq!(
            persisted.record(&identity, Port::HTTPS).unwrap().response,
            ResponseClass::Status(403)
        );
    }

    #[tokio::test]
    async fn test_worker_pool_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let sockets: Vec<String> = (1..=12).map(|i| format!("10.0.1.{}:80", i)).collect();
        let sockets: Vec<&str> = sockets.iter().map(String::as_str).collect();
        let store = shared_store(&dir, &sockets);
        let gauge = Arc::new(Gauge::default());

        let summary = ScanOrchestrator::new(
            gauge.clone(),
            Arc::clone(&store),
            ScanJobConfig::default().with_concurrency(3),
        )
        .run()
        .await;

        assert_eq!(summary.visited, 12);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeds the pool size", peak);
        assert!(peak > 1, "visits never overlapped");
        assert_eq!(gauge.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_port_80_failure_has_no_secondary() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared_store(&dir, &["a.com:80"]);
        let renderer = Arc::new(ByUrl::new(vec![]));

        ScanOrchestrator::new(renderer.clone(), Arc::clone(&store), ScanJobConfig::default())
            .run()
            .await;

        assert_eq!(*renderer.seen.lock().unwrap(), vec!["http://a.com"]);
        let state = store.snapshot().await;
        assert_eq!(
            state.record(&HostIdentity::from_host("a.com"), Port::HTTP).unwrap().response,
            ResponseClass::Refused
        );
    }

    #[tokio::test]
    async fn test_secondary_success_records_https_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared_store(&dir, &["10.0.0.1:8080"]);
        let renderer = Arc::new(ByUrl::new(vec![(
            "https://10.0.0.1:8080",
            Ok(RenderOutput::with_status(200).with_screenshot(b"png".to_vec())),
        )]));

        ScanOrchestrator::new(renderer, Arc::clone(&store), ScanJobConfig::default())
            .with_screenshots(ScreenshotWriter::new(dir.path(), false))
            .run()
            .await;

        let state = VisitStore::load(store.path()).unwrap();
        let record = state
            .record(&HostIdentity::from_host("10.0.0.1"), port(8080))
            .unwrap();
        assert_eq!(record.response, ResponseClass::Status(200));
        let shot = record.screenshot.as_ref().unwrap();
        assert!(shot.filename.starts_with("10_0_0_1_8080_https_"));
        assert_eq!(std::fs::read(&shot.path_full).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_crashed_visit_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared_store(&dir, &["10.0.0.1:80", "10.0.0.2:80", "10.0.0.3:80"]);

        let summary = ScanOrchestrator::new(
            Arc::new(Flaky),
            Arc::clone(&store),
            ScanJobConfig::default().with_concurrency(2),
        )
        .run()
        .await;

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.task_failures, 1);
        let state = store.snapshot().await;
        assert_eq!(
            state.record(&HostIdentity::from_host("10.0.0.2"), Port::HTTP).unwrap().response,
            ResponseClass::Error
        );
        assert_eq!(
            state.record(&HostIdentity::from_host("10.0.0.3"), Port::HTTP).unwrap().response,
            ResponseClass::Status(200)
        );
    }

    #[tokio::test]
    async fn test_cancelled_scan_leaves_records_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared_store(&dir, &["10.0.0.1:80", "10.0.0.1:443"]);
        let token = CancellationToken::new();
        token.cancel();

        let summary = ScanOrchestrator::new(Arc::new(Flaky), Arc::clone(&store), ScanJobConfig::default())
            .with_cancellation(token)
            .run()
            .await;

        assert!(summary.cancelled);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.visited, 0);
        assert!(store.snapshot().await.records().all(|r| r.is_pending()));
    }

    #[tokio::test]
    async fn test_resume_skips_visited_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared_store(&dir, &["10.0.0.1:80", "10.0.0.1:443"]);
        store
            .update(&HostIdentity::from_host("10.0.0.1"), Port::HTTP, |record| {
                record.record_visit(ResponseClass::Status(200), "old", None, Local::now().naive_local())
            })
            .await;

        let renderer = Arc::new(ByUrl::new(vec![]));
        let summary = ScanOrchestrator::new(
            renderer.clone(),
            Arc::clone(&store),
            ScanJobConfig::default().with_resume(true),
        )
        .run()
        .await;

        assert_eq!(summary.total, 1);
        assert_eq!(*renderer.seen.lock().unwrap(), vec!["https://10.0.0.1"]);
    }

    #[test]
    fn test_elapsed_human() {
        let summary = ScanSummary {
            elapsed: Duration::from_secs(125),
            ..Default::default()
        };
        assert_eq!(summary.elapsed_human(), "2 minutes and 5 seconds");
    }
}
