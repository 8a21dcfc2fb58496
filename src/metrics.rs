// Session metrics module
//
// Lightweight counters for what happened during one run of the client

use crate::state::WorkflowEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for one client session
///
/// Uses atomic operations so the counters can be shared with spawned tasks
/// without locks. Logged once on shutdown.
#[derive(Debug)]
pub struct SessionMetrics {
    /// Submissions that entered Processing
    pub submissions: AtomicU64,

    /// Submissions that reached ResultReady
    pub successes: AtomicU64,

    /// Submissions that fell back to FileSelected
    pub failures: AtomicU64,

    /// Artifacts materialized
    pub downloads: AtomicU64,

    /// Total size of materialized artifacts
    pub bytes_downloaded: AtomicU64,

    /// Time spent waiting on the service for submissions, in milliseconds
    pub total_processing_time_ms: AtomicU64,

    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            submissions: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            total_processing_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count the submission outcomes carried by workflow events
    pub fn record_events(&self, events: &[WorkflowEvent]) {
        for event in events {
            match event {
                WorkflowEvent::SubmissionStarted { .. } => {
                    self.submissions.fetch_add(1, Ordering::Relaxed);
                }
                WorkflowEvent::ProcessingSucceeded { .. } => {
                    self.successes.fetch_add(1, Ordering::Relaxed);
                }
                WorkflowEvent::ProcessingFailed { .. } => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
        }
    }

    pub fn record_processing_time(&self, duration: Duration) {
        self.total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_download(&self, bytes: usize) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average wait per finished submission in milliseconds
    pub fn avg_processing_time_ms(&self) -> f64 {
        let total = self.total_processing_time_ms.load(Ordering::Relaxed);
        let finished = self.successes.load(Ordering::Relaxed) + self.failures.load(Ordering::Relaxed);
        if finished > 0 {
            total as f64 / finished as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Submissions: {} sent, {} succeeded, {} failed (avg wait {:.0}ms)",
            self.submissions.load(Ordering::Relaxed),
            self.successes.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
            self.avg_processing_time_ms()
        );
        tracing::info!(
            "Downloads: {} ({} bytes)",
            self.downloads.load(Ordering::Relaxed),
            self.bytes_downloaded.load(Ordering::Relaxed)
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
