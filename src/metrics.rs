// Performance metrics module
//
// Provides lightweight counters for monitoring a tagging run

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Run metrics.
///
/// Uses atomic operations so an external driver processing files in
/// parallel can share one instance without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Files read, rewritten and (unless dry-running) written back
    pub files_processed: AtomicUsize,

    /// Files skipped because of an I/O failure
    pub files_failed: AtomicUsize,

    /// Blocks whose comment was rebuilt
    pub blocks_rewritten: AtomicUsize,

    /// Blocks left untouched because their comment could not be parsed
    pub blocks_skipped: AtomicUsize,

    /// Tags inserted, removed, rewritten or moved
    pub tags_changed: AtomicUsize,

    /// Total per-file processing time in milliseconds
    pub total_processing_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            files_processed: AtomicUsize::new(0),
            files_failed: AtomicUsize::new(0),
            blocks_rewritten: AtomicUsize::new(0),
            blocks_skipped: AtomicUsize::new(0),
            tags_changed: AtomicUsize::new(0),
            total_processing_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a processed file and what happened inside it
    pub fn record_file_processed(&self, blocks_rewritten: usize, blocks_skipped: usize, tags_changed: usize) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.blocks_rewritten.fetch_add(blocks_rewritten, Ordering::Relaxed);
        self.blocks_skipped.fetch_add(blocks_skipped, Ordering::Relaxed);
        self.tags_changed.fetch_add(tags_changed, Ordering::Relaxed);
    }

    pub fn record_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processing_time(&self, duration: Duration) {
        self.total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average processing time per processed file in milliseconds
    pub fn avg_processing_time_ms(&self) -> f64 {
        let total = self.total_processing_time_ms.load(Ordering::Relaxed);
        let count = self.files_processed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Run Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Files: {} processed, {} failed",
            self.files_processed.load(Ordering::Relaxed),
            self.files_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Blocks: {} rewritten, {} skipped; tags changed: {}",
            self.blocks_rewritten.load(Ordering::Relaxed),
            self.blocks_skipped.load(Ordering::Relaxed),
            self.tags_changed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total processing time: {:.2}s (avg: {:.2}ms per file)",
            self.total_processing_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_processing_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
