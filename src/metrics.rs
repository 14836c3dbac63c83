// Run metrics module
//
// Lightweight counters for scans and bisection rounds, logged when a command finishes

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one process run
///
/// Uses atomic operations so a shared reference can be updated from anywhere
/// without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Configuration files indexed
    pub files_scanned: AtomicUsize,

    /// Configuration files skipped as malformed
    pub files_skipped: AtomicUsize,

    /// Total scan time in milliseconds
    pub total_scan_time_ms: AtomicU64,

    /// Bisection rounds closed with an outcome
    pub rounds_completed: AtomicUsize,

    /// Enable/disable batches that failed
    pub move_failures: AtomicUsize,

    /// Process start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            files_scanned: AtomicUsize::new(0),
            files_skipped: AtomicUsize::new(0),
            total_scan_time_ms: AtomicU64::new(0),
            rounds_completed: AtomicUsize::new(0),
            move_failures: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished scan
    pub fn record_scan(&self, scanned: usize, skipped: usize, duration: Duration) {
        self.files_scanned.fetch_add(scanned, Ordering::Relaxed);
        self.files_skipped.fetch_add(skipped, Ordering::Relaxed);
        self.total_scan_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_round(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_failure(&self) {
        self.move_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!(
            "Run summary: uptime={:.2}s, files scanned={}, skipped={}, scan time={}ms, rounds={}, move failures={}",
            self.uptime().as_secs_f64(),
            self.files_scanned.load(Ordering::Relaxed),
            self.files_skipped.load(Ordering::Relaxed),
            self.total_scan_time_ms.load(Ordering::Relaxed),
            self.rounds_completed.load(Ordering::Relaxed),
            self.move_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.files_scanned.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.rounds_completed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_scans_accumulate() {
        let metrics = Metrics::new();

        metrics.record_scan(10, 1, Duration::from_millis(40));
        metrics.record_scan(5, 0, Duration::from_millis(10));

        assert_eq!(metrics.files_scanned.load(Ordering::Relaxed), 15);
        assert_eq!(metrics.files_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_scan_time_ms.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn test_round_and_failure_counters() {
        let metrics = Metrics::new();

        metrics.record_round();
        metrics.record_round();
        metrics.record_move_failure();

        assert_eq!(metrics.rounds_completed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.move_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
