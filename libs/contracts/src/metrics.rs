//! Lock-free request counters backing `get_metrics()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::ServiceMetrics;

/// Counters shared by every concurrent invocation of a service.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    requests: AtomicU64,
    errors: AtomicU64,
    total_response_micros: AtomicU64,
    active_connections: AtomicU64,
    queue_depth: AtomicU64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one served request.
    pub fn record(&self, elapsed: Duration, success: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_response_micros
            .fetch_add(micros, Ordering::Relaxed);
    }

    /// Starts timing a request; finish it with [`RequestTimer::finish`].
    pub fn start_request(&self) -> RequestTimer<'_> {
        RequestTimer {
            recorder: self,
            started: Instant::now(),
        }
    }

    /// Counts a connection for as long as the guard lives.
    pub fn connection(&self) -> ConnectionGuard<'_> {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard { recorder: self }
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Snapshot of the counters. Memory and CPU usage are left at zero for
    /// the service to fill in if it measures them.
    pub fn snapshot(&self) -> ServiceMetrics {
        let requests = self.requests.load(Ordering::Relaxed);
        let total_micros = self.total_response_micros.load(Ordering::Relaxed);
        let average_response_time = if requests == 0 {
            0.0
        } else {
            total_micros as f64 / requests as f64 / 1000.0
        };
        ServiceMetrics {
            timestamp: Utc::now(),
            request_count: requests,
            error_count: self.errors.load(Ordering::Relaxed),
            average_response_time,
            active_connections: self.active_connections.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            ..ServiceMetrics::default()
        }
    }
}

/// Times one request against a [`MetricsRecorder`].
#[derive(Debug)]
pub struct RequestTimer<'a> {
    recorder: &'a MetricsRecorder,
    started: Instant,
}

impl RequestTimer<'_> {
    pub fn finish(self, success: bool) {
        self.recorder.record(self.started.elapsed(), success);
    }
}

/// Decrements the active connection count on drop.
#[derive(Debug)]
pub struct ConnectionGuard<'a> {
    recorder: &'a MetricsRecorder,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.recorder
            .active_connections
            .fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = MetricsRecorder::new();
        metrics.record(Duration::from_millis(10), true);
        metrics.record(Duration::from_millis(30), false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert!((snapshot.average_response_time - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsRecorder::new().snapshot();
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.average_response_time, 0.0);
    }

    #[test]
    fn test_connection_guard() {
        let metrics = MetricsRecorder::new();
        {
            let _a = metrics.connection();
            let _b = metrics.connection();
            assert_eq!(metrics.snapshot().active_connections, 2);
        }
        assert_eq!(metrics.snapshot().active_connections, 0);
    }

    #[test]
    fn test_timer_and_queue_depth() {
        let metrics = MetricsRecorder::new();
        metrics.start_request().finish(true);
        metrics.set_queue_depth(7);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.request_count, 1);
        assert_eq!(snapshot.queue_depth, 7);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = std::sync::Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record(Duration::from_micros(5), true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().request_count, 800);
    }
}
