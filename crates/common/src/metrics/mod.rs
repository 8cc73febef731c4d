//! Metrics and observability utilities
//!
//! Prometheus-style meters for the attendance workflow with standardized
//! naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Rollcall metrics
pub const METRICS_PREFIX: &str = "rollcall";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Session metrics
    describe_counter!(
        format!("{}_sessions_started_total", METRICS_PREFIX),
        Unit::Count,
        "Total attendance sessions started"
    );

    describe_counter!(
        format!("{}_sessions_ended_total", METRICS_PREFIX),
        Unit::Count,
        "Total attendance sessions ended"
    );

    // Attendance metrics
    describe_counter!(
        format!("{}_attendance_marked_total", METRICS_PREFIX),
        Unit::Count,
        "Total attendance records written"
    );

    // Face engine metrics
    describe_counter!(
        format!("{}_face_scans_total", METRICS_PREFIX),
        Unit::Count,
        "Total face scan requests"
    );

    describe_histogram!(
        format!("{}_face_scan_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Face scan latency in seconds"
    );

    describe_counter!(
        format!("{}_face_verifications_total", METRICS_PREFIX),
        Unit::Count,
        "Face verification outcomes"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a started attendance session
pub fn record_session_started() {
    counter!(format!("{}_sessions_started_total", METRICS_PREFIX)).increment(1);
}

/// Record an ended attendance session
pub fn record_session_ended() {
    counter!(format!("{}_sessions_ended_total", METRICS_PREFIX)).increment(1);
}

/// Record a written attendance record
pub fn record_attendance_marked() {
    counter!(format!("{}_attendance_marked_total", METRICS_PREFIX)).increment(1);
}

/// Record a face scan against the engine
pub fn record_face_scan(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_face_scans_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(format!("{}_face_scan_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    }
}

/// Record a face verification outcome
pub fn record_face_verification(matched: bool) {
    let outcome = if matched { "matched" } else { "rejected" };

    counter!(
        format!("{}_face_verifications_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/api/student/mark-attendance");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }

    #[test]
    fn test_outcome_helpers() {
        record_face_verification(true);
        record_face_verification(false);
        record_face_scan(0.1, true);
        record_attendance_marked();
    }
}
