use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Quiz source
    pub static ref QUIZ_FETCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_fetch_total",
        "Quiz document fetches by source and outcome",
        &["source", "status"]
    )
    .unwrap();

    pub static ref QUIZ_FETCH_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "quiz_fetch_duration_seconds",
        "Quiz document fetch duration in seconds",
        &["source"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Game Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Quiz session lifecycle events",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "quiz_sessions_active",
        "Number of sessions held in memory"
    )
    .unwrap();

    pub static ref ANSWERS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_submitted_total",
        "Total number of answers resolved",
        &["result"]
    )
    .unwrap();

    pub static ref POWERUPS_USED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "powerups_used_total",
        "Power-ups that took effect",
        &["kind"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Label for `ANSWERS_SUBMITTED_TOTAL`.
pub fn answer_result_label(correct: bool, timed_out: bool) -> &'static str {
    match (correct, timed_out) {
        (true, _) => "correct",
        (false, true) => "timeout",
        (false, false) => "incorrect",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics() {
        POWERUPS_USED_TOTAL.with_label_values(&["extra_time"]).inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("powerups_used_total"));
    }

    #[test]
    fn answer_labels() {
        assert_eq!(answer_result_label(true, false), "correct");
        assert_eq!(answer_result_label(false, true), "timeout");
        assert_eq!(answer_result_label(false, false), "incorrect");
    }
}
