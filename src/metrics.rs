//! Request metrics and Prometheus exposition.
//!
//! - `http_requests_total` (counter): labels service, method, path, status
//! - `http_request_duration_seconds` (histogram): labels service, method, path
//!
//! `path` is the matched route template when routing succeeded, so ids do not
//! explode label cardinality. Requests that match no route share the
//! [`UNMATCHED_PATH`] label.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::handlers::AppState;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

/// `path` label for requests no route matched.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Latency buckets in seconds, same boundaries as the Prometheus client defaults.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Installs the process-wide Prometheus recorder and returns a render handle.
///
/// The recorder can only be installed once per process; later calls return the
/// handle of the first installation.
pub fn install_recorder() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    HANDLE
        .get_or_init(|| {
            let builder = match PrometheusBuilder::new()
                .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)
            {
                Ok(builder) => builder,
                Err(e) => {
                    tracing::warn!("Invalid latency buckets, falling back to summaries: {}", e);
                    PrometheusBuilder::new()
                }
            };

            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!("Metrics recorder already installed: {}", e);
            }
            tracing::info!("Prometheus metrics recorder installed");
            handle
        })
        .clone()
}

/// Records one request into the process-wide counters.
pub fn record_request(service: &str, method: &str, path: &str, status: u16, elapsed_secs: f64) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "service" => service.to_string(),
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    metrics::histogram!(
        REQUEST_DURATION,
        "service" => service.to_string(),
        "method" => method.to_string(),
        "path" => path.to_string(),
    )
    .record(elapsed_secs);
}

/// Middleware timing every request and recording its outcome.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let response = next.run(request).await;

    record_request(
        &state.service_name,
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// GET /metrics
///
/// Prometheus text exposition of every recorded metric.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_requests_show_up_in_exposition() {
        let handle = install_recorder();
        record_request("unit-test-service", "GET", "/v1/customers/:id", 404, 0.002);
        record_request("unit-test-service", "GET", "/v1/customers/:id", 404, 0.003);

        let rendered = handle.render();
        assert!(rendered.contains(REQUESTS_TOTAL));
        assert!(rendered.contains("service=\"unit-test-service\""));
        assert!(rendered.contains("status=\"404\""));
        assert!(rendered.contains(REQUEST_DURATION));
    }

    #[test]
    fn install_is_idempotent() {
        let first = install_recorder();
        let second = install_recorder();
        record_request("idempotent-check", "POST", "/v1/customers", 201, 0.01);
        assert!(first.render().contains("idempotent-check"));
        assert!(second.render().contains("idempotent-check"));
    }
}
