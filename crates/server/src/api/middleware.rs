//! Request accounting for the HTTP surface.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::warn;

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Counts and times every request, labelled by method, normalized path and
/// status. Server errors are also logged, since handlers only log the cause.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let path = normalize_path(request.uri().path());
    let started = Instant::now();

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let elapsed = started.elapsed();
    let status = response.status();
    let status_label = status.as_u16().to_string();
    let labels = [method.as_str(), path.as_str(), status_label.as_str()];

    HTTP_REQUEST_DURATION
        .with_label_values(&labels)
        .observe(elapsed.as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request failed"
        );
    }

    response
}
