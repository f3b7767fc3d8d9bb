//! Per-request timing log and metrics.
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use common::metrics::observe_request;

/// `GET /accounts/ - Status: 200 - Time: 12ms`
pub fn timing_line(method: &str, path: &str, status: u16, elapsed: Duration) -> String {
    format!(
        "{method} {path} - Status: {status} - Time: {:.0}ms",
        elapsed.as_secs_f64() * 1000.0
    )
}

pub async fn request_timing(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let resp = next.run(req).await;

    let elapsed = started.elapsed();
    let status = resp.status().as_u16();
    observe_request(&method, status, elapsed);
    info!(target: "crm::timing", "{}", timing_line(&method, &path, status, elapsed));
    resp
}
