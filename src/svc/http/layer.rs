//! # Layer module
//!
//! This module provides the access middleware of the router, requests are
//! logged and counted by route

#[cfg(feature = "metrics")]
use std::sync::LazyLock;
use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};
use tracing::{debug, info_span, Instrument};

// -----------------------------------------------------------------------------
// Constants

pub const UNMATCHED_ROUTE: &str = "<unmatched>";

// -----------------------------------------------------------------------------
// Telemetry

#[cfg(feature = "metrics")]
static ACCESS_REQUEST: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "docdb_provider_http_requests",
        "Number of requests on the health and status endpoints",
        &["method", "route", "status"]
    )
    .expect("'docdb_provider_http_requests' to not be already registered")
});

#[cfg(feature = "metrics")]
static ACCESS_REQUEST_DURATION: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "docdb_provider_http_requests_duration",
        "Cumulated duration of requests in microseconds",
        &["method", "route", "status"]
    )
    .expect("'docdb_provider_http_requests_duration' to not be already registered")
});

// -----------------------------------------------------------------------------
// Helpers

/// returns the route template that matched the request, unknown paths share
/// one label
pub fn route(req: &Request<Body>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_string()
}

// -----------------------------------------------------------------------------
// Access

pub async fn access(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let route = route(&req);
    let agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("<none>")
        .to_string();

    let begin = Instant::now();
    let res = next
        .run(req)
        .instrument(info_span!("http", route = route.as_str()))
        .await;
    let duration = begin.elapsed().as_micros();
    let status = res.status().as_u16().to_string();

    #[cfg(feature = "metrics")]
    {
        let labels = [method.as_str(), route.as_str(), status.as_str()];
        ACCESS_REQUEST.with_label_values(&labels).inc();
        ACCESS_REQUEST_DURATION
            .with_label_values(&labels)
            .inc_by(u64::try_from(duration).unwrap_or(u64::MAX));
    }

    // kubelet polls these endpoints every few seconds
    debug!(
        method = method,
        route = route,
        agent = agent,
        duration = format!("{duration}us"),
        status = status,
        "Request served"
    );

    res
}
