//! # Metrics module
//!
//! This module exports the reconciliation counters, the watcher gauges and
//! the access counters in prometheus text format

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use prometheus::{Encoder, TextEncoder};
use tracing::error;

/// returns the gathered metrics encoded in text format
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let mut buf = vec![];
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    Ok(buf)
}

#[tracing::instrument(skip_all)]
pub async fn handler() -> Response {
    match render() {
        Ok(buf) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())],
            buf,
        )
            .into_response(),
        Err(err) => {
            error!(error = err.to_string(), "Could not encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}
