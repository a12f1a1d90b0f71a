//! # Server module
//!
//! This module provides the router of the provider and the function serving
//! it, based on the crate [`axum`].

use std::{net::SocketAddr, sync::Arc};

use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

#[cfg(feature = "metrics")]
use crate::svc::http::metrics;
use crate::svc::http::{layer, livez, not_found, readyz, status, Health};

// -----------------------------------------------------------------------------
// Error

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to bind on socket '{0}', {1}")]
    Bind(SocketAddr, std::io::Error),
    #[error("failed to listen on socket '{0}', {1}")]
    Serve(SocketAddr, std::io::Error),
}

// -----------------------------------------------------------------------------
// router

/// `/healthz` and `/readyz` answer 503 until every controller runs
#[cfg_attr(feature = "trace", tracing::instrument(skip(health)))]
pub fn router(health: Arc<Health>) -> Router {
    let router = Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(readyz))
        .route("/readyz", get(readyz))
        .route("/status", get(status));

    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(metrics::handler));

    router
        .fallback(any(not_found))
        .layer(middleware::from_fn(layer::access))
        .with_state(health)
}

// -----------------------------------------------------------------------------
// helpers

#[cfg_attr(feature = "trace", tracing::instrument(skip(router)))]
pub async fn serve(router: Router, addr: SocketAddr) -> Result<(), Error> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| Error::Bind(addr, err))?;

    info!(addr = addr.to_string(), "Serve health and status endpoints");
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| Error::Serve(addr, err))
}
