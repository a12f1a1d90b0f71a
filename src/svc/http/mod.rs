//! # HTTP module
//!
//! This module provides the health and status endpoints of the provider, the
//! readiness follows the controllers started by the daemon

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

#[cfg(feature = "metrics")]
use std::sync::LazyLock;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
#[cfg(feature = "metrics")]
use prometheus::{register_int_gauge_vec, IntGaugeVec};
use serde::Serialize;

use crate::svc::aws::client::Connector;

pub mod layer;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod server;

// -----------------------------------------------------------------------------
// Telemetry

#[cfg(feature = "metrics")]
static WATCHER_RUNNING: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "docdb_provider_watcher_running",
        "Whether the controller of the managed resource kind is running",
        &["kind"]
    )
    .expect("'docdb_provider_watcher_running' to not be already registered")
});

// -----------------------------------------------------------------------------
// Report structure

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct Report {
    pub version: &'static str,
    pub region: String,
    /// whether aws credentials and region have been resolved
    pub aws: bool,
    pub watchers: BTreeMap<&'static str, bool>,
}

// -----------------------------------------------------------------------------
// Health structure

/// state shared between the daemon and the http handlers
pub struct Health {
    connector: Arc<Connector>,
    watchers: RwLock<BTreeMap<&'static str, bool>>,
}

impl Health {
    pub fn new(connector: Arc<Connector>, kinds: impl IntoIterator<Item = &'static str>) -> Self {
        let watchers = kinds.into_iter().map(|kind| (kind, false)).collect();

        Self {
            connector,
            watchers: RwLock::new(watchers),
        }
    }

    fn set(&self, kind: &'static str, running: bool) {
        self.watchers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, running);

        #[cfg(feature = "metrics")]
        WATCHER_RUNNING
            .with_label_values(&[kind])
            .set(i64::from(running));
    }

    pub fn started(&self, kind: &'static str) {
        self.set(kind, true);
    }

    pub fn stopped(&self, kind: &'static str) {
        self.set(kind, false);
    }

    /// ready once every kind has a running controller
    pub fn ready(&self) -> bool {
        let watchers = self.watchers.read().unwrap_or_else(PoisonError::into_inner);
        !watchers.is_empty() && watchers.values().all(|running| *running)
    }

    pub fn report(&self) -> Report {
        Report {
            version: env!("CARGO_PKG_VERSION"),
            region: self.connector.region().to_string(),
            aws: self.connector.loaded(),
            watchers: self
                .watchers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .to_owned(),
        }
    }
}

// -----------------------------------------------------------------------------
// Handlers

#[tracing::instrument(skip_all)]
pub async fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

#[tracing::instrument(skip_all)]
pub async fn livez() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}

#[tracing::instrument(skip_all)]
pub async fn readyz(State(health): State<Arc<Health>>) -> Response {
    let status = if health.ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health.report().watchers)).into_response()
}

#[tracing::instrument(skip_all)]
pub async fn status(State(health): State<Arc<Health>>) -> Response {
    (StatusCode::OK, Json(health.report())).into_response()
}
