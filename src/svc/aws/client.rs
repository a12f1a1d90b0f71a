//! # Client module
//!
//! This module provide the connector that lazily resolves aws credentials and
//! builds one documentdb client per region

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_docdb::config::Credentials;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::svc::{
    aws::{docdb::DocDb, sdk::Sdk, Error},
    cfg,
};

// -----------------------------------------------------------------------------
// Connect trait

/// returns a documentdb client bound to the given region, the default region
/// of the process is used if none is given
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self, region: Option<&str>) -> Result<Arc<dyn DocDb>, Error>;
}

#[async_trait]
impl<T> Connect for Arc<T>
where
    T: Connect + ?Sized,
{
    async fn connect(&self, region: Option<&str>) -> Result<Arc<dyn DocDb>, Error> {
        (**self).connect(region).await
    }
}

// -----------------------------------------------------------------------------
// Connector structure

/// process-wide connector, the sdk configuration is built on first use and
/// clients are memoized per region until the process restarts
pub struct Connector {
    config: cfg::Aws,
    sdk: OnceCell<SdkConfig>,
    clients: Mutex<HashMap<String, Arc<dyn DocDb>>>,
}

impl From<cfg::Aws> for Connector {
    fn from(config: cfg::Aws) -> Self {
        Self {
            config,
            sdk: OnceCell::new(),
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Connector {
    /// returns if the sdk configuration has already been loaded
    pub fn loaded(&self) -> bool {
        self.sdk.initialized()
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    async fn sdk(&self) -> &SdkConfig {
        self.sdk
            .get_or_init(|| async {
                info!(
                    region = &self.config.region,
                    endpoint = self.config.endpoint.as_deref().unwrap_or("<default>"),
                    "Load aws configuration"
                );

                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.config.region.to_owned()));

                if let Some(endpoint) = &self.config.endpoint {
                    loader = loader.endpoint_url(endpoint);
                }

                if let (Some(id), Some(secret)) =
                    (&self.config.access_key_id, &self.config.secret_access_key)
                {
                    loader = loader.credentials_provider(Credentials::new(
                        id,
                        secret,
                        self.config.session_token.to_owned(),
                        None,
                        env!("CARGO_PKG_NAME"),
                    ));
                }

                loader.load().await
            })
            .await
    }
}

#[async_trait]
impl Connect for Connector {
    async fn connect(&self, region: Option<&str>) -> Result<Arc<dyn DocDb>, Error> {
        let region = region
            .filter(|region| !region.is_empty())
            .unwrap_or(&self.config.region)
            .to_string();

        let cached = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&region)
            .cloned();

        if let Some(client) = cached {
            return Ok(client);
        }

        let sdk = self.sdk().await;
        if sdk.credentials_provider().is_none() {
            return Err(Error::Configuration(
                "no aws credentials provider could be resolved".to_string(),
            ));
        }

        debug!(region = &region, "Create documentdb client for region");
        let config = aws_sdk_docdb::config::Builder::from(sdk)
            .region(Region::new(region.to_owned()))
            .build();

        let client: Arc<dyn DocDb> = Arc::new(Sdk::from(aws_sdk_docdb::Client::from_conf(config)));

        Ok(self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(region)
            .or_insert(client)
            .to_owned())
    }
}
