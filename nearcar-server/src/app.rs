use std::sync::Arc;

use anyhow::Result;
use nearcar_core::{EtaService, MemoryCache, NoopCache, ResultCache, StaticDirectory};
use nearcar_upstream::{ClientConfig, UpstreamClient};
use reqwest::Client;
use tracing::info;

use crate::config::Config;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub(crate) struct App {
    pub(crate) service: Arc<EtaService>,
}

impl App {
    pub(crate) fn new(service: Arc<EtaService>) -> Self {
        Self { service }
    }

    /// Wire the upstream client, directory, and cache described by `config`.
    pub(crate) fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder().user_agent("nearcar/0.1").build()?;

        let directory = Arc::new(StaticDirectory::new(config.upstreams.iter().cloned()));
        let cache: Arc<dyn ResultCache> = match config.cache_ttl() {
            Some(ttl) => {
                info!(
                    ttl_secs = ttl.as_secs(),
                    capacity = config.cache_capacity,
                    "in-memory result cache enabled"
                );
                Arc::new(MemoryCache::with_capacity(ttl, config.cache_capacity))
            }
            None => Arc::new(NoopCache),
        };

        let client = UpstreamClient::new(http, directory, cache).with_config(ClientConfig {
            timeout: config.timeout(),
        });
        let service = EtaService::new(Arc::new(client)).with_vehicle_limit(config.vehicle_limit);

        Ok(Self::new(Arc::new(service)))
    }
}
