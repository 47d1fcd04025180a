use std::{sync::Arc, time::Instant};

use tokio::sync::watch;

use crate::{config::AppConfig, relay::service::RelayService, upstream::traits::UpstreamSource};

pub struct AppState {
    pub config: AppConfig,
    pub relay: RelayService,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        source: Arc<dyn UpstreamSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let relay = RelayService::new(source, config.upstream_idle_timeout, shutdown);
        Self {
            config,
            relay,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
