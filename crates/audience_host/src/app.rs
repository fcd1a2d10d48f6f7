//! Host application lifecycle.
//!
//! The `HostApplication` owns the single [`Platform`] of the process. It
//! builds it from configuration, starts the directory event listener, waits
//! for a shutdown trigger and tears the platform down explicitly.

use crate::config::HostConfig;
use crate::error::HostError;
use crate::signals::wait_for_shutdown_signal;
use audience_core::{Platform, PlatformBuilder};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Process host for one audience platform.
pub struct HostApplication {
    config: HostConfig,
    platform: Arc<Platform>,
}

impl HostApplication {
    /// Validates `config` and builds a platform with the default console and
    /// permission backend.
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        Self::with_builder(config, Platform::builder())
    }

    /// Like [`HostApplication::new`], for callers that supply their own
    /// console transport or permission backend through `builder`.
    pub fn with_builder(config: HostConfig, builder: PlatformBuilder) -> Result<Self, HostError> {
        config.validate()?;
        let platform = builder.config(config.platform.clone()).build()?;
        Ok(Self {
            config,
            platform: Arc::new(platform),
        })
    }

    /// The platform to hand to the rest of the server.
    pub fn platform(&self) -> Arc<Platform> {
        self.platform.clone()
    }

    /// Runs until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<(), HostError> {
        self.run_until(async {
            if let Err(e) = wait_for_shutdown_signal().await {
                error!("❌ Signal handling failed, shutting down: {e}");
            }
        })
        .await
    }

    /// Starts the platform, waits for `shutdown` and tears the platform down.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HostError>
    where
        F: Future<Output = ()>,
    {
        self.platform.start()?;
        info!(
            topology = ?self.config.platform.topology,
            send_timeout_ms = self.config.platform.send_timeout_ms,
            event_channel_capacity = self.config.platform.event_channel_capacity,
            "🌟 Audience host running"
        );

        shutdown.await;

        let stats = self.platform.stats().await;
        info!("📊 Final audience statistics:");
        info!("  - Viewers connected: {}", stats.viewers);
        info!("  - Dispatches: {}", stats.dispatches);
        info!(
            "  - Deliveries: {} ok / {} failed ({} timed out)",
            stats.deliveries, stats.failures, stats.timeouts
        );

        self.platform.shutdown().await;
        info!("👋 Audience host stopped");
        Ok(())
    }
}
