//! Platform configuration.
//!
//! Every field has a serde default so a partial `[platform]` table (or none at
//! all) deserializes into a usable configuration.

use crate::error::AudienceError;
use crate::predicate::Topology;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_send_timeout_ms() -> u64 { 5000 }
fn default_event_channel_capacity() -> usize { 1024 }
fn default_cache_prune_threshold() -> usize { 256 }

/// Tunables for a [`Platform`](crate::platform::Platform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Deployment shape; decides how `server(name)` audiences resolve
    #[serde(default)]
    pub topology: Topology,
    /// Per-recipient send timeout in milliseconds (0 disables it)
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Capacity of the directory event queue
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Cache size above which dead entries are swept on insert
    #[serde(default = "default_cache_prune_threshold")]
    pub cache_prune_threshold: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            send_timeout_ms: default_send_timeout_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            cache_prune_threshold: default_cache_prune_threshold(),
        }
    }
}

impl PlatformConfig {
    /// The per-recipient send timeout, if enabled.
    pub fn send_timeout(&self) -> Option<Duration> {
        (self.send_timeout_ms > 0).then(|| Duration::from_millis(self.send_timeout_ms))
    }

    pub fn validate(&self) -> Result<(), AudienceError> {
        if self.event_channel_capacity == 0 {
            return Err(AudienceError::Config(
                "event_channel_capacity must be greater than 0".to_string(),
            ));
        }
        if self.cache_prune_threshold == 0 {
            return Err(AudienceError::Config(
                "cache_prune_threshold must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.topology, Topology::SingleServer);
        assert_eq!(config.send_timeout(), Some(Duration::from_millis(5000)));
        assert_eq!(config.event_channel_capacity, 1024);
        assert_eq!(config.cache_prune_threshold, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = PlatformConfig {
            send_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.send_timeout(), None);
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        let config = PlatformConfig {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AudienceError::Config(_))));

        let config = PlatformConfig {
            cache_prune_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: PlatformConfig =
            serde_json::from_str(r#"{ "topology": "proxy" }"#).expect("deserialize");
        assert_eq!(config.topology, Topology::Proxy);
        assert_eq!(config.send_timeout_ms, 5000);
        assert_eq!(config.event_channel_capacity, 1024);
    }
}
