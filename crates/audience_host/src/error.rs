//! Error types for hosting an audience platform.

use audience_core::AudienceError;

/// Enumeration of possible host errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Reading or writing the configuration file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`HostConfig`](crate::config::HostConfig)
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The default configuration could not be rendered
    #[error("Configuration render error: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Configuration values failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// The audience platform refused an operation
    #[error("Platform error: {0}")]
    Platform(#[from] AudienceError),
}
