//! # Audience Host
//!
//! Hosts one [`audience_core::Platform`] for a server process: loads the TOML
//! configuration, installs the tracing subscriber, starts the platform and
//! shuts it down on SIGINT/SIGTERM.
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), audience_host::HostError> {
//!     audience_host::init("audience.toml").await
//! }
//! ```
//!
//! Servers that need the platform handle before blocking on signals build a
//! [`HostApplication`] themselves and pass [`HostApplication::platform`] to
//! their connection handlers.

use std::path::Path;

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod signals;

pub use app::HostApplication;
pub use config::{HostConfig, LoggingSettings};
pub use error::HostError;
pub use logging::setup_logging;

/// Loads configuration, sets up logging and runs a host until a
/// termination signal arrives.
pub async fn init(config_path: impl AsRef<Path>) -> Result<(), HostError> {
    let config = HostConfig::load_from_file(config_path.as_ref()).await?;
    setup_logging(&config.logging)?;

    HostApplication::new(config)?.run().await
}
