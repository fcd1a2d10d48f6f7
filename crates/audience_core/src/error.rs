//! Error types for the audience subsystem.
//!
//! Only construction-time and lifecycle failures surface as errors. Targets
//! that match nobody are silent no-ops, and per-recipient delivery failures
//! are reported inside a [`DispatchReport`](crate::audience::DispatchReport)
//! rather than returned.

/// Enumeration of possible audience errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudienceError {
    /// Malformed factory input, rejected before the directory is touched
    #[error("Invalid audience criterion: {reason}")]
    InvalidCriterion { reason: String },

    /// Configuration values that cannot be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// The platform has been shut down
    #[error("Platform has been shut down")]
    ShutDown,

    /// The event listener is no longer receiving events
    #[error("Directory event channel is closed")]
    EventChannelClosed,
}

impl AudienceError {
    pub(crate) fn invalid_criterion(reason: impl Into<String>) -> Self {
        Self::InvalidCriterion {
            reason: reason.into(),
        }
    }
}
