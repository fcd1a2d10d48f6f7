//! # Audience Core
//!
//! Live, addressable groups of message recipients on a multi-user game
//! server. Callers obtain an [`Audience`] from the [`Platform`] (everyone,
//! the console, all players, one player, a permission, a world or a backend
//! server) and send chat, titles, sounds and other presentational events to
//! it without knowing who currently belongs to it.
//!
//! ## Architecture Overview
//!
//! - **ViewerDirectory**: authoritative set of connected viewers, mutated by
//!   [`DirectoryEvent`]s
//! - **PredicateEngine**: pure membership test of a [`SelectionCriterion`]
//!   against a viewer
//! - **AudienceCache**: weakly-retained, criterion-keyed memoization so equal
//!   requests share one handle
//! - **Audience**: re-resolves its members on every dispatch and fans the
//!   operation out with per-recipient failure isolation
//! - **Platform**: factory entry points and explicit start/shutdown
//!
//! ```text
//! join/leave/attr events ──► ViewerDirectory ◄── snapshot ── Audience::dispatch
//!                                                               │
//!                                      PredicateEngine ◄────────┤
//!                                                               ▼
//!                                                  Transport::send (per recipient)
//! ```

pub mod audience;
pub mod cache;
pub mod config;
pub mod criterion;
pub mod directory;
pub mod error;
pub mod events;
pub mod key;
pub mod platform;
pub mod predicate;
pub mod shutdown;
pub mod stats;
pub mod transport;
pub mod types;


pub use audience::{Audience, DispatchReport};
pub use cache::AudienceCache;
pub use config::PlatformConfig;
pub use criterion::SelectionCriterion;
pub use directory::{Member, ViewerDirectory};
pub use error::AudienceError;
pub use events::{DirectoryEvent, EventSender};
pub use key::Key;
pub use platform::{Platform, PlatformBuilder};
pub use predicate::{AttributePermissions, PermissionBackend, PredicateEngine, Subject, Topology};
pub use shutdown::ShutdownState;
pub use stats::PlatformStats;
pub use transport::{
    ChannelTransport, Content, MessageKind, Operation, TitleTimes, TracingConsole, Transport,
    TransportError,
};
pub use types::{Recipient, Viewer, ViewerId, WorldId};
