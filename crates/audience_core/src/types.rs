//! # Core Type Definitions
//!
//! Identifiers and the per-viewer record tracked by the
//! [`ViewerDirectory`](crate::directory::ViewerDirectory).
//!
//! ## Key Types
//!
//! - [`ViewerId`] - Unique identifier for a connected player
//! - [`WorldId`] - Unique identifier for a world a player can be located in
//! - [`Recipient`] - Who a single delivery is addressed to (console or player)
//! - [`Viewer`] - A connected player and its mutable attributes

use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a connected player.
///
/// This is a wrapper around UUID that provides type safety and ensures
/// viewer IDs cannot be confused with world IDs.
///
/// # Examples
///
/// ```rust
/// use audience_core::ViewerId;
///
/// let viewer_id = ViewerId::new();
/// let parsed: ViewerId = "550e8400-e29b-41d4-a716-446655440000".parse()?;
/// println!("Viewer: {}", parsed);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(pub Uuid);

impl ViewerId {
    /// Creates a new random viewer ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ViewerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub Uuid);

impl WorldId {
    /// Creates a new random world ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for WorldId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The addressee of a single delivery.
///
/// The console has no UUID; it is always addressed as [`Recipient::Console`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    /// The server operator console
    Console,
    /// A connected player
    Player(ViewerId),
}

impl Recipient {
    /// Returns the player id, or `None` for the console.
    pub fn viewer_id(&self) -> Option<ViewerId> {
        match self {
            Recipient::Console => None,
            Recipient::Player(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::Console => write!(f, "console"),
            Recipient::Player(id) => write!(f, "player:{}", id),
        }
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// A connected player tracked by the directory.
///
/// Viewers are immutable once stored; attribute changes replace the stored
/// record with an updated copy so that a snapshot taken by an in-flight
/// dispatch is never torn.
///
/// # Examples
///
/// ```rust
/// use audience_core::{Viewer, ViewerId, WorldId, TracingConsole};
/// use std::sync::Arc;
///
/// let viewer = Viewer::new(ViewerId::new(), Arc::new(TracingConsole::new()))
///     .with_permission("chat.say", true)
///     .with_world(WorldId::new())
///     .with_server("lobby");
/// assert!(viewer.online);
/// ```
#[derive(Clone)]
pub struct Viewer {
    /// Identity of the player
    pub id: ViewerId,
    /// Whether the player currently receives anything at all
    pub online: bool,
    /// Explicit permission overrides; absent keys resolve to `false`
    pub permissions: HashMap<String, bool>,
    /// World the player is currently located in
    pub world: Option<WorldId>,
    /// Backend server name, only present under proxy topologies
    pub server: Option<String>,
    /// Outbound delivery handle for this player
    pub transport: Arc<dyn Transport>,
}

impl Viewer {
    /// Creates an online viewer with no permissions, world or server.
    pub fn new(id: ViewerId, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            online: true,
            permissions: HashMap::new(),
            world: None,
            server: None,
            transport,
        }
    }

    pub fn with_permission(mut self, key: impl Into<String>, value: bool) -> Self {
        self.permissions.insert(key.into(), value);
        self
    }

    pub fn with_world(mut self, world: WorldId) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Looks up an explicit permission override.
    pub fn permission(&self, key: &str) -> Option<bool> {
        self.permissions.get(key).copied()
    }

    pub fn recipient(&self) -> Recipient {
        Recipient::Player(self.id)
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("id", &self.id)
            .field("online", &self.online)
            .field("permissions", &self.permissions)
            .field("world", &self.world)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}
