//! # Audience Platform
//!
//! The single entry point callers use to obtain audiences. One `Platform` is
//! constructed per process and passed explicitly to whoever needs it; there
//! is no global instance.
//!
//! | Factory                    | Criterion                          |
//! |----------------------------|------------------------------------|
//! | [`Platform::everyone`]     | [`SelectionCriterion::All`]        |
//! | [`Platform::console`]      | [`SelectionCriterion::ConsoleOnly`]|
//! | [`Platform::players`]      | [`SelectionCriterion::AllPlayers`] |
//! | [`Platform::player`]       | [`SelectionCriterion::Single`]     |
//! | [`Platform::permission`]   | [`SelectionCriterion::Permission`] |
//! | [`Platform::world`]        | [`SelectionCriterion::World`]      |
//! | [`Platform::server`]       | [`SelectionCriterion::Server`]     |
//!
//! ## Lifecycle
//!
//! 1. [`Platform::new`] / [`Platform::builder`] - no runtime required
//! 2. [`Platform::start`] - spawns the directory event listener
//! 3. [`Platform::shutdown`] - stops the listener and releases the directory
//!
//! ```rust,no_run
//! use audience_core::{
//!     ChannelTransport, DirectoryEvent, Platform, PlatformConfig, Viewer, ViewerId,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let platform = Platform::new(PlatformConfig::default())?;
//!     platform.start()?;
//!
//!     let (transport, _outbound) = ChannelTransport::new(64);
//!     let viewer = Viewer::new(ViewerId::new(), Arc::new(transport)).with_permission("vip", true);
//!     platform.events().send(DirectoryEvent::Join(viewer)).await?;
//!
//!     let vips = platform.permission("vip")?;
//!     vips.send_message("Welcome to the lounge").await;
//!
//!     platform.shutdown().await;
//!     Ok(())
//! }
//! ```

use crate::audience::{Audience, AudienceInner};
use crate::cache::AudienceCache;
use crate::config::PlatformConfig;
use crate::criterion::SelectionCriterion;
use crate::directory::{Member, ViewerDirectory};
use crate::error::AudienceError;
use crate::events::{run_listener, DirectoryEvent, EventSender};
use crate::key::Key;
use crate::predicate::{AttributePermissions, PermissionBackend, PredicateEngine, Topology};
use crate::shutdown::ShutdownState;
use crate::stats::{DispatchCounters, PlatformStats};
use crate::transport::{TracingConsole, Transport};
use crate::types::{ViewerId, WorldId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// State shared between the platform and the audiences it hands out.
///
/// Audiences hold this weakly.
pub(crate) struct PlatformShared {
    pub(crate) directory: Arc<ViewerDirectory>,
    engine: PredicateEngine,
    proxy: AtomicBool,
    pub(crate) send_timeout: Option<Duration>,
    pub(crate) counters: DispatchCounters,
    pub(crate) shutdown: ShutdownState,
}

impl PlatformShared {
    fn topology(&self) -> Topology {
        if self.proxy.load(Ordering::Acquire) {
            Topology::Proxy
        } else {
            Topology::SingleServer
        }
    }

    /// Current members of `criterion`, evaluated against the topology in
    /// effect right now.
    pub(crate) async fn resolve(&self, criterion: &SelectionCriterion) -> Vec<Member> {
        self.directory
            .snapshot(criterion, &self.engine, self.topology())
            .await
    }
}

/// Builder for a [`Platform`] with custom collaborators.
pub struct PlatformBuilder {
    config: PlatformConfig,
    console: Option<Arc<dyn Transport>>,
    permissions: Option<Arc<dyn PermissionBackend>>,
}

impl PlatformBuilder {
    pub fn config(mut self, config: PlatformConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport used for the console pseudo-viewer (default: [`TracingConsole`]).
    pub fn console(mut self, console: Arc<dyn Transport>) -> Self {
        self.console = Some(console);
        self
    }

    /// Permission backend (default: [`AttributePermissions`]).
    pub fn permissions(mut self, permissions: Arc<dyn PermissionBackend>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn build(self) -> Result<Platform, AudienceError> {
        self.config.validate()?;

        let console = self
            .console
            .unwrap_or_else(|| Arc::new(TracingConsole::new()));
        let permissions = self
            .permissions
            .unwrap_or_else(|| Arc::new(AttributePermissions));

        let shutdown = ShutdownState::new();
        let shared = Arc::new(PlatformShared {
            directory: Arc::new(ViewerDirectory::new(console)),
            engine: PredicateEngine::new(permissions),
            proxy: AtomicBool::new(self.config.topology == Topology::Proxy),
            send_timeout: self.config.send_timeout(),
            counters: DispatchCounters::default(),
            shutdown: shutdown.clone(),
        });

        let cache = AudienceCache::new(self.config.cache_prune_threshold);
        let everyone = cache.get_or_create(SelectionCriterion::All, |c| {
            AudienceInner::new(c, Arc::downgrade(&shared))
        });
        let console = cache.get_or_create(SelectionCriterion::ConsoleOnly, |c| {
            AudienceInner::new(c, Arc::downgrade(&shared))
        });
        let players = cache.get_or_create(SelectionCriterion::AllPlayers, |c| {
            AudienceInner::new(c, Arc::downgrade(&shared))
        });

        let (tx, rx) = mpsc::channel(self.config.event_channel_capacity);

        info!(
            topology = ?self.config.topology,
            send_timeout_ms = self.config.send_timeout_ms,
            "🔧 Audience platform created"
        );

        Ok(Platform {
            shared,
            cache,
            everyone,
            console,
            players,
            events: EventSender::new(tx, shutdown),
            pending_events: Mutex::new(Some(rx)),
            listener: Mutex::new(None),
        })
    }
}

/// Process-wide audience entry point.
pub struct Platform {
    shared: Arc<PlatformShared>,
    cache: AudienceCache,
    // the fixed audiences are pinned so they are never evicted
    everyone: Audience,
    console: Audience,
    players: Audience,
    events: EventSender,
    pending_events: Mutex<Option<mpsc::Receiver<DirectoryEvent>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Platform {
    /// Creates a platform with the default console and permission backend.
    pub fn new(config: PlatformConfig) -> Result<Self, AudienceError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> PlatformBuilder {
        PlatformBuilder {
            config: PlatformConfig::default(),
            console: None,
            permissions: None,
        }
    }

    /// Spawns the directory event listener on the current tokio runtime.
    ///
    /// Calling `start` again while the listener runs is a no-op.
    pub fn start(&self) -> Result<(), AudienceError> {
        if self.shared.shutdown.is_shutdown_initiated() {
            return Err(AudienceError::ShutDown);
        }

        let Some(rx) = self
            .pending_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        let handle = tokio::spawn(run_listener(
            self.shared.directory.clone(),
            rx,
            self.shared.shutdown.clone(),
        ));
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!("🚀 Audience platform started");
        Ok(())
    }

    /// Stops the event listener, then releases every viewer and cached audience.
    ///
    /// Audience handles held elsewhere stay valid but reach nobody from now on.
    pub async fn shutdown(&self) {
        self.shared.shutdown.initiate_shutdown();

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            if let Err(e) = handle.await {
                warn!("⚠️ Directory event listener ended abnormally: {e}");
            }
        }
        self.pending_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        self.shared.directory.close().await;
        self.cache.clear();
        self.shared.shutdown.complete_shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_shutdown_initiated()
    }

    /// Producer handle for connection/topology events.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Direct access to the directory, for producers that run on the same task.
    ///
    /// The directory is closed by [`Platform::shutdown`]; registrations made
    /// through it afterwards are ignored.
    pub fn directory(&self) -> &ViewerDirectory {
        &self.shared.directory
    }

    pub fn topology(&self) -> Topology {
        self.shared.topology()
    }

    /// Switches topology; takes effect on the next dispatch of every audience.
    pub fn set_topology(&self, topology: Topology) {
        self.shared
            .proxy
            .store(topology == Topology::Proxy, Ordering::Release);
        info!(?topology, "🔀 Topology changed");
    }

    /// All online players and the console.
    pub fn everyone(&self) -> Audience {
        self.everyone.clone()
    }

    /// The console only.
    pub fn console(&self) -> Audience {
        self.console.clone()
    }

    /// All online players.
    pub fn players(&self) -> Audience {
        self.players.clone()
    }

    /// One player. If the player is not online, operations are silently dropped.
    pub fn player(&self, id: ViewerId) -> Audience {
        self.cached(SelectionCriterion::Single(id))
    }

    /// Players holding `permission`, and the console.
    pub fn permission(&self, permission: impl Into<String>) -> Result<Audience, AudienceError> {
        Ok(self.cached(SelectionCriterion::permission(permission)?))
    }

    /// Players holding the permission named by `key`, and the console.
    pub fn permission_key(&self, key: &Key) -> Audience {
        self.cached(SelectionCriterion::Permission(key.as_string()))
    }

    /// Players in `world`, and the console.
    pub fn world(&self, world: WorldId) -> Audience {
        self.cached(SelectionCriterion::World(world))
    }

    /// Players on backend server `name`, and the console.
    ///
    /// Outside a proxy topology this matches everyone.
    pub fn server(&self, name: impl Into<String>) -> Result<Audience, AudienceError> {
        Ok(self.cached(SelectionCriterion::server(name)?))
    }

    /// Audience for an arbitrary criterion.
    pub fn audience_for(&self, criterion: SelectionCriterion) -> Result<Audience, AudienceError> {
        criterion.validate()?;
        Ok(match criterion {
            SelectionCriterion::All => self.everyone(),
            SelectionCriterion::ConsoleOnly => self.console(),
            SelectionCriterion::AllPlayers => self.players(),
            other => self.cached(other),
        })
    }

    pub async fn stats(&self) -> PlatformStats {
        let mut stats = PlatformStats {
            viewers: self.shared.directory.len().await,
            cached_audiences: self.cache.live_len(),
            ..Default::default()
        };
        self.shared.counters.fill(&mut stats);
        stats
    }

    fn cached(&self, criterion: SelectionCriterion) -> Audience {
        let shared = Arc::downgrade(&self.shared);
        self.cache
            .get_or_create(criterion, move |c| AudienceInner::new(c, shared))
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        // stops a still-running listener even without an explicit shutdown
        self.shared.shutdown.initiate_shutdown();
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("topology", &self.topology())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
