//! # Directory Events
//!
//! Connection and topology changes reach the directory as [`DirectoryEvent`]s.
//! Producers hold a cloneable [`EventSender`]; a single listener task owned by
//! the [`Platform`](crate::platform::Platform) drains the queue and applies the
//! events in arrival order.
//!
//! ```text
//! Producers (many):                    Listener (one):
//!   login handler  ──┐
//!   perm backend   ──┼──► EventSender ──► run_listener ──► ViewerDirectory::apply
//!   world tracker  ──┘   (bounded mpsc)
//! ```

use crate::directory::ViewerDirectory;
use crate::error::AudienceError;
use crate::shutdown::ShutdownState;
use crate::types::{Viewer, ViewerId, WorldId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// A change to the connected population.
#[derive(Debug, Clone)]
pub enum DirectoryEvent {
    /// A player connected
    Join(Viewer),
    /// A player disconnected
    Leave(ViewerId),
    /// A permission override was set, or cleared with `None`
    PermissionChanged {
        id: ViewerId,
        key: String,
        value: Option<bool>,
    },
    /// A player moved to another world
    WorldChanged { id: ViewerId, world: Option<WorldId> },
    /// A player moved to another backend server
    ServerChanged { id: ViewerId, server: Option<String> },
    /// A player stopped or resumed receiving anything
    OnlineChanged { id: ViewerId, online: bool },
}

impl DirectoryEvent {
    /// The viewer this event concerns.
    pub fn viewer_id(&self) -> ViewerId {
        match self {
            DirectoryEvent::Join(viewer) => viewer.id,
            DirectoryEvent::Leave(id)
            | DirectoryEvent::PermissionChanged { id, .. }
            | DirectoryEvent::WorldChanged { id, .. }
            | DirectoryEvent::ServerChanged { id, .. }
            | DirectoryEvent::OnlineChanged { id, .. } => *id,
        }
    }
}

/// Cloneable producer handle for directory events.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<DirectoryEvent>,
    shutdown: ShutdownState,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<DirectoryEvent>, shutdown: ShutdownState) -> Self {
        Self { tx, shutdown }
    }

    /// Queues an event, waiting for room if the queue is full.
    pub async fn send(&self, event: DirectoryEvent) -> Result<(), AudienceError> {
        if self.shutdown.is_shutdown_initiated() {
            return Err(AudienceError::ShutDown);
        }
        self.tx
            .send(event)
            .await
            .map_err(|_| AudienceError::EventChannelClosed)
    }
}

/// Drains `rx` into `directory` until shutdown is initiated or every sender is gone.
pub(crate) async fn run_listener(
    directory: Arc<ViewerDirectory>,
    mut rx: mpsc::Receiver<DirectoryEvent>,
    shutdown: ShutdownState,
) {
    info!("👂 Directory event listener started");
    let mut applied: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait_for_shutdown() => break,
            event = rx.recv() => match event {
                Some(event) => {
                    directory.apply(event).await;
                    applied += 1;
                }
                None => break,
            }
        }
    }

    rx.close();
    info!(applied, "🛑 Directory event listener stopped");
}
