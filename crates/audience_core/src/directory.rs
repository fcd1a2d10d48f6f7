//! Viewer directory for tracking the connected population.
//!
//! The directory is the single owner of every [`Viewer`]. It is mutated only
//! by connection and attribute-change events and read by audience dispatches.
//!
//! # Architecture
//!
//! * One `RwLock` serializes writers; readers copy out `Arc<Viewer>` handles
//!   and release the lock before any predicate or transport call runs
//! * Stored viewers are never mutated in place: an attribute change swaps in
//!   an updated copy, so a snapshot can never observe a half-applied change
//! * Registration order is kept in a `BTreeMap` keyed by a monotonically
//!   increasing sequence number

use crate::criterion::SelectionCriterion;
use crate::events::DirectoryEvent;
use crate::predicate::{PredicateEngine, Subject, Topology};
use crate::transport::Transport;
use crate::types::{Recipient, Viewer, ViewerId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// One resolved recipient of a dispatch.
#[derive(Clone)]
pub struct Member {
    pub recipient: Recipient,
    pub transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member").field("recipient", &self.recipient).finish_non_exhaustive()
    }
}

#[derive(Default)]
struct DirectoryState {
    /// Set on platform shutdown; registrations are refused from then on
    closed: bool,
    next_seq: u64,
    /// Registration sequence number -> viewer
    order: BTreeMap<u64, Arc<Viewer>>,
    /// Viewer id -> registration sequence number
    index: HashMap<ViewerId, u64>,
}

impl DirectoryState {
    fn remove(&mut self, id: &ViewerId) -> Option<Arc<Viewer>> {
        let seq = self.index.remove(id)?;
        self.order.remove(&seq)
    }
}

/// Authoritative set of connected viewers plus the console pseudo-viewer.
pub struct ViewerDirectory {
    state: RwLock<DirectoryState>,
    console: Arc<dyn Transport>,
}

impl ViewerDirectory {
    /// Creates an empty directory whose console deliveries go to `console`.
    pub fn new(console: Arc<dyn Transport>) -> Self {
        Self {
            state: RwLock::new(DirectoryState::default()),
            console,
        }
    }

    /// Inserts a viewer, atomically replacing any viewer with the same id.
    ///
    /// Returns `true` if an existing viewer was replaced. A replaced viewer
    /// takes a fresh position at the end of the registration order.
    /// A closed directory drops the viewer and returns `false`.
    pub async fn register(&self, viewer: Viewer) -> bool {
        self.insert(viewer).await.unwrap_or(false)
    }

    /// `None` if the directory is closed, otherwise whether a viewer was replaced.
    async fn insert(&self, viewer: Viewer) -> Option<bool> {
        let id = viewer.id;
        let mut state = self.state.write().await;
        if state.closed {
            drop(state);
            debug!(viewer = %id, "Ignoring registration on closed directory");
            return None;
        }
        let replaced = state.remove(&id).is_some();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.insert(seq, Arc::new(viewer));
        state.index.insert(id, seq);
        drop(state);

        if replaced {
            debug!(viewer = %id, "🔁 Viewer re-registered");
        } else {
            debug!(viewer = %id, "🔗 Viewer registered");
        }
        Some(replaced)
    }

    /// Removes a viewer. Unregistering an absent id is a no-op.
    ///
    /// Returns `true` if a viewer was removed.
    pub async fn unregister(&self, id: ViewerId) -> bool {
        let removed = self.state.write().await.remove(&id).is_some();
        if removed {
            debug!(viewer = %id, "❌ Viewer unregistered");
        }
        removed
    }

    /// Applies `mutator` to a registered viewer.
    ///
    /// Returns `false` without calling `mutator` when the viewer is not
    /// registered, which happens when a change event races a disconnect.
    /// The viewer's id cannot be changed through this call.
    pub async fn update_attributes<F>(&self, id: ViewerId, mutator: F) -> bool
    where
        F: FnOnce(&mut Viewer),
    {
        let mut state = self.state.write().await;
        let Some(seq) = state.index.get(&id).copied() else {
            trace!(viewer = %id, "Dropping attribute update for unregistered viewer");
            return false;
        };
        let Some(current) = state.order.get(&seq) else {
            return false;
        };

        let mut updated = Viewer::clone(current);
        mutator(&mut updated);
        updated.id = id;
        state.order.insert(seq, Arc::new(updated));
        true
    }

    /// Applies one connection/topology event.
    ///
    /// Returns whether the directory changed.
    pub async fn apply(&self, event: DirectoryEvent) -> bool {
        match event {
            DirectoryEvent::Join(viewer) => self.insert(viewer).await.is_some(),
            DirectoryEvent::Leave(id) => self.unregister(id).await,
            DirectoryEvent::PermissionChanged { id, key, value } => {
                self.update_attributes(id, |viewer| match value {
                    Some(value) => {
                        viewer.permissions.insert(key, value);
                    }
                    None => {
                        viewer.permissions.remove(&key);
                    }
                })
                .await
            }
            DirectoryEvent::WorldChanged { id, world } => {
                self.update_attributes(id, |viewer| viewer.world = world).await
            }
            DirectoryEvent::ServerChanged { id, server } => {
                self.update_attributes(id, |viewer| viewer.server = server).await
            }
            DirectoryEvent::OnlineChanged { id, online } => {
                self.update_attributes(id, |viewer| viewer.online = online).await
            }
        }
    }

    /// Returns the viewer currently registered under `id`.
    pub async fn get(&self, id: ViewerId) -> Option<Arc<Viewer>> {
        let state = self.state.read().await;
        let seq = state.index.get(&id)?;
        state.order.get(seq).cloned()
    }

    pub async fn contains(&self, id: ViewerId) -> bool {
        self.state.read().await.index.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.index.is_empty()
    }

    /// Every registered viewer, in registration order.
    pub async fn viewers(&self) -> Vec<Arc<Viewer>> {
        self.state.read().await.order.values().cloned().collect()
    }

    /// Removes every viewer and refuses all later registrations.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.closed = true;
        state.order.clear();
        state.index.clear();
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }

    /// Resolves the current members of `criterion`.
    ///
    /// The console comes first when the criterion includes it, followed by
    /// matching players in registration order. The player set is taken from
    /// one consistent read of the directory; the lock is released before the
    /// permission backend is consulted.
    pub async fn snapshot(
        &self,
        criterion: &SelectionCriterion,
        engine: &PredicateEngine,
        topology: Topology,
    ) -> Vec<Member> {
        let mut members = Vec::new();
        if criterion.includes_console() {
            members.push(Member {
                recipient: Recipient::Console,
                transport: self.console.clone(),
            });
        }

        if matches!(criterion, SelectionCriterion::ConsoleOnly) {
            return members;
        }

        let candidates: Vec<Arc<Viewer>> = match criterion {
            SelectionCriterion::Single(id) => self.get(*id).await.into_iter().collect(),
            _ => self.viewers().await,
        };

        for viewer in &candidates {
            if engine.matches(criterion, Subject::Player(viewer), topology) {
                members.push(Member {
                    recipient: viewer.recipient(),
                    transport: viewer.transport.clone(),
                });
            }
        }
        members
    }
}

impl std::fmt::Debug for ViewerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerDirectory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TracingConsole;
    use crate::types::WorldId;

    fn directory() -> ViewerDirectory {
        ViewerDirectory::new(Arc::new(TracingConsole::new()))
    }

    fn viewer(id: ViewerId) -> Viewer {
        Viewer::new(id, Arc::new(TracingConsole::new()))
    }

    fn recipients(members: &[Member]) -> Vec<Recipient> {
        members.iter().map(|m| m.recipient).collect()
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let dir = directory();
        let id = ViewerId::new();

        assert!(!dir.register(viewer(id)).await);
        assert!(dir.contains(id).await);
        assert_eq!(dir.len().await, 1);

        assert!(dir.unregister(id).await);
        assert!(!dir.unregister(id).await);
        assert!(dir.is_empty().await);
    }

    #[tokio::test]
    async fn test_closed_directory_stays_empty() {
        let dir = directory();
        dir.register(viewer(ViewerId::new())).await;

        dir.close().await;
        assert!(dir.is_closed().await);
        assert!(dir.is_empty().await);

        let late = ViewerId::new();
        assert!(!dir.register(viewer(late)).await);
        assert!(!dir.contains(late).await);
        assert!(!dir.apply(DirectoryEvent::Join(viewer(ViewerId::new()))).await);
        let members = dir
            .snapshot(&SelectionCriterion::All, &PredicateEngine::default(), Topology::SingleServer)
            .await;
        assert_eq!(recipients(&members), vec![Recipient::Console]);
    }

    #[tokio::test]
    async fn test_reregister_replaces_without_duplicates() {
        let dir = directory();
        let first = ViewerId::new();
        let second = ViewerId::new();

        dir.register(viewer(first).with_permission("vip", false)).await;
        dir.register(viewer(second)).await;
        assert!(dir.register(viewer(first).with_permission("vip", true)).await);

        assert_eq!(dir.len().await, 2);
        let order: Vec<ViewerId> = dir.viewers().await.iter().map(|v| v.id).collect();
        assert_eq!(order, vec![second, first]);
        let stored = dir.get(first).await.expect("registered");
        assert_eq!(stored.permission("vip"), Some(true));
    }

    #[tokio::test]
    async fn test_update_attributes_of_absent_viewer_is_noop() {
        let dir = directory();
        let mut called = false;
        assert!(!dir.update_attributes(ViewerId::new(), |_| called = true).await);
        assert!(!called);
    }

    #[tokio::test]
    async fn test_update_attributes_keeps_position_and_id() {
        let dir = directory();
        let a = ViewerId::new();
        let b = ViewerId::new();
        dir.register(viewer(a)).await;
        dir.register(viewer(b)).await;

        let world = WorldId::new();
        assert!(
            dir.update_attributes(a, |v| {
                v.world = Some(world);
                v.id = ViewerId::new();
            })
            .await
        );

        let order: Vec<ViewerId> = dir.viewers().await.iter().map(|v| v.id).collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(dir.get(a).await.expect("registered").world, Some(world));
    }

    #[tokio::test]
    async fn test_snapshot_orders_console_first() {
        let dir = directory();
        let engine = PredicateEngine::default();
        let a = ViewerId::new();
        let b = ViewerId::new();
        dir.register(viewer(a)).await;
        dir.register(viewer(b)).await;

        let single_server = Topology::SingleServer;
        let all = dir.snapshot(&SelectionCriterion::All, &engine, single_server).await;
        assert_eq!(
            recipients(&all),
            vec![Recipient::Console, Recipient::Player(a), Recipient::Player(b)]
        );

        let players = dir.snapshot(&SelectionCriterion::AllPlayers, &engine, single_server).await;
        assert_eq!(recipients(&players), vec![Recipient::Player(a), Recipient::Player(b)]);

        let console = dir.snapshot(&SelectionCriterion::ConsoleOnly, &engine, single_server).await;
        assert_eq!(recipients(&console), vec![Recipient::Console]);

        let single = dir.snapshot(&SelectionCriterion::Single(b), &engine, single_server).await;
        assert_eq!(recipients(&single), vec![Recipient::Player(b)]);

        let unknown = SelectionCriterion::Single(ViewerId::new());
        let missing = dir.snapshot(&unknown, &engine, single_server).await;
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_apply_events() {
        let dir = directory();
        let id = ViewerId::new();
        let world = WorldId::new();

        assert!(dir.apply(DirectoryEvent::Join(viewer(id))).await);
        assert!(
            dir.apply(DirectoryEvent::PermissionChanged {
                id,
                key: "vip".into(),
                value: Some(true),
            })
            .await
        );
        assert!(dir.apply(DirectoryEvent::WorldChanged { id, world: Some(world) }).await);
        assert!(
            dir.apply(DirectoryEvent::ServerChanged {
                id,
                server: Some("lobby".into()),
            })
            .await
        );

        let stored = dir.get(id).await.expect("registered");
        assert_eq!(stored.permission("vip"), Some(true));
        assert_eq!(stored.world, Some(world));
        assert_eq!(stored.server.as_deref(), Some("lobby"));

        assert!(
            dir.apply(DirectoryEvent::PermissionChanged {
                id,
                key: "vip".into(),
                value: None,
            })
            .await
        );
        assert!(dir.apply(DirectoryEvent::OnlineChanged { id, online: false }).await);
        let stored = dir.get(id).await.expect("registered");
        assert_eq!(stored.permission("vip"), None);
        assert!(!stored.online);

        assert!(dir.apply(DirectoryEvent::Leave(id)).await);
        assert!(!dir.apply(DirectoryEvent::WorldChanged { id, world: None }).await);
        assert!(!dir.apply(DirectoryEvent::Leave(id)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_is_consistent() {
        let dir = Arc::new(directory());
        let ids: Vec<ViewerId> = (0..64).map(|_| ViewerId::new()).collect();

        let mut handles = Vec::new();
        for id in ids.clone() {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                dir.register(viewer(id)).await;
                dir.update_attributes(id, |v| {
                    v.permissions.insert("joined".into(), true);
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.expect("task completed");
        }

        assert_eq!(dir.len().await, ids.len());
        let engine = PredicateEngine::default();
        let joined = SelectionCriterion::Permission("joined".into());
        let members = dir.snapshot(&joined, &engine, Topology::SingleServer).await;
        // console plus every player
        assert_eq!(members.len(), ids.len() + 1);

        let mut handles = Vec::new();
        for id in ids {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move { dir.unregister(id).await }));
        }
        for handle in handles {
            assert!(handle.await.expect("task completed"));
        }
        assert!(dir.is_empty().await);
    }
}
