//! Membership predicate evaluation.
//!
//! [`PredicateEngine::matches`] is a pure function of the criterion, the
//! subject's attributes and the current [`Topology`]. Unknown or missing
//! attributes resolve to a non-match; nothing here can fail.

use crate::criterion::SelectionCriterion;
use crate::types::Viewer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Deployment shape the platform runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// One game server; `server(name)` selects everyone
    #[default]
    SingleServer,
    /// A proxy in front of several backend servers
    Proxy,
}

/// Permission-check backend.
///
/// Queried synchronously while a dispatch computes its recipients, so
/// implementations should answer from memory.
pub trait PermissionBackend: Send + Sync {
    fn check(&self, viewer: &Viewer, key: &str) -> bool;
}

/// Resolves permissions from the viewer's own override map.
///
/// An absent key is `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributePermissions;

impl PermissionBackend for AttributePermissions {
    fn check(&self, viewer: &Viewer, key: &str) -> bool {
        viewer.permission(key).unwrap_or(false)
    }
}

/// What a criterion is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// The console pseudo-viewer
    Console,
    Player(&'a Viewer),
}

/// Evaluates selection criteria against viewers.
#[derive(Clone)]
pub struct PredicateEngine {
    permissions: Arc<dyn PermissionBackend>,
}

impl PredicateEngine {
    pub fn new(permissions: Arc<dyn PermissionBackend>) -> Self {
        Self { permissions }
    }

    /// Returns true if `subject` satisfies `criterion`.
    ///
    /// The console is not located in a world or on a backend server, so it
    /// never matches `World` or `Server`; it holds every permission. Whether a
    /// dispatch reaches the console is decided separately by
    /// [`SelectionCriterion::includes_console`].
    pub fn matches(
        &self,
        criterion: &SelectionCriterion,
        subject: Subject<'_>,
        topology: Topology,
    ) -> bool {
        let viewer = match subject {
            Subject::Console => {
                return matches!(
                    criterion,
                    SelectionCriterion::All
                        | SelectionCriterion::ConsoleOnly
                        | SelectionCriterion::Permission(_)
                )
            }
            Subject::Player(viewer) => viewer,
        };

        if !viewer.online {
            return false;
        }

        match criterion {
            SelectionCriterion::All | SelectionCriterion::AllPlayers => true,
            SelectionCriterion::ConsoleOnly => false,
            SelectionCriterion::Single(id) => viewer.id == *id,
            SelectionCriterion::Permission(key) => self.permissions.check(viewer, key),
            SelectionCriterion::World(world) => viewer.world.as_ref() == Some(world),
            SelectionCriterion::Server(name) => match topology {
                Topology::SingleServer => true,
                Topology::Proxy => viewer.server.as_deref() == Some(name.as_str()),
            },
        }
    }
}

impl Default for PredicateEngine {
    fn default() -> Self {
        Self::new(Arc::new(AttributePermissions))
    }
}

impl std::fmt::Debug for PredicateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TracingConsole;
    use crate::types::{ViewerId, WorldId};

    fn viewer() -> Viewer {
        Viewer::new(ViewerId::new(), Arc::new(TracingConsole::new()))
    }

    fn permission(key: &str) -> SelectionCriterion {
        SelectionCriterion::Permission(key.into())
    }

    #[test]
    fn test_console_subject() {
        let engine = PredicateEngine::default();
        let single = Topology::SingleServer;
        let console = |criterion: &SelectionCriterion, topology| {
            engine.matches(criterion, Subject::Console, topology)
        };

        assert!(console(&SelectionCriterion::All, single));
        assert!(console(&SelectionCriterion::ConsoleOnly, single));
        assert!(!console(&SelectionCriterion::AllPlayers, single));
        assert!(!console(&SelectionCriterion::Single(ViewerId::new()), single));
        assert!(console(&permission("any.thing"), single));

        // not located anywhere, even where server(..) selects everyone
        assert!(!console(&SelectionCriterion::World(WorldId::new()), Topology::Proxy));
        assert!(!console(&SelectionCriterion::Server("lobby".into()), single));
        assert!(!console(&SelectionCriterion::Server("lobby".into()), Topology::Proxy));
    }

    #[test]
    fn test_player_attributes() {
        let engine = PredicateEngine::default();
        let world = WorldId::new();
        let player = viewer()
            .with_permission("vip", true)
            .with_permission("mod", false)
            .with_world(world);
        let subject = Subject::Player(&player);
        let topology = Topology::SingleServer;
        let check = |criterion: &SelectionCriterion| engine.matches(criterion, subject, topology);

        assert!(check(&SelectionCriterion::All));
        assert!(check(&SelectionCriterion::AllPlayers));
        assert!(!check(&SelectionCriterion::ConsoleOnly));
        assert!(check(&SelectionCriterion::Single(player.id)));
        assert!(!check(&SelectionCriterion::Single(ViewerId::new())));
        assert!(check(&permission("vip")));
        assert!(!check(&permission("mod")));
        assert!(!check(&permission("unset")));
        assert!(check(&SelectionCriterion::World(world)));
        assert!(!check(&SelectionCriterion::World(WorldId::new())));
    }

    #[test]
    fn test_server_depends_on_topology() {
        let engine = PredicateEngine::default();
        let on_lobby = viewer().with_server("lobby");
        let nowhere = viewer();
        let lobby = SelectionCriterion::Server("lobby".into());
        let survival = SelectionCriterion::Server("survival".into());

        assert!(engine.matches(&lobby, Subject::Player(&nowhere), Topology::SingleServer));
        assert!(engine.matches(&lobby, Subject::Player(&on_lobby), Topology::Proxy));
        assert!(!engine.matches(&lobby, Subject::Player(&nowhere), Topology::Proxy));
        assert!(!engine.matches(&survival, Subject::Player(&on_lobby), Topology::Proxy));
    }

    #[test]
    fn test_offline_viewer_never_matches() {
        let engine = PredicateEngine::default();
        let offline = viewer().with_online(false).with_permission("vip", true);
        let check = |criterion: &SelectionCriterion| {
            engine.matches(criterion, Subject::Player(&offline), Topology::SingleServer)
        };

        assert!(!check(&SelectionCriterion::All));
        assert!(!check(&SelectionCriterion::Single(offline.id)));
        assert!(!check(&permission("vip")));
    }

    #[test]
    fn test_custom_permission_backend() {
        struct PrefixBackend;
        impl PermissionBackend for PrefixBackend {
            fn check(&self, _viewer: &Viewer, key: &str) -> bool {
                key.starts_with("public.")
            }
        }

        let engine = PredicateEngine::new(Arc::new(PrefixBackend));
        let player = viewer();
        let check = |key: &str| {
            engine.matches(&permission(key), Subject::Player(&player), Topology::SingleServer)
        };

        assert!(check("public.chat"));
        assert!(!check("admin.ban"));
    }
}
