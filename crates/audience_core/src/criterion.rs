//! Selection criteria: the immutable membership rule of an audience.

use crate::error::AudienceError;
use crate::types::{ViewerId, WorldId};
use serde::{Deserialize, Serialize};

/// How an audience selects its members.
///
/// Criteria are structurally compared, so `Permission("chat.say")` built
/// twice is the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SelectionCriterion {
    /// Every online player plus the console
    All,
    /// Only the console
    ConsoleOnly,
    /// Every online player, without the console
    AllPlayers,
    /// A single player, whether or not currently connected
    Single(ViewerId),
    /// Players holding a permission, plus the console
    Permission(String),
    /// Players located in a world, plus the console
    World(WorldId),
    /// Players on a backend server, plus the console
    Server(String),
}

impl SelectionCriterion {
    /// Builds a permission criterion, rejecting blank keys.
    pub fn permission(key: impl Into<String>) -> Result<Self, AudienceError> {
        let criterion = Self::Permission(key.into());
        criterion.validate()?;
        Ok(criterion)
    }

    /// Builds a server criterion, rejecting blank names.
    pub fn server(name: impl Into<String>) -> Result<Self, AudienceError> {
        let criterion = Self::Server(name.into());
        criterion.validate()?;
        Ok(criterion)
    }

    /// Checks the payload of string-keyed criteria.
    pub fn validate(&self) -> Result<(), AudienceError> {
        match self {
            SelectionCriterion::Permission(key) => {
                if key.trim().is_empty() {
                    return Err(AudienceError::invalid_criterion(
                        "permission key must not be empty",
                    ));
                }
                if key.chars().any(char::is_whitespace) {
                    return Err(AudienceError::invalid_criterion(format!(
                        "permission key '{key}' contains whitespace"
                    )));
                }
                Ok(())
            }
            SelectionCriterion::Server(name) if name.trim().is_empty() => {
                Err(AudienceError::invalid_criterion("server name must not be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Whether the console pseudo-viewer receives dispatches to this criterion.
    ///
    /// World and server audiences include the console for operator
    /// visibility even though the console matches neither predicate.
    pub fn includes_console(&self) -> bool {
        match self {
            SelectionCriterion::All
            | SelectionCriterion::ConsoleOnly
            | SelectionCriterion::Permission(_)
            | SelectionCriterion::World(_)
            | SelectionCriterion::Server(_) => true,
            SelectionCriterion::AllPlayers | SelectionCriterion::Single(_) => false,
        }
    }
}

impl std::fmt::Display for SelectionCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionCriterion::All => write!(f, "everyone"),
            SelectionCriterion::ConsoleOnly => write!(f, "console"),
            SelectionCriterion::AllPlayers => write!(f, "players"),
            SelectionCriterion::Single(id) => write!(f, "player({id})"),
            SelectionCriterion::Permission(key) => write!(f, "permission({key})"),
            SelectionCriterion::World(id) => write!(f, "world({id})"),
            SelectionCriterion::Server(name) => write!(f, "server({name})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality_and_hashing() {
        let a = SelectionCriterion::permission("chat.say").expect("valid");
        let b = SelectionCriterion::permission("chat.say".to_string()).expect("valid");
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b, SelectionCriterion::All].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_blank_input_is_rejected() {
        assert!(matches!(
            SelectionCriterion::permission(""),
            Err(AudienceError::InvalidCriterion { .. })
        ));
        assert!(SelectionCriterion::permission("   ").is_err());
        assert!(SelectionCriterion::permission("chat say").is_err());
        assert!(SelectionCriterion::server("").is_err());
        assert!(SelectionCriterion::server("lobby").is_ok());
        assert!(SelectionCriterion::Permission(String::new()).validate().is_err());
        assert!(SelectionCriterion::All.validate().is_ok());
    }

    #[test]
    fn test_console_inclusion_table() {
        assert!(SelectionCriterion::All.includes_console());
        assert!(SelectionCriterion::ConsoleOnly.includes_console());
        assert!(!SelectionCriterion::AllPlayers.includes_console());
        assert!(!SelectionCriterion::Single(ViewerId::new()).includes_console());
        assert!(SelectionCriterion::Permission("p".into()).includes_console());
        assert!(SelectionCriterion::World(WorldId::new()).includes_console());
        assert!(SelectionCriterion::Server("s".into()).includes_console());
    }
}
