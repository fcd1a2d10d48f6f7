//! Namespaced keys (`namespace:value`), accepted as permission names.

use crate::error::AudienceError;
use serde::{Deserialize, Serialize};

/// Namespace used when a key is parsed without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// A namespaced identifier such as `myplugin:chat.broadcast`.
///
/// Namespaces may contain `[a-z0-9_.-]`; values may additionally contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    namespace: String,
    value: String,
}

impl Key {
    /// Builds a key from its parts, validating both.
    pub fn new(
        namespace: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, AudienceError> {
        let namespace = namespace.into();
        let value = value.into();

        if namespace.is_empty() || !namespace.chars().all(is_namespace_char) {
            return Err(AudienceError::invalid_criterion(format!(
                "invalid key namespace '{namespace}'"
            )));
        }
        if value.is_empty() || !value.chars().all(|c| is_namespace_char(c) || c == '/') {
            return Err(AudienceError::invalid_criterion(format!(
                "invalid key value '{value}'"
            )));
        }

        Ok(Self { namespace, value })
    }

    /// Parses `namespace:value`, or a bare `value` in the default namespace.
    pub fn parse(input: &str) -> Result<Self, AudienceError> {
        match input.split_once(':') {
            Some((namespace, value)) => Self::new(namespace, value),
            None => Self::new(DEFAULT_NAMESPACE, input),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The canonical `namespace:value` form.
    pub fn as_string(&self) -> String {
        format!("{}:{}", self.namespace, self.value)
    }
}

fn is_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.value)
    }
}

impl std::str::FromStr for Key {
    type Err = AudienceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = AudienceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.as_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced_key() {
        let key = Key::parse("myplugin:chat.broadcast").expect("valid key");
        assert_eq!(key.namespace(), "myplugin");
        assert_eq!(key.value(), "chat.broadcast");
        assert_eq!(key.as_string(), "myplugin:chat.broadcast");
    }

    #[test]
    fn test_bare_value_uses_default_namespace() {
        let key: Key = "admin/notify".parse().expect("valid key");
        assert_eq!(key.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(key.to_string(), "minecraft:admin/notify");
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(Key::parse("").is_err());
        assert!(Key::parse("Upper:case").is_err());
        assert!(Key::parse("ns:").is_err());
        assert!(Key::parse(":value").is_err());
        assert!(Key::parse("ns/slash:value").is_err());
        assert!(Key::parse("ns:has space").is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let key = Key::parse("myplugin:vip").expect("valid key");
        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, "\"myplugin:vip\"");
        let back: Key = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, key);
        assert!(serde_json::from_str::<Key>("\"Bad Key\"").is_err());
    }
}
