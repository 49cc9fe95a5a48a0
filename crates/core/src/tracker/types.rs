use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::backend::TrackerError;

/// Logical partition of artifact keys and change records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub const HUB_MODULES: &'static str = "hub-modules";
    pub const HUB_ARTIFACTS: &'static str = "hub-artifacts";
    pub const USER_MODULES: &'static str = "user-modules";

    /// Creates a namespace. Names double as file names for some backends, so
    /// only `[a-z0-9._-]` is accepted and the name may not start with a dot.
    pub fn new(name: impl Into<String>) -> Result<Self, TrackerError> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(name))
        } else {
            Err(TrackerError::InvalidNamespace(name))
        }
    }

    pub fn hub_modules() -> Self {
        Self(Self::HUB_MODULES.to_string())
    }

    pub fn hub_artifacts() -> Self {
        Self(Self::HUB_ARTIFACTS.to_string())
    }

    pub fn user_modules() -> Self {
        Self(Self::USER_MODULES.to_string())
    }

    /// Namespace for the query options copied into a server group. Group
    /// names are slugged, so names differing only in case or punctuation
    /// share a namespace.
    pub fn query_options(group: &str) -> Self {
        let slug: String = group
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        Self(format!("query-options-{}", slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.0
    }
}

impl std::str::FromStr for Namespace {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Last confirmed upload of one artifact key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub key: String,
    pub last_synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_namespaces() {
        assert_eq!(Namespace::hub_modules().as_str(), "hub-modules");
        assert_eq!(Namespace::user_modules().as_str(), "user-modules");
        assert_eq!(Namespace::hub_artifacts().as_str(), "hub-artifacts");
    }

    #[test]
    fn test_query_options_namespace_is_slugged() {
        assert_eq!(
            Namespace::query_options("Evaluator").as_str(),
            "query-options-evaluator"
        );
        assert_eq!(
            Namespace::query_options("My Group").as_str(),
            "query-options-my-group"
        );
        assert_eq!(
            Namespace::query_options("a b"),
            Namespace::query_options("a-b")
        );
    }

    #[test]
    fn test_invalid_namespaces_rejected() {
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("../escape").is_err());
        assert!(Namespace::new(".hidden").is_err());
        assert!(Namespace::new("Upper").is_err());
        assert!(Namespace::new("user-modules").is_ok());
    }

    #[test]
    fn test_namespace_serde() {
        let ns: Namespace = serde_json::from_str("\"hub-modules\"").unwrap();
        assert_eq!(ns, Namespace::hub_modules());
        assert!(serde_json::from_str::<Namespace>("\"a/b\"").is_err());
    }
}
