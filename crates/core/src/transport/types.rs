//! Types for the transport module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of remote resource a descriptor addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Privilege,
    Role,
    Amp,
    Database,
    /// Physical storage partition of a database.
    Forest,
    Server,
    DatabaseField,
    Trigger,
    ModulePermissions,
    FunctionMetadata,
}

impl ResourceKind {
    /// REST collection the kind lives under.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Privilege => "privileges",
            Self::Role => "roles",
            Self::Amp => "amps",
            Self::Database => "databases",
            Self::Forest => "forests",
            Self::Server => "servers",
            Self::DatabaseField => "database-fields",
            Self::Trigger => "triggers",
            Self::ModulePermissions => "module-permissions",
            Self::FunctionMetadata => "function-metadata",
        }
    }

    /// True for calls that allocate physical storage.
    pub fn is_storage_allocation(&self) -> bool {
        matches!(self, Self::Forest)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// One logical configuration change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub id: String,
    /// Server group the resource is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Owning resource, e.g. the database of a trigger or field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub payload: serde_json::Value,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            id: id.into(),
            group: None,
            parent: None,
            payload,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// `kind/id` label used in logs and errors.
    pub fn label(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}/{}/{}", self.kind, parent, self.id),
            None => format!("{}/{}", self.kind, self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_forests_allocate_storage() {
        assert!(ResourceKind::Forest.is_storage_allocation());
        assert!(!ResourceKind::Database.is_storage_allocation());
        assert!(!ResourceKind::Server.is_storage_allocation());
    }

    #[test]
    fn test_label() {
        let trigger = ResourceDescriptor::new(ResourceKind::Trigger, "on-ingest", json!({}))
            .under("data-hub-staging-TRIGGERS");
        assert_eq!(trigger.label(), "triggers/data-hub-staging-TRIGGERS/on-ingest");

        let role = ResourceDescriptor::new(ResourceKind::Role, "hub-reader", json!({}));
        assert_eq!(role.label(), "roles/hub-reader");
    }
}
