use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kind a deployment step is responsible for.
///
/// Declaration order is the dependency order of a full install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Privileges,
    Roles,
    Amps,
    Databases,
    Servers,
    DatabaseFields,
    Triggers,
    Modules,
    QueryOptions,
    PermissionFixups,
    DerivedMetadata,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Privileges => "privileges",
            Self::Roles => "roles",
            Self::Amps => "amps",
            Self::Databases => "databases",
            Self::Servers => "servers",
            Self::DatabaseFields => "database-fields",
            Self::Triggers => "triggers",
            Self::Modules => "modules",
            Self::QueryOptions => "query-options",
            Self::PermissionFixups => "permission-fixups",
            Self::DerivedMetadata => "derived-metadata",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
