use serde::Serialize;

use crate::config::ConnectionProfile;

/// Scope of one pipeline run: which server group the steps target and
/// whether they may allocate physical storage.
///
/// A context is built once per run and never changes during it. The next
/// group gets a new value from [`for_group`](Self::for_group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupContext {
    pub group_name: String,
    pub allow_resource_creation: bool,
    pub profile: ConnectionProfile,
}

impl GroupContext {
    pub fn new(
        group_name: impl Into<String>,
        allow_resource_creation: bool,
        profile: ConnectionProfile,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            allow_resource_creation,
            profile,
        }
    }

    /// Same settings, targeting another group.
    pub fn for_group(&self, group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            ..self.clone()
        }
    }
}
