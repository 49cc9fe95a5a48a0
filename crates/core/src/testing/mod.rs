//! Test doubles for the install's external collaborators.
//!
//! Public so integration tests can assemble a full orchestrator without a
//! remote environment.
//!
//! # Example
//!
//! ```rust,ignore
//! use hubdeploy_core::testing::{MemoryArtifactSource, MockContentStore, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.fail_resource(ResourceKind::Role, "hub-admin").await;
//!
//! // run an install ...
//!
//! let calls = transport.recorded_calls().await;
//! assert!(calls.iter().all(|c| !c.descriptor.kind.is_storage_allocation()));
//! ```

mod memory_source;
mod mock_content_store;
mod mock_transport;

pub use memory_source::MemoryArtifactSource;
pub use mock_content_store::{MockContentStore, RecordedPut};
pub use mock_transport::{CallKind, MockTransport, RecordedCall};

/// Fixtures shared by tests.
pub mod fixtures {
    use serde_json::json;

    use crate::config::{ConnectionConfig, ConnectionProfile, EnvironmentProperties};
    use crate::deploy::{CatalogSection, GroupContext, ResourceCatalog};

    pub fn connection() -> ConnectionConfig {
        ConnectionConfig {
            host: "localhost".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            manage_port: 8002,
            app_services_port: 8000,
            timeout_secs: 10,
        }
    }

    /// Context for a group on a local, self-managed environment.
    pub fn group_context(group: &str, allow_resource_creation: bool) -> GroupContext {
        let profile =
            ConnectionProfile::from_properties(&connection(), &EnvironmentProperties::standard());
        GroupContext::new(group, allow_resource_creation, profile)
    }

    /// A small but complete hub configuration.
    pub fn hub_catalog() -> ResourceCatalog {
        ResourceCatalog::new()
            .with(
                CatalogSection::Privileges,
                "hub-privilege.json",
                json!({"privilege-name": "hub-run-flow", "kind": "execute"}),
            )
            .with(
                CatalogSection::Roles,
                "data-hub-admin-role.json",
                json!({"role-name": "data-hub-admin"}),
            )
            .with(
                CatalogSection::Roles,
                "data-hub-operator.json",
                json!({"role-name": "data-hub-operator"}),
            )
            .with(
                CatalogSection::Roles,
                "flow-developer-role.json",
                json!({"role-name": "flow-developer"}),
            )
            .with(
                CatalogSection::Amps,
                "amp.json",
                json!({"local-name": "run-flow", "namespace": "http://hub/flow"}),
            )
            .with(
                CatalogSection::Databases,
                "final-database.json",
                json!({"database-name": "data-hub-FINAL", "forests-per-host": 2}),
            )
            .with(
                CatalogSection::Databases,
                "staging-database.json",
                json!({"database-name": "data-hub-STAGING"}),
            )
            .with(
                CatalogSection::Servers,
                "final-server.json",
                json!({
                    "server-name": "data-hub-FINAL",
                    "port": 8011,
                    "ssl-disable-tlsv1-3": true
                }),
            )
            .with(
                CatalogSection::DatabaseFields,
                "datahub-fields.json",
                json!({"database-name": "data-hub-FINAL", "field-name": "datahubCreatedOn"}),
            )
            .with(
                CatalogSection::UserTriggers,
                "on-ingest.json",
                json!({"name": "on-ingest"}),
            )
            .with(
                CatalogSection::HubTriggers,
                "entity-model.json",
                json!({"name": "ml-dh-entity-create"}),
            )
    }
}
