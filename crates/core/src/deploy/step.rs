//! The built-in deployment steps.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::catalog::{CatalogEntry, CatalogSection};
use super::context::GroupContext;
use super::filter::ExcludePattern;
use super::kind::StepKind;
use super::outcome::StepOutcome;
use super::permissions::ModulePermission;
use super::services::DeployServices;
use super::version::ServerVersion;
use crate::content::{PrefixedSource, SyncError, SyncReport};
use crate::error::DeployError;
use crate::tracker::Namespace;
use crate::transport::{ResourceDescriptor, ResourceKind, Transport};

const FORESTS_PER_HOST: &str = "forests-per-host";

/// One idempotent unit of configuration.
///
/// Steps are plain values: a pipeline is an ordered list of them and its
/// dependency order can be checked before anything runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStep {
    Privileges,
    Roles {
        exclude: Option<ExcludePattern>,
    },
    Amps,
    Databases,
    Servers {
        version: ServerVersion,
    },
    DatabaseFields,
    Triggers {
        section: CatalogSection,
        database: String,
    },
    LoadModules {
        namespace: Namespace,
    },
    QueryOptions {
        app_server: String,
    },
    ModulePermissions {
        permissions: Vec<ModulePermission>,
    },
    /// Derived metadata for uploaded mapping functions.
    FunctionMetadata,
    /// Per-database privileges, generated once the databases exist.
    GranularPrivileges,
}

impl DeploymentStep {
    pub fn name(&self) -> String {
        match self {
            Self::Privileges => "privileges".to_string(),
            Self::Roles { .. } => "roles".to_string(),
            Self::Amps => "amps".to_string(),
            Self::Databases => "databases".to_string(),
            Self::Servers { .. } => "servers".to_string(),
            Self::DatabaseFields => "database-fields".to_string(),
            Self::Triggers {
                section: CatalogSection::HubTriggers,
                ..
            } => "hub-triggers".to_string(),
            Self::Triggers { .. } => "triggers".to_string(),
            Self::LoadModules { namespace } => format!("load-{}", namespace),
            Self::QueryOptions { .. } => "query-options".to_string(),
            Self::ModulePermissions { .. } => "module-permissions".to_string(),
            Self::FunctionMetadata => "function-metadata".to_string(),
            Self::GranularPrivileges => "granular-privileges".to_string(),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Privileges | Self::GranularPrivileges => StepKind::Privileges,
            Self::Roles { .. } => StepKind::Roles,
            Self::Amps => StepKind::Amps,
            Self::Databases => StepKind::Databases,
            Self::Servers { .. } => StepKind::Servers,
            Self::DatabaseFields => StepKind::DatabaseFields,
            Self::Triggers { .. } => StepKind::Triggers,
            Self::LoadModules { .. } => StepKind::Modules,
            Self::QueryOptions { .. } => StepKind::QueryOptions,
            Self::ModulePermissions { .. } => StepKind::PermissionFixups,
            Self::FunctionMetadata => StepKind::DerivedMetadata,
        }
    }

    /// Kinds that must already be deployed when this step runs.
    pub fn requires(&self) -> &'static [StepKind] {
        match self {
            Self::Privileges | Self::Roles { .. } | Self::Databases => &[],
            Self::Amps => &[StepKind::Roles],
            Self::Servers { .. }
            | Self::DatabaseFields
            | Self::LoadModules { .. }
            | Self::GranularPrivileges => &[StepKind::Databases],
            Self::Triggers { .. } => &[StepKind::Databases, StepKind::Servers],
            Self::QueryOptions { .. } => &[StepKind::Servers],
            Self::ModulePermissions { .. } => &[StepKind::Modules, StepKind::Roles],
            Self::FunctionMetadata => &[StepKind::Modules, StepKind::PermissionFixups],
        }
    }

    /// Derived steps are generated from what is already deployed and may
    /// run after any other kind.
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::GranularPrivileges)
    }

    pub async fn apply(&self, ctx: &GroupContext, services: &DeployServices) -> StepOutcome {
        match self {
            Self::LoadModules { namespace } => {
                let Some(source) = services.module_sources.get(namespace) else {
                    return StepOutcome::skipped(format!("no source for {}", namespace));
                };
                sync_outcome(services.synchronizer.sync(namespace, source.as_ref()).await)
            }
            Self::QueryOptions { app_server } => {
                let Some(options) = &services.query_options else {
                    return StepOutcome::skipped("no query options configured");
                };
                let namespace = Namespace::query_options(&ctx.group_name);
                let source = PrefixedSource::new(
                    Arc::clone(options),
                    &format!("{}/{}/rest-api/options", ctx.group_name, app_server),
                );
                sync_outcome(services.synchronizer.sync(&namespace, &source).await)
            }
            Self::ModulePermissions { permissions } => {
                if permissions.is_empty() {
                    return StepOutcome::skipped("no module permissions configured");
                }
                let descriptors = services
                    .module_sources
                    .keys()
                    .map(|ns| {
                        ResourceDescriptor::new(
                            ResourceKind::ModulePermissions,
                            ns.as_str(),
                            json!({ "permissions": permissions }),
                        )
                    })
                    .collect();
                configure_all(services.transport.as_ref(), descriptors).await
            }
            Self::FunctionMetadata => match mapping_function_descriptors(services).await {
                Ok(descriptors) => configure_all(services.transport.as_ref(), descriptors).await,
                Err(error) => StepOutcome::Failed { error },
            },
            _ => {
                let descriptors = self.catalog_descriptors(ctx, services);
                configure_all(services.transport.as_ref(), descriptors).await
            }
        }
    }

    /// Undoes the step. Module steps clear their namespace; derived steps
    /// have nothing of their own to remove.
    pub async fn retract(&self, ctx: &GroupContext, services: &DeployServices) -> StepOutcome {
        match self {
            Self::LoadModules { namespace } => {
                clear_outcome(services, namespace).await
            }
            Self::QueryOptions { .. } => {
                clear_outcome(services, &Namespace::query_options(&ctx.group_name)).await
            }
            Self::ModulePermissions { .. } | Self::FunctionMetadata => {
                StepOutcome::skipped("nothing to retract")
            }
            _ => {
                let mut descriptors = self.catalog_descriptors(ctx, services);
                descriptors.reverse();
                retract_all(services.transport.as_ref(), descriptors).await
            }
        }
    }

    /// Descriptors for the catalog-driven steps, in send order.
    fn catalog_descriptors(
        &self,
        ctx: &GroupContext,
        services: &DeployServices,
    ) -> Vec<ResourceDescriptor> {
        let catalog = &services.catalog;
        match self {
            Self::Privileges => simple(catalog.entries(CatalogSection::Privileges), ResourceKind::Privilege),
            Self::Amps => simple(catalog.entries(CatalogSection::Amps), ResourceKind::Amp),
            Self::Roles { exclude } => catalog
                .entries(CatalogSection::Roles)
                .iter()
                .filter(|entry| match exclude {
                    Some(pattern) if pattern.excludes(&entry.file_name, &entry.id) => {
                        info!(role = %entry.id, file = %entry.file_name, "Excluding role");
                        false
                    }
                    _ => true,
                })
                .map(|entry| {
                    ResourceDescriptor::new(ResourceKind::Role, &entry.id, entry.payload.clone())
                })
                .collect(),
            Self::Databases => {
                let mut descriptors = Vec::new();
                for entry in catalog.entries(CatalogSection::Databases) {
                    let mut payload = entry.payload.clone();
                    let forests = payload
                        .as_object_mut()
                        .and_then(|o| o.remove(FORESTS_PER_HOST))
                        .and_then(|v| v.as_u64())
                        .unwrap_or(1);
                    descriptors.push(ResourceDescriptor::new(
                        ResourceKind::Database,
                        &entry.id,
                        payload,
                    ));

                    if !ctx.allow_resource_creation {
                        continue;
                    }
                    for i in 1..=forests {
                        let forest = format!("{}-{}", entry.id, i);
                        descriptors.push(ResourceDescriptor::new(
                            ResourceKind::Forest,
                            &forest,
                            json!({ "forest-name": forest, "database": entry.id }),
                        ));
                    }
                }
                descriptors
            }
            Self::Servers { version } => catalog
                .entries(CatalogSection::Servers)
                .iter()
                .map(|entry| {
                    let mut payload = entry.payload.clone();
                    let dropped = version.strip_unsupported_server_fields(&mut payload);
                    if !dropped.is_empty() {
                        debug!(
                            server = %entry.id,
                            version = %version,
                            fields = ?dropped,
                            "Dropped fields unsupported by server version"
                        );
                    }
                    ResourceDescriptor::new(ResourceKind::Server, &entry.id, payload)
                        .in_group(&ctx.group_name)
                })
                .collect(),
            Self::DatabaseFields => catalog
                .entries(CatalogSection::DatabaseFields)
                .iter()
                .map(|entry| {
                    let descriptor = ResourceDescriptor::new(
                        ResourceKind::DatabaseField,
                        &entry.id,
                        entry.payload.clone(),
                    );
                    match entry.payload.get("database-name").and_then(|v| v.as_str()) {
                        Some(database) => descriptor.under(database),
                        None => descriptor,
                    }
                })
                .collect(),
            Self::Triggers { section, database } => catalog
                .entries(*section)
                .iter()
                .map(|entry| {
                    ResourceDescriptor::new(ResourceKind::Trigger, &entry.id, entry.payload.clone())
                        .under(database)
                })
                .collect(),
            Self::GranularPrivileges => catalog
                .entries(CatalogSection::Databases)
                .iter()
                .map(|entry| {
                    let name = format!("clear-{}", entry.id);
                    ResourceDescriptor::new(
                        ResourceKind::Privilege,
                        &name,
                        json!({
                            "privilege-name": name,
                            "action": format!("admin/database/clear/{}", entry.id),
                            "kind": "execute",
                        }),
                    )
                })
                .collect(),
            Self::LoadModules { .. }
            | Self::QueryOptions { .. }
            | Self::ModulePermissions { .. }
            | Self::FunctionMetadata => Vec::new(),
        }
    }
}

fn simple(entries: &[CatalogEntry], kind: ResourceKind) -> Vec<ResourceDescriptor> {
    entries
        .iter()
        .map(|entry| ResourceDescriptor::new(kind, &entry.id, entry.payload.clone()))
        .collect()
}

fn is_mapping_function(key: &str) -> bool {
    key.contains("/mapping-functions/")
        && [".sjs", ".mjs", ".xqy"].iter().any(|ext| key.ends_with(ext))
}

async fn mapping_function_descriptors(
    services: &DeployServices,
) -> Result<Vec<ResourceDescriptor>, DeployError> {
    let mut descriptors = Vec::new();
    for (namespace, source) in &services.module_sources {
        let entries = source.list().await.map_err(|error| SyncError::Source {
            namespace: namespace.to_string(),
            source_name: source.describe(),
            error,
        })?;
        descriptors.extend(entries.into_iter().filter(|e| is_mapping_function(&e.key)).map(
            |entry| {
                ResourceDescriptor::new(
                    ResourceKind::FunctionMetadata,
                    &entry.key,
                    json!({ "namespace": namespace, "module": entry.key }),
                )
            },
        ));
    }
    Ok(descriptors)
}

async fn configure_all(
    transport: &dyn Transport,
    descriptors: Vec<ResourceDescriptor>,
) -> StepOutcome {
    if descriptors.is_empty() {
        return StepOutcome::skipped("nothing to deploy");
    }
    for descriptor in &descriptors {
        debug!(resource = %descriptor.label(), "Configuring");
        if let Err(e) = transport.configure(descriptor).await {
            return StepOutcome::Failed { error: e.into() };
        }
    }
    StepOutcome::Applied {
        changes: descriptors.len(),
    }
}

async fn retract_all(
    transport: &dyn Transport,
    descriptors: Vec<ResourceDescriptor>,
) -> StepOutcome {
    if descriptors.is_empty() {
        return StepOutcome::skipped("nothing to retract");
    }
    for descriptor in &descriptors {
        debug!(resource = %descriptor.label(), "Retracting");
        if let Err(e) = transport.retract(descriptor).await {
            return StepOutcome::Failed { error: e.into() };
        }
    }
    StepOutcome::Applied {
        changes: descriptors.len(),
    }
}

fn sync_outcome(result: Result<SyncReport, SyncError>) -> StepOutcome {
    let report = match result {
        Ok(report) => report,
        Err(e) => return StepOutcome::Failed { error: e.into() },
    };
    if report.failed.is_empty() {
        return StepOutcome::Applied {
            changes: report.uploaded.len(),
        };
    }

    let keys: Vec<&str> = report.failed.iter().map(|f| f.key.as_str()).collect();
    StepOutcome::Failed {
        error: DeployError::ArtifactUploadFailed {
            namespace: report.namespace.to_string(),
            message: format!(
                "{} of {} artifacts failed: {}",
                report.failed.len(),
                report.total(),
                keys.join(", ")
            ),
        },
    }
}

async fn clear_outcome(services: &DeployServices, namespace: &Namespace) -> StepOutcome {
    match services.synchronizer.clear_namespace(namespace).await {
        Ok(report) => StepOutcome::Applied {
            changes: report.deleted,
        },
        Err(e) => StepOutcome::Failed { error: e.into() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_kinds() {
        let hub = DeploymentStep::Triggers {
            section: CatalogSection::HubTriggers,
            database: "staging".into(),
        };
        assert_eq!(hub.name(), "hub-triggers");
        assert_eq!(hub.kind(), StepKind::Triggers);

        let modules = DeploymentStep::LoadModules {
            namespace: Namespace::user_modules(),
        };
        assert_eq!(modules.name(), "load-user-modules");
        assert_eq!(modules.kind(), StepKind::Modules);
        assert_eq!(DeploymentStep::GranularPrivileges.kind(), StepKind::Privileges);
    }

    #[test]
    fn test_requirements_follow_dependency_order() {
        assert!(DeploymentStep::Privileges.requires().is_empty());
        assert_eq!(DeploymentStep::Amps.requires(), &[StepKind::Roles]);
        assert_eq!(
            DeploymentStep::FunctionMetadata.requires(),
            &[StepKind::Modules, StepKind::PermissionFixups]
        );
        let triggers = DeploymentStep::Triggers {
            section: CatalogSection::UserTriggers,
            database: "t".into(),
        };
        assert_eq!(triggers.requires(), &[StepKind::Databases, StepKind::Servers]);
        assert!(DeploymentStep::GranularPrivileges.is_derived());
        assert!(!DeploymentStep::Privileges.is_derived());
    }

    #[test]
    fn test_mapping_function_detection() {
        assert!(is_mapping_function("/custom-modules/mapping-functions/trim.sjs"));
        assert!(is_mapping_function("/custom-modules/mapping-functions/util.xqy"));
        assert!(!is_mapping_function("/custom-modules/mapping-functions/readme.md"));
        assert!(!is_mapping_function("/custom-modules/ingestion/step.sjs"));
    }
}
