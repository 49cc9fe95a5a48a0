//! The fixed step lists of an install.
//!
//! Only steps listed here ever run. Order is dependency order.

use super::types::OrchestratorError;
use crate::config::{keys, EnvironmentProperties, InstallSettings};
use crate::deploy::{CatalogSection, DeploymentStep, ExcludePattern, ModulePermission, ServerVersion};
use crate::tracker::Namespace;

fn server_version(settings: &InstallSettings) -> Result<ServerVersion, OrchestratorError> {
    settings
        .server_version
        .parse()
        .map_err(|e: crate::deploy::VersionError| OrchestratorError::Settings(e.to_string()))
}

fn role_exclusion(
    settings: &InstallSettings,
    props: &EnvironmentProperties,
) -> Result<Option<ExcludePattern>, OrchestratorError> {
    let pattern = match &settings.exclude_roles {
        Some(pattern) => ExcludePattern::new(pattern),
        None if props.get_bool(keys::PROVISIONED) => {
            let managed: Vec<&str> = [keys::FLOW_DEVELOPER_ROLE, keys::FLOW_OPERATOR_ROLE]
                .iter()
                .filter_map(|key| props.get(key))
                .filter(|name| !name.trim().is_empty())
                .collect();
            ExcludePattern::provisioned_roles(&managed)
        }
        None => return Ok(None),
    };
    pattern
        .map(Some)
        .map_err(|e| OrchestratorError::Settings(format!("role exclusion pattern: {}", e)))
}

/// Steps for the application-resources context.
pub fn evaluator_steps(
    settings: &InstallSettings,
    props: &EnvironmentProperties,
) -> Result<Vec<DeploymentStep>, OrchestratorError> {
    let permissions = ModulePermission::parse_list(props.get(keys::MODULE_PERMISSIONS).unwrap_or(""))
        .map_err(OrchestratorError::Settings)?;

    Ok(vec![
        DeploymentStep::Privileges,
        DeploymentStep::Roles {
            exclude: role_exclusion(settings, props)?,
        },
        DeploymentStep::Amps,
        DeploymentStep::Databases,
        DeploymentStep::Servers {
            version: server_version(settings)?,
        },
        DeploymentStep::DatabaseFields,
        DeploymentStep::Triggers {
            section: CatalogSection::UserTriggers,
            database: settings.final_triggers_database.clone(),
        },
        DeploymentStep::Triggers {
            section: CatalogSection::HubTriggers,
            database: settings.staging_triggers_database.clone(),
        },
        DeploymentStep::LoadModules {
            namespace: Namespace::hub_modules(),
        },
        DeploymentStep::LoadModules {
            namespace: Namespace::hub_artifacts(),
        },
        DeploymentStep::LoadModules {
            namespace: Namespace::user_modules(),
        },
        DeploymentStep::QueryOptions {
            app_server: settings.app_server.clone(),
        },
        DeploymentStep::ModulePermissions { permissions },
        DeploymentStep::FunctionMetadata,
        DeploymentStep::GranularPrivileges,
    ])
}

/// Steps for the topology context: servers only.
pub fn curator_steps(settings: &InstallSettings) -> Result<Vec<DeploymentStep>, OrchestratorError> {
    Ok(vec![DeploymentStep::Servers {
        version: server_version(settings)?,
    }])
}
