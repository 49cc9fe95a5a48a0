mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hubdeploy_core::{
    content::FsArtifactSource, load_config, validate_config, ContentSynchronizer, Credentials,
    DeployServices, EnvironmentConfig, FileTrackerBackend, HttpContentStore, HttpTransport,
    InstallConfig, InstallOrchestrator, Namespace, PersistenceBackend, ResourceCatalog,
    SqliteTrackerBackend, SyncConfig, TrackerBackendKind,
};

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    // Reports go to stdout, so logs stay on stderr.
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

/// Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = %&config_hash[..16],
        host = %config.connection.host,
        provisioned = config.install.provisioned,
        "Configuration loaded"
    );

    let env = EnvironmentConfig::from_config(&config, &cli.property_overrides());
    let orchestrator = InstallOrchestrator::new(build_services(&config, &env)?);

    match cli.command {
        Command::Install => {
            let report = orchestrator.run(&env).await?;
            print_json(&report)?;
            Ok(report.success)
        }
        Command::Uninstall => {
            let report = orchestrator.uninstall(&env).await?;
            print_json(&report)?;
            Ok(report.success)
        }
        Command::ClearUserModules => {
            let report = orchestrator
                .clear_user_modules()
                .await
                .context("Failed to clear user modules")?;
            print_json(&report)?;
            Ok(true)
        }
        Command::Sync { namespace } => {
            let namespace = Namespace::new(namespace).context("Invalid namespace")?;
            let report = orchestrator.sync_namespace(&namespace).await?;
            print_json(&report)?;
            Ok(report.is_success())
        }
    }
}

fn build_services(config: &InstallConfig, env: &EnvironmentConfig) -> Result<DeployServices> {
    let project = &config.project;
    let profile = env.profile();
    let credentials = Credentials::from_connection(&config.connection);

    let transport = Arc::new(
        HttpTransport::new(&profile.manage, credentials.clone(), profile.timeout())
            .context("Failed to create manage transport")?,
    );
    info!("Manage endpoint: {}", profile.manage.base_url());

    let store = Arc::new(
        HttpContentStore::new(&profile.app_services, credentials, profile.timeout())
            .context("Failed to create content store")?,
    );
    info!("Content endpoint: {}", profile.app_services.base_url());

    let tracker_path = project.resolve(&config.tracker.path);
    let backend: Arc<dyn PersistenceBackend> = match config.tracker.backend {
        TrackerBackendKind::Sqlite => Arc::new(
            SqliteTrackerBackend::new(&tracker_path)
                .with_context(|| format!("Failed to open tracker at {:?}", tracker_path))?,
        ),
        TrackerBackendKind::File => Arc::new(FileTrackerBackend::new(tracker_path.clone())),
    };
    info!("Change tracker: {} at {:?}", backend.name(), tracker_path);

    let sync_config = SyncConfig {
        max_parallel_uploads: config.install.max_parallel_uploads,
        verify_destination: config.install.verify_destination,
    };
    let synchronizer = Arc::new(ContentSynchronizer::new(store, backend, sync_config));

    let config_dir = project.resolve(&project.config_dir);
    let catalog = ResourceCatalog::load(&config_dir)
        .with_context(|| format!("Failed to load resources from {:?}", config_dir))?;
    info!("Loaded {} resources from {:?}", catalog.len(), config_dir);

    let source = |dir: &PathBuf| Arc::new(FsArtifactSource::new(project.resolve(dir)));
    Ok(
        DeployServices::new(transport, synchronizer, Arc::new(catalog))
            .with_modules(Namespace::hub_modules(), source(&project.hub_modules_dir))
            .with_modules(Namespace::hub_artifacts(), source(&project.hub_artifacts_dir))
            .with_modules(Namespace::user_modules(), source(&project.user_modules_dir))
            .with_query_options(source(&project.query_options_dir)),
    )
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}
