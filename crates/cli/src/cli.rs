use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Incremental installer for data hub configuration.
#[derive(Debug, Parser)]
#[command(name = "hubdeploy", version)]
pub struct Cli {
    /// Configuration file
    #[arg(long, env = "HUBDEPLOY_CONFIG", default_value = "hubdeploy.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Environment property override, e.g. `-P app_services.port=8010`.
    /// Wins over `[properties]` in the config file.
    #[arg(short = 'P', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub properties: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install into the evaluator group, then the curator group
    Install,
    /// Retract everything the install deploys, in reverse
    Uninstall,
    /// Delete user modules and forget their change records
    ClearUserModules,
    /// Sync one module namespace without running the install
    Sync {
        /// Namespace, e.g. `user-modules`
        namespace: String,
    },
}

impl Cli {
    pub fn property_overrides(&self) -> BTreeMap<String, String> {
        self.properties.iter().cloned().collect()
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("app_services.port=8010").unwrap(),
            ("app_services.port".to_string(), "8010".to_string())
        );
        assert_eq!(
            parse_key_val("modules.permissions=a,read,b=c").unwrap(),
            ("modules.permissions".to_string(), "a,read,b=c".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_later_overrides_win() {
        let cli = Cli::try_parse_from([
            "hubdeploy",
            "--config",
            "custom.toml",
            "-P",
            "a=1",
            "-P",
            "a=2",
            "install",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.property_overrides().get("a").map(String::as_str), Some("2"));
        assert!(matches!(cli.command, Command::Install));
    }

    #[test]
    fn test_sync_requires_namespace() {
        assert!(Cli::try_parse_from(["hubdeploy", "sync"]).is_err());
        let cli = Cli::try_parse_from(["hubdeploy", "sync", "hub-modules"]).unwrap();
        match cli.command {
            Command::Sync { namespace } => assert_eq!(namespace, "hub-modules"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
