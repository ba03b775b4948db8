// src/commands.rs

//! The run controller
//!
//! Resolves the final target list (command line, else the environment's
//! default-targets) and iterates the orchestrator over it. The binary
//! exits nonzero on the first failure.

use crate::builder::BuilderRegistry;
use crate::catalog::PackageCatalog;
use crate::cli::Cli;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::orchestrate::{BuildOptions, Orchestrator};
use tracing::info;

/// Execute a build run as described by the command line
pub fn run(cli: &Cli) -> Result<()> {
    let environment = Environment::from_files(&cli.envfile)?;

    // Settle the target list before touching the catalog: with nothing to
    // build there is nothing to resolve.
    let targets = resolve_targets(&cli.targets, &environment)?;
    info!("Building {} target(s): {}", targets.len(), targets.join(", "));

    let catalog = PackageCatalog::open(&cli.packages, &cli.package_dir)?;
    let registry = BuilderRegistry::with_defaults();

    let mut options = BuildOptions {
        verify: !cli.disable_verification,
        cleanup: !cli.no_cleanup,
        install: !cli.no_install,
        ..BuildOptions::default()
    };
    if let Some(jobs) = cli.concurrency {
        options.jobs = jobs;
    }

    let orchestrator = Orchestrator::new(&catalog, &registry, &environment, options);
    orchestrator.build_all(&targets)
}

/// The final target list: explicit tokens win, else the environment's
/// default-targets, else a missing-targets failure.
pub fn resolve_targets(cli_targets: &[String], environment: &Environment) -> Result<Vec<String>> {
    if !cli_targets.is_empty() {
        return Ok(cli_targets.to_vec());
    }
    environment
        .default_targets()?
        .filter(|targets| !targets.is_empty())
        .ok_or(Error::MissingTargets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{DEFAULT_TARGETS_KEY, PREFIX_KEY};
    use serde_json::json;
    use tempfile::TempDir;

    fn env_with(dir: &TempDir, extra: serde_json::Value) -> Environment {
        let mut layer = serde_json::Map::new();
        layer.insert(
            PREFIX_KEY.to_string(),
            json!(dir.path().join("prefix").to_str().unwrap()),
        );
        if let serde_json::Value::Object(map) = extra {
            layer.extend(map);
        }
        Environment::resolve(vec![layer]).unwrap()
    }

    #[test]
    fn test_explicit_targets_win() {
        let dir = TempDir::new().unwrap();
        let env = env_with(&dir, json!({DEFAULT_TARGETS_KEY: ["binutils"]}));
        let targets =
            resolve_targets(&["gcc".to_string(), "gdb".to_string()], &env).unwrap();
        assert_eq!(targets, vec!["gcc", "gdb"]);
    }

    #[test]
    fn test_default_targets_preserve_order() {
        let dir = TempDir::new().unwrap();
        let env = env_with(
            &dir,
            json!({DEFAULT_TARGETS_KEY: ["binutils", "gcc-9.3.0", "newlib"]}),
        );
        let targets = resolve_targets(&[], &env).unwrap();
        assert_eq!(targets, vec!["binutils", "gcc-9.3.0", "newlib"]);
    }

    #[test]
    fn test_no_targets_anywhere_fails() {
        let dir = TempDir::new().unwrap();
        let env = env_with(&dir, json!({}));
        assert!(matches!(
            resolve_targets(&[], &env).unwrap_err(),
            Error::MissingTargets
        ));
    }

    #[test]
    fn test_empty_default_list_fails() {
        let dir = TempDir::new().unwrap();
        let env = env_with(&dir, json!({DEFAULT_TARGETS_KEY: []}));
        assert!(matches!(
            resolve_targets(&[], &env).unwrap_err(),
            Error::MissingTargets
        ));
    }
}
