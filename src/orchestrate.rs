// src/orchestrate.rs

//! The staged build pipeline
//!
//! Drives each target through retrieve, unpack, build, and install.
//! Targets run strictly one at a time; parallelism lives inside a build
//! stage (`make -j`), never across targets. A failure anywhere is fatal to
//! the run - no later target is attempted - but the failing target's
//! session is still released first.

use crate::builder::BuilderRegistry;
use crate::catalog::PackageCatalog;
use crate::environment::Environment;
use crate::error::Result;
use crate::session::{BuildSession, SessionOptions};
use crate::target::TargetSpec;
use std::path::PathBuf;
use tracing::{debug, info};

/// Run-wide options threaded into every target's build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Parallelism degree for individual build stages
    pub jobs: u32,
    /// Verify archive digests on retrieval
    pub verify: bool,
    /// Remove build session directories after each target
    pub cleanup: bool,
    /// Run the install stage
    pub install: bool,
    /// Directory session build directories are created under
    pub session_root: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        Self {
            jobs,
            verify: true,
            cleanup: true,
            install: true,
            session_root: std::env::temp_dir().join("crossforge"),
        }
    }
}

/// Drives the retrieve/unpack/build/install pipeline over targets
pub struct Orchestrator<'a> {
    catalog: &'a PackageCatalog,
    registry: &'a BuilderRegistry,
    environment: &'a Environment,
    options: BuildOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        catalog: &'a PackageCatalog,
        registry: &'a BuilderRegistry,
        environment: &'a Environment,
        options: BuildOptions,
    ) -> Self {
        Self {
            catalog,
            registry,
            environment,
            options,
        }
    }

    /// Build every target in order, stopping at the first failure
    pub fn build_all(&self, targets: &[String]) -> Result<()> {
        for (index, token) in targets.iter().enumerate() {
            info!("Target {}/{}: {}", index + 1, targets.len(), token);
            self.build_target(token)?;
        }
        Ok(())
    }

    /// Drive one target through the full pipeline
    pub fn build_target(&self, token: &str) -> Result<()> {
        let spec = TargetSpec::parse(token)?;

        let pkg = self.catalog.get(&spec.name, spec.version.as_deref())?;
        info!("Resolved {} to {} {}", token, pkg.name, pkg.version);

        self.catalog.retrieve(&pkg, self.options.verify)?;

        let builder = self.registry.get(&pkg.name)?;
        let session_options = SessionOptions {
            jobs: self.options.jobs,
            auto_cleanup: self.options.cleanup,
            session_root: self.options.session_root.clone(),
        };
        let session = BuildSession::open(&pkg, &spec.flags, self.environment, &session_options)?;

        // The session is released on every exit path; a cleanup failure is
        // logged there and never replaces a build error.
        let result = (|| {
            builder.unpack(&session)?;
            builder.build(&session)?;
            if self.options.install {
                builder.install(&session)?;
            } else {
                debug!("install stage skipped for {}", pkg.name);
            }
            Ok(())
        })();

        session.close();

        if result.is_ok() {
            info!("Finished {} {}", pkg.name, pkg.version);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::PREFIX_KEY;
    use crate::error::Error;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn test_env(dir: &TempDir) -> Environment {
        let mut layer = serde_json::Map::new();
        layer.insert(
            PREFIX_KEY.to_string(),
            json!(dir.path().join("prefix").to_str().unwrap()),
        );
        layer.insert("target".to_string(), json!("cortex-m4"));
        Environment::resolve(vec![layer]).unwrap()
    }

    fn test_catalog(dir: &TempDir) -> PackageCatalog {
        let path = dir.path().join("packages.json");
        fs::write(
            &path,
            serde_json::to_string(&json!({
                "gcc": [{"version": "9.3.0",
                          "uri": "https://example.invalid/gcc-{{version}}.tar.gz",
                          "sha384": "00"}]
            }))
            .unwrap(),
        )
        .unwrap();
        PackageCatalog::open(&path, &dir.path().join("cache")).unwrap()
    }

    #[test]
    fn test_parse_failure_aborts_before_resolution() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir);
        let catalog = test_catalog(&dir);
        let registry = BuilderRegistry::new();
        let orchestrator = Orchestrator::new(&catalog, &registry, &env, BuildOptions::default());

        let err = orchestrator.build_target("g!cc").unwrap_err();
        assert!(matches!(err, Error::InvalidTargetSpec(_)));
    }

    #[test]
    fn test_unknown_package_is_fatal() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir);
        let catalog = test_catalog(&dir);
        let registry = BuilderRegistry::with_defaults();
        let orchestrator = Orchestrator::new(&catalog, &registry, &env, BuildOptions::default());

        let err = orchestrator.build_target("clang").unwrap_err();
        assert!(matches!(err, Error::UnknownPackage(_)));
    }

    #[test]
    fn test_missing_builder_is_fatal() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir);

        // Seed the cache with a matching digest so retrieval succeeds
        // without a network
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        let archive = cache.join("gcc-9.3.0.tar.gz");
        fs::write(&archive, b"archive").unwrap();
        let digest = crate::catalog::download::file_sha384(&archive).unwrap();

        let path = dir.path().join("packages.json");
        fs::write(
            &path,
            serde_json::to_string(&json!({
                "gcc": [{"version": "9.3.0",
                          "uri": "https://example.invalid/gcc-{{version}}.tar.gz",
                          "sha384": digest}]
            }))
            .unwrap(),
        )
        .unwrap();
        let catalog = PackageCatalog::open(&path, &cache).unwrap();

        let registry = BuilderRegistry::new();
        let options = BuildOptions {
            session_root: dir.path().join("sessions"),
            ..BuildOptions::default()
        };
        let orchestrator = Orchestrator::new(&catalog, &registry, &env, options);

        let err = orchestrator.build_target("gcc-9.3.0").unwrap_err();
        assert!(matches!(err, Error::NoBuilder(_)));
    }
}
