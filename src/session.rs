// src/session.rs

//! Scoped per-target build sessions
//!
//! A session owns the private build directory for one target, the process
//! environment its build commands run under, and the cleanup policy. The
//! directory is created on open and removed when the session is released -
//! on the success path and the failure path alike - unless cleanup was
//! disabled for inspection. Sessions are never shared between targets.
//!
//! The process environment is derived once, from the ambient environment
//! with the install prefix's `bin` and `lib` directories prepended to the
//! search paths, so components installed earlier in a run are usable by
//! later ones. It is never mutated afterwards and the ambient process
//! environment is never touched.

use crate::archive::extract_archive;
use crate::catalog::PackageDescriptor;
use crate::environment::Environment;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Policy knobs for opening sessions
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Parallelism degree handed to build commands (`make -j`)
    pub jobs: u32,
    /// Remove the build directory when the session is released
    pub auto_cleanup: bool,
    /// Directory build directories are created under
    pub session_root: PathBuf,
}

impl Default for SessionOptions {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);
        Self {
            jobs,
            auto_cleanup: true,
            session_root: std::env::temp_dir().join("crossforge"),
        }
    }
}

/// The isolated working state for building one target
pub struct BuildSession {
    descriptor: PackageDescriptor,
    flags: HashSet<String>,
    environment: Environment,
    build_dir: Option<TempDir>,
    extract_dir: PathBuf,
    process_env: Vec<(String, String)>,
    jobs: u32,
    auto_cleanup: bool,
}

impl BuildSession {
    /// Acquire a session for one package build
    pub fn open(
        descriptor: &PackageDescriptor,
        flags: &HashSet<String>,
        environment: &Environment,
        options: &SessionOptions,
    ) -> Result<Self> {
        fs::create_dir_all(&options.session_root)?;
        let build_dir = TempDir::with_prefix_in(
            format!("{}-{}-", descriptor.name, descriptor.version),
            &options.session_root,
        )?;
        debug!("build directory: {}", build_dir.path().display());

        // GNU release tarballs unpack to a name-version directory
        let extract_dir = build_dir
            .path()
            .join(format!("{}-{}", descriptor.name, descriptor.version));

        let process_env = derive_process_env(&environment.prefix());

        Ok(Self {
            descriptor: descriptor.clone(),
            flags: flags.clone(),
            environment: environment.clone(),
            build_dir: Some(build_dir),
            extract_dir,
            process_env,
            jobs: options.jobs,
            auto_cleanup: options.auto_cleanup,
        })
    }

    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn jobs(&self) -> u32 {
        self.jobs
    }

    pub fn build_dir(&self) -> &Path {
        self.build_dir
            .as_ref()
            .expect("session directory released")
            .path()
    }

    /// Where the source tree lands after unpacking
    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    /// Environment lookup for builders (target, prefix, ...)
    pub fn env_str(&self, key: &str) -> Option<&str> {
        self.environment.get_str(key)
    }

    /// The toolchain installation root
    pub fn prefix(&self) -> PathBuf {
        self.environment.prefix()
    }

    /// The derived process environment build commands run under
    pub fn process_env(&self) -> &[(String, String)] {
        &self.process_env
    }

    /// Extract the retrieved source archive into the build directory
    pub fn unpack_source(&self) -> Result<()> {
        extract_archive(&self.descriptor.local_path, self.build_dir())
    }

    /// Run a build command inside the unpacked source tree
    pub fn run(&self, stage: &'static str, program: &str, args: &[String]) -> Result<()> {
        self.run_in(&self.extract_dir, stage, program, args)
    }

    /// Run a build command in an explicit working directory
    ///
    /// Blocks until the command finishes; a non-zero exit is a stage error
    /// carrying the captured stderr.
    pub fn run_in(
        &self,
        dir: &Path,
        stage: &'static str,
        program: &str,
        args: &[String],
    ) -> Result<()> {
        debug!("[{}] {} {}", stage, program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .env_clear()
            .envs(self.process_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(|e| Error::Stage {
                package: self.descriptor.name.clone(),
                stage,
                detail: format!("failed to start {program}: {e}"),
            })?;

        if !output.status.success() {
            return Err(Error::Stage {
                package: self.descriptor.name.clone(),
                stage,
                detail: format!(
                    "{} exited with {:?}\n{}",
                    program,
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
        Ok(())
    }

    /// Release the session
    ///
    /// Removes the build directory per the cleanup policy. A removal
    /// failure is reported but deliberately not returned, so it can never
    /// mask the error that triggered the release.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(dir) = self.build_dir.take() else {
            return;
        };
        if self.auto_cleanup {
            if let Err(e) = dir.close() {
                warn!("failed to remove build directory: {}", e);
            }
        } else {
            let path = dir.keep();
            info!("build directory retained: {}", path.display());
        }
    }
}

impl Drop for BuildSession {
    // Covers the propagated-failure path; close() is the normal path.
    fn drop(&mut self) {
        self.release();
    }
}

/// Copy the ambient environment, prepending the install prefix to the
/// executable and library search paths.
fn derive_process_env(prefix: &Path) -> Vec<(String, String)> {
    let mut vars: HashMap<String, String> = std::env::vars().collect();

    let bin = prefix.join("bin").to_string_lossy().into_owned();
    let lib = prefix.join("lib").to_string_lossy().into_owned();

    let path = match vars.get("PATH") {
        Some(existing) => format!("{bin}:{existing}"),
        None => bin,
    };
    vars.insert("PATH".to_string(), path);

    let ld_path = match vars.get("LD_LIBRARY_PATH") {
        Some(existing) => format!("{lib}:{existing}"),
        None => lib,
    };
    vars.insert("LD_LIBRARY_PATH".to_string(), ld_path);

    vars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, PREFIX_KEY};
    use serde_json::json;

    fn test_env(prefix: &Path) -> Environment {
        let mut layer = serde_json::Map::new();
        layer.insert(
            PREFIX_KEY.to_string(),
            json!(prefix.to_str().unwrap()),
        );
        layer.insert("target".to_string(), json!("cortex-m4"));
        Environment::resolve(vec![layer]).unwrap()
    }

    fn test_descriptor(dir: &Path) -> PackageDescriptor {
        PackageDescriptor {
            name: "demo".to_string(),
            version: "1.0".to_string(),
            uri: "https://example.invalid/demo-1.0.tar.gz".to_string(),
            sha384: "00".to_string(),
            local_path: dir.join("demo-1.0.tar.gz"),
        }
    }

    fn test_options(root: &Path) -> SessionOptions {
        SessionOptions {
            jobs: 2,
            auto_cleanup: true,
            session_root: root.join("sessions"),
        }
    }

    #[test]
    fn test_process_env_prepends_prefix_paths() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir.path().join("prefix"));
        let session = BuildSession::open(
            &test_descriptor(dir.path()),
            &HashSet::new(),
            &env,
            &test_options(dir.path()),
        )
        .unwrap();

        let path = session
            .process_env()
            .iter()
            .find(|(k, _)| k == "PATH")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(path.starts_with(&format!("{}/bin:", env.prefix().display())));

        let ld = session
            .process_env()
            .iter()
            .find(|(k, _)| k == "LD_LIBRARY_PATH")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(ld.starts_with(&format!("{}/lib", env.prefix().display())));
    }

    #[test]
    fn test_close_removes_build_dir() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir.path().join("prefix"));
        let session = BuildSession::open(
            &test_descriptor(dir.path()),
            &HashSet::new(),
            &env,
            &test_options(dir.path()),
        )
        .unwrap();
        let build_dir = session.build_dir().to_path_buf();
        assert!(build_dir.is_dir());
        session.close();
        assert!(!build_dir.exists());
    }

    #[test]
    fn test_drop_removes_build_dir() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir.path().join("prefix"));
        let build_dir;
        {
            let session = BuildSession::open(
                &test_descriptor(dir.path()),
                &HashSet::new(),
                &env,
                &test_options(dir.path()),
            )
            .unwrap();
            build_dir = session.build_dir().to_path_buf();
        }
        assert!(!build_dir.exists());
    }

    #[test]
    fn test_disabled_cleanup_retains_build_dir() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir.path().join("prefix"));
        let mut options = test_options(dir.path());
        options.auto_cleanup = false;
        let session = BuildSession::open(
            &test_descriptor(dir.path()),
            &HashSet::new(),
            &env,
            &options,
        )
        .unwrap();
        let build_dir = session.build_dir().to_path_buf();
        session.close();
        assert!(build_dir.is_dir());
    }

    #[test]
    fn test_run_in_reports_failed_stage() {
        let dir = TempDir::new().unwrap();
        let env = test_env(&dir.path().join("prefix"));
        let session = BuildSession::open(
            &test_descriptor(dir.path()),
            &HashSet::new(),
            &env,
            &test_options(dir.path()),
        )
        .unwrap();

        session
            .run_in(session.build_dir(), "build", "sh", &["-c".into(), "true".into()])
            .unwrap();

        let err = session
            .run_in(session.build_dir(), "build", "sh", &["-c".into(), "exit 3".into()])
            .unwrap_err();
        match err {
            Error::Stage { package, stage, .. } => {
                assert_eq!(package, "demo");
                assert_eq!(stage, "build");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
