// src/catalog/mod.rs

//! Package catalog: the declarative listing of buildable components
//!
//! The catalog is a JSON file mapping package names to a list of versions,
//! oldest first. Each version entry carries the source archive URI (with an
//! optional `{{version}}` placeholder) and its SHA-384 digest:
//!
//! ```json
//! {
//!   "binutils": [
//!     { "version": "2.34", "uri": "https://ftp.gnu.org/gnu/binutils/binutils-{{version}}.tar.xz",
//!       "sha384": "..." }
//!   ]
//! }
//! ```
//!
//! Retrieval downloads into a persistent cache directory and verifies the
//! digest; a cached file with a correct digest short-circuits the download.

pub mod download;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One version entry in the catalog file
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub version: String,
    pub uri: String,
    pub sha384: String,
}

/// A concrete, retrievable package selected from the catalog
///
/// Immutable once produced; the orchestration layer only reads it.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    /// Source URI with `{{version}}` substituted
    pub uri: String,
    /// Expected SHA-384 digest, lowercase hex
    pub sha384: String,
    /// Path of the archive in the package cache
    pub local_path: PathBuf,
}

impl PackageDescriptor {
    /// Archive file name (basename of the URI)
    pub fn archive_filename(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }
}

/// The package catalog and its local cache directory
#[derive(Debug)]
pub struct PackageCatalog {
    path: PathBuf,
    package_dir: PathBuf,
    packages: HashMap<String, Vec<CatalogEntry>>,
}

impl PackageCatalog {
    /// Load a catalog file and prepare the cache directory
    pub fn open(path: &Path, package_dir: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let packages: HashMap<String, Vec<CatalogEntry>> =
            serde_json::from_str(&text).map_err(|e| {
                Error::Configuration(format!("cannot parse catalog {}: {}", path.display(), e))
            })?;

        fs::create_dir_all(package_dir)?;
        let package_dir = fs::canonicalize(package_dir)?;

        Ok(Self {
            path: path.to_path_buf(),
            package_dir,
            packages,
        })
    }

    /// Select a package from the catalog
    ///
    /// With no version requested, the last (latest) entry wins.
    pub fn get(&self, name: &str, version: Option<&str>) -> Result<PackageDescriptor> {
        let entries = self
            .packages
            .get(name)
            .ok_or_else(|| Error::UnknownPackage(name.to_string()))?;

        let entry = match version {
            Some(version) => entries
                .iter()
                .find(|e| e.version == version)
                .ok_or_else(|| Error::UnknownVersion {
                    package: name.to_string(),
                    version: version.to_string(),
                })?,
            None => entries.last().ok_or_else(|| {
                Error::Configuration(format!(
                    "catalog {} lists no versions for \"{}\"",
                    self.path.display(),
                    name
                ))
            })?,
        };

        let uri = entry.uri.replace("{{version}}", &entry.version);
        let filename = uri.rsplit('/').next().unwrap_or(&uri).to_string();

        Ok(PackageDescriptor {
            name: name.to_string(),
            version: entry.version.clone(),
            local_path: self.package_dir.join(filename),
            sha384: entry.sha384.to_ascii_lowercase(),
            uri,
        })
    }

    /// Make the package's source archive available in the cache
    ///
    /// Skips the download when a cached copy with a matching digest exists;
    /// a cached copy with a wrong digest is deleted and re-downloaded.
    /// After a download, a digest mismatch fails with `verify == true`; with
    /// `verify == false` it is reported and the archive accepted as-is.
    pub fn retrieve(&self, pkg: &PackageDescriptor, verify: bool) -> Result<PathBuf> {
        if self.is_cached(pkg)? {
            debug!("Using cached archive: {}", pkg.local_path.display());
            return Ok(pkg.local_path.clone());
        }

        download::download(&pkg.uri, &pkg.local_path)?;

        let actual = download::file_sha384(&pkg.local_path)?;
        if actual != pkg.sha384 {
            if verify {
                let _ = fs::remove_file(&pkg.local_path);
                return Err(Error::ChecksumMismatch {
                    package: format!("{}-{}", pkg.name, pkg.version),
                    expected: pkg.sha384.clone(),
                    actual,
                });
            }
            warn!(
                "Could not verify {} {}; observed digest sha384:{}",
                pkg.name, pkg.version, actual
            );
        }

        Ok(pkg.local_path.clone())
    }

    /// Check the cache for an archive with a matching digest
    ///
    /// A stale file (wrong digest) is removed so retrieval re-downloads it.
    fn is_cached(&self, pkg: &PackageDescriptor) -> Result<bool> {
        if !pkg.local_path.exists() {
            return Ok(false);
        }

        let actual = download::file_sha384(&pkg.local_path)?;
        if actual != pkg.sha384 {
            warn!(
                "Cached archive {} has wrong digest, discarding",
                pkg.local_path.display()
            );
            fs::remove_file(&pkg.local_path)?;
            return Ok(false);
        }

        Ok(true)
    }
}
