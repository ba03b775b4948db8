// src/error.rs

//! Crate-wide error types
//!
//! Every failure in the orchestration layer is fatal to the run: errors are
//! surfaced with enough context (target token, stage) to diagnose, never
//! retried. Cleanup failures are logged by the session and do not replace
//! the original error as the reported cause.

use thiserror::Error;

/// Errors produced by the orchestration layer
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing environment/catalog file
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No targets on the command line and no default-targets in the environment
    #[error("no targets given and environment declares no default-targets")]
    MissingTargets,

    /// A template placeholder names a key absent from the environment
    #[error("unresolved reference {{{{{reference}}}}} in value of key \"{key}\"")]
    UnresolvedReference { key: String, reference: String },

    /// Template substitution did not reach a fixed point within the pass cap
    #[error("template substitution did not settle after {0} passes; probable cyclic reference")]
    RecursionLimitExceeded(usize),

    /// Target token does not match the name[-version][/flag{,flag}] grammar
    #[error("invalid target specification: \"{0}\"")]
    InvalidTargetSpec(String),

    /// Package name not present in the catalog
    #[error("no such package in catalog: \"{0}\"")]
    UnknownPackage(String),

    /// Requested version not present for a known package
    #[error("no such version for \"{package}\" in catalog: {version}")]
    UnknownVersion { package: String, version: String },

    /// Network or storage failure while retrieving a source archive
    #[error("download failed: {0}")]
    Download(String),

    /// Retrieved archive does not match the catalog digest
    #[error("checksum mismatch for {package}: expected sha384:{expected}, got sha384:{actual}")]
    ChecksumMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    /// No builder family registered for the package
    #[error("no builder registered for package: \"{0}\"")]
    NoBuilder(String),

    /// A build stage (unpack/build/install) returned a non-zero result
    #[error("{stage} stage failed for {package}: {detail}")]
    Stage {
        package: String,
        stage: &'static str,
        detail: String,
    },

    /// Archive format we do not know how to extract
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
