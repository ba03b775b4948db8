// src/lib.rs

//! Crossforge: embedded cross-toolchain build orchestrator
//!
//! Builds embedded toolchain components (binutils, gcc, newlib, gdb) from
//! source, driven by a declarative package catalog and layered environment
//! configuration.
//!
//! # Architecture
//!
//! - Environment: layered JSON configuration with `{{name}}` template
//!   references resolved to a fixed point
//! - Targets: `name[-version][/flag,flag]` tokens selecting catalog entries
//! - Catalog: versioned source archives with SHA-384 verified retrieval
//! - Sessions: private, scoped build directories with a derived process
//!   environment and guaranteed cleanup
//! - Builders: one family per toolchain component, all implementing the
//!   same unpack/build/install contract

pub mod archive;
pub mod builder;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod environment;
mod error;
pub mod orchestrate;
pub mod session;
pub mod target;

pub use builder::{BuilderRegistry, ToolchainBuilder};
pub use catalog::{PackageCatalog, PackageDescriptor};
pub use environment::Environment;
pub use error::{Error, Result};
pub use orchestrate::{BuildOptions, Orchestrator};
pub use session::{BuildSession, SessionOptions};
pub use target::TargetSpec;
