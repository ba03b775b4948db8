// src/builder/mod.rs

//! Toolchain builder families
//!
//! Each toolchain component family (binutils, gcc, newlib, gdb) implements
//! the same unpack/build/install contract; the registry dispatches on the
//! package name. Unpack and install have conventional defaults (extract
//! the archive, `make install`); the build step is where the families
//! differ, mostly in how the configure argument list is assembled.

mod binutils;
mod gcc;
mod gdb;
mod newlib;

pub use binutils::BinutilsBuilder;
pub use gcc::GccBuilder;
pub use gdb::GdbBuilder;
pub use newlib::NewlibBuilder;

use crate::error::{Error, Result};
use crate::session::BuildSession;
use std::collections::HashMap;

/// The unpack/build/install contract every component family implements
pub trait ToolchainBuilder: Send + Sync {
    /// Extract the retrieved source archive into the build directory
    fn unpack(&self, session: &BuildSession) -> Result<()> {
        session.unpack_source()
    }

    /// Configure and compile inside the unpacked source tree
    fn build(&self, session: &BuildSession) -> Result<()>;

    /// Install into the environment's prefix
    fn install(&self, session: &BuildSession) -> Result<()> {
        session.run("install", "make", &["install".to_string()])
    }
}

/// Registry mapping package names to their builder family
pub struct BuilderRegistry {
    builders: HashMap<String, Box<dyn ToolchainBuilder>>,
}

impl BuilderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// A registry with the standard toolchain component families
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("binutils", Box::new(BinutilsBuilder));
        registry.register("gcc", Box::new(GccBuilder));
        registry.register("newlib", Box::new(NewlibBuilder));
        registry.register("gdb", Box::new(GdbBuilder));
        registry
    }

    /// Register a builder for a package name
    pub fn register(&mut self, name: impl Into<String>, builder: Box<dyn ToolchainBuilder>) {
        self.builders.insert(name.into(), builder);
    }

    /// Look up the builder for a package
    pub fn get(&self, name: &str) -> Result<&dyn ToolchainBuilder> {
        self.builders
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| Error::NoBuilder(name.to_string()))
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// ARM cores that map onto the arm-none-eabi target
const ARM_CORES: &[&str] = &["7tdmi", "cortex-m0", "cortex-m1", "cortex-m3", "cortex-m4"];

/// Configure arguments selecting the cross target for binutils/gcc
///
/// Short core names from the environment map onto GNU target triples;
/// anything unrecognized is passed through as a triple verbatim.
pub(crate) fn target_args(target: &str) -> Vec<String> {
    let mut args = Vec::new();
    if ARM_CORES.contains(&target) {
        args.push("--target=arm-none-eabi".to_string());
        if target == "7tdmi" {
            args.push("--enable-interwork".to_string());
            args.push("--enable-multilib".to_string());
        } else {
            args.push("--enable-thumb".to_string());
            args.push("--disable-interwork".to_string());
            args.push("--disable-multilib".to_string());
        }
    } else if target == "avr" {
        args.push("--target=avr".to_string());
    } else if target == "blackfin" {
        args.push("--target=bfin".to_string());
        args.push("--without-gnu-ld".to_string());
    } else {
        args.push(format!("--target={}", target));
    }
    args
}

/// The environment's `target` key, required by every family
pub(crate) fn required_target(session: &BuildSession) -> Result<String> {
    session
        .env_str("target")
        .map(str::to_string)
        .ok_or_else(|| Error::Configuration("environment does not set \"target\"".to_string()))
}

/// The GNU triple the `target` key denotes (after core-name mapping)
pub(crate) fn target_triple(target: &str) -> String {
    if ARM_CORES.contains(&target) {
        "arm-none-eabi".to_string()
    } else if target == "blackfin" {
        "bfin".to_string()
    } else {
        target.to_string()
    }
}
