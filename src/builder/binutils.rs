// src/builder/binutils.rs

//! Assembler/linker suite (binutils)

use super::{ToolchainBuilder, required_target, target_args};
use crate::error::Result;
use crate::session::BuildSession;

pub struct BinutilsBuilder;

impl ToolchainBuilder for BinutilsBuilder {
    fn build(&self, session: &BuildSession) -> Result<()> {
        let target = required_target(session)?;

        let mut configure = vec![format!("--prefix={}", session.prefix().display())];
        configure.extend(target_args(&target));
        configure.push("--disable-nls".to_string());
        configure.push("--disable-libssp".to_string());
        session.run("configure", "./configure", &configure)?;

        session.run("build", "make", &[format!("-j{}", session.jobs())])
    }
}
