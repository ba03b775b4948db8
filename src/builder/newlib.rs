// src/builder/newlib.rs

//! C library (newlib)
//!
//! Configured for bare-metal targets: no supplied syscalls, the program is
//! expected to provide them. The `nano` target flag selects the
//! size-optimized newlib-nano formatted I/O.

use super::{ToolchainBuilder, required_target, target_triple};
use crate::error::Result;
use crate::session::BuildSession;

pub struct NewlibBuilder;

impl ToolchainBuilder for NewlibBuilder {
    fn build(&self, session: &BuildSession) -> Result<()> {
        let target = required_target(session)?;

        let mut configure = vec![
            format!("--prefix={}", session.prefix().display()),
            format!("--target={}", target_triple(&target)),
            "--disable-newlib-supplied-syscalls".to_string(),
            "--disable-nls".to_string(),
        ];
        if session.has_flag("nano") {
            configure.push("--enable-newlib-nano-formatted-io".to_string());
            configure.push("--enable-newlib-nano-malloc".to_string());
            configure.push("--enable-lite-exit".to_string());
        }
        session.run("configure", "./configure", &configure)?;

        session.run("build", "make", &[format!("-j{}", session.jobs())])
    }
}
