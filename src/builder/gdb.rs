// src/builder/gdb.rs

//! Debugger (gdb)
//!
//! The `sim` target flag enables the bundled instruction-set simulator,
//! `tui` the curses text UI.

use super::{ToolchainBuilder, required_target, target_triple};
use crate::error::Result;
use crate::session::BuildSession;

pub struct GdbBuilder;

impl ToolchainBuilder for GdbBuilder {
    fn build(&self, session: &BuildSession) -> Result<()> {
        let target = required_target(session)?;

        let mut configure = vec![
            format!("--prefix={}", session.prefix().display()),
            format!("--target={}", target_triple(&target)),
            "--disable-nls".to_string(),
        ];
        configure.push(if session.has_flag("sim") {
            "--enable-sim".to_string()
        } else {
            "--disable-sim".to_string()
        });
        if session.has_flag("tui") {
            configure.push("--enable-tui".to_string());
        }
        session.run("configure", "./configure", &configure)?;

        session.run("build", "make", &[format!("-j{}", session.jobs())])
    }
}
