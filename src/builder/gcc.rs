// src/builder/gcc.rs

//! Compiler (gcc)
//!
//! Builds a stage-1 cross compiler against newlib. The `c++` target flag
//! adds C++ to the enabled languages; `lto` enables LTO support.

use super::{ToolchainBuilder, required_target, target_args};
use crate::error::Result;
use crate::session::BuildSession;

pub struct GccBuilder;

impl ToolchainBuilder for GccBuilder {
    fn build(&self, session: &BuildSession) -> Result<()> {
        let target = required_target(session)?;

        let languages = if session.has_flag("c++") {
            "c,c++"
        } else {
            "c"
        };

        let mut configure = vec![
            format!("--prefix={}", session.prefix().display()),
            format!("--enable-languages={}", languages),
        ];
        configure.extend(target_args(&target));
        configure.push("--with-newlib".to_string());
        configure.push("--without-headers".to_string());
        configure.push("--disable-nls".to_string());
        configure.push("--disable-libssp".to_string());
        configure.push(if session.has_flag("lto") {
            "--enable-lto".to_string()
        } else {
            "--disable-lto".to_string()
        });

        // gcc refuses to configure inside its own source tree
        let objdir = session.build_dir().join("gcc-obj");
        std::fs::create_dir_all(&objdir)?;
        let configure_script = session.extract_dir().join("configure");
        let mut args = vec![configure_script.to_string_lossy().into_owned()];
        args.extend(configure);
        session.run_in(&objdir, "configure", "sh", &args)?;

        session.run_in(&objdir, "build", "make", &[format!("-j{}", session.jobs())])
    }

    fn install(&self, session: &BuildSession) -> Result<()> {
        let objdir = session.build_dir().join("gcc-obj");
        session.run_in(&objdir, "install", "make", &["install".to_string()])
    }
}
