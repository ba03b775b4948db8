// src/cli.rs

//! CLI definitions for the crossforge build orchestrator
//!
//! This module contains the command-line interface definitions using clap.
//! The run controller lives in the `commands` module.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crossforge")]
#[command(author = "Crossforge Project")]
#[command(version)]
#[command(about = "Build embedded cross-toolchains from source", long_about = None)]
pub struct Cli {
    /// Layered environment configuration files, applied in the given order
    #[arg(short = 'e', long = "envfile", value_name = "FILE")]
    pub envfile: Vec<PathBuf>,

    /// Package catalog file
    #[arg(short = 'p', long = "packages", default_value = "packages.json")]
    pub packages: PathBuf,

    /// Local cache directory for retrieved sources
    #[arg(short = 'd', long = "package-dir", default_value = "packages")]
    pub package_dir: PathBuf,

    /// Parallelism degree passed to build stages (default: host core count)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<u32>,

    /// Skip checksum verification on retrieval
    #[arg(long)]
    pub disable_verification: bool,

    /// Retain build session directories after completion
    #[arg(long)]
    pub no_cleanup: bool,

    /// Skip the install stage for all targets
    #[arg(long)]
    pub no_install: bool,

    /// Increase diagnostic verbosity (repeatable)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Target tokens (name[-version][/flag,flag]); falls back to the
    /// environment's default-targets
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_invocation() {
        let cli = Cli::parse_from([
            "crossforge",
            "-e",
            "base.json",
            "-e",
            "board.json",
            "-p",
            "catalog.json",
            "-d",
            "/var/cache/sources",
            "--concurrency",
            "8",
            "--disable-verification",
            "--no-cleanup",
            "--no-install",
            "-vv",
            "binutils",
            "gcc-9.3.0/c++,lto",
        ]);
        assert_eq!(cli.envfile.len(), 2);
        assert_eq!(cli.packages, PathBuf::from("catalog.json"));
        assert_eq!(cli.package_dir, PathBuf::from("/var/cache/sources"));
        assert_eq!(cli.concurrency, Some(8));
        assert!(cli.disable_verification);
        assert!(cli.no_cleanup);
        assert!(cli.no_install);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.targets, vec!["binutils", "gcc-9.3.0/c++,lto"]);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["crossforge"]);
        assert!(cli.envfile.is_empty());
        assert_eq!(cli.packages, PathBuf::from("packages.json"));
        assert_eq!(cli.concurrency, None);
        assert!(!cli.disable_verification);
        assert!(!cli.no_cleanup);
        assert!(!cli.no_install);
        assert_eq!(cli.verbose, 0);
        assert!(cli.targets.is_empty());
    }
}
