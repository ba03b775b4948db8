// src/target.rs

//! Target specification tokens
//!
//! A target names one build unit using the format:
//! `name[-version][/flag{,flag}]`
//!
//! Examples:
//! - `gcc` - latest catalog version, no flags
//! - `gcc-9.3.0` - pinned version
//! - `gcc-9.3.0/c++,lto` - pinned version with build flags
//! - `gcc/c++` - latest version with build flags
//!
//! `name` and `version` use an alphanumeric-with-dot alphabet; flags are a
//! comma-separated list drawn from letters plus `+` (for `c++`). The whole
//! token must be consumed; partial matches are rejected.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A parsed target specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// Package name (catalog key)
    pub name: String,
    /// Pinned version; `None` selects the latest catalog entry
    pub version: Option<String>,
    /// Build flags; duplicates collapse
    pub flags: HashSet<String>,
}

impl TargetSpec {
    /// Parse a target token
    pub fn parse(token: &str) -> Result<Self> {
        let invalid = || Error::InvalidTargetSpec(token.to_string());

        // Split off the flag segment first; the version separator never
        // appears after the slash.
        let (head, flag_part) = match token.split_once('/') {
            Some((head, flags)) => (head, Some(flags)),
            None => (token, None),
        };

        let (name, version) = match head.split_once('-') {
            Some((name, version)) => (name, Some(version)),
            None => (head, None),
        };

        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(invalid());
        }
        if let Some(version) = version
            && (version.is_empty() || !version.chars().all(is_name_char))
        {
            return Err(invalid());
        }

        let mut flags = HashSet::new();
        if let Some(flag_part) = flag_part {
            for flag in flag_part.split(',') {
                if flag.is_empty() || !flag.chars().all(is_flag_char) {
                    return Err(invalid());
                }
                flags.insert(flag.to_string());
            }
        }

        Ok(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
            flags,
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.'
}

fn is_flag_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '+'
}

impl FromStr for TargetSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "-{}", version)?;
        }
        if !self.flags.is_empty() {
            let mut flags: Vec<&str> = self.flags.iter().map(String::as_str).collect();
            flags.sort_unstable();
            write!(f, "/{}", flags.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bare_name() {
        let spec = TargetSpec::parse("gcc").unwrap();
        assert_eq!(spec.name, "gcc");
        assert_eq!(spec.version, None);
        assert!(spec.flags.is_empty());
    }

    #[test]
    fn test_name_with_version() {
        let spec = TargetSpec::parse("gcc-9.3.0").unwrap();
        assert_eq!(spec.name, "gcc");
        assert_eq!(spec.version.as_deref(), Some("9.3.0"));
        assert!(spec.flags.is_empty());
    }

    #[test]
    fn test_name_version_and_flags() {
        let spec = TargetSpec::parse("gcc-9.3.0/c++,lto").unwrap();
        assert_eq!(spec.name, "gcc");
        assert_eq!(spec.version.as_deref(), Some("9.3.0"));
        assert_eq!(spec.flags, flags(&["c++", "lto"]));
    }

    #[test]
    fn test_flags_without_version() {
        let spec = TargetSpec::parse("gcc/c++").unwrap();
        assert_eq!(spec.name, "gcc");
        assert_eq!(spec.version, None);
        assert_eq!(spec.flags, flags(&["c++"]));
    }

    #[test]
    fn test_duplicate_flags_collapse() {
        let spec = TargetSpec::parse("gdb-10.1/sim,sim").unwrap();
        assert_eq!(spec.flags, flags(&["sim"]));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        for token in [
            "",
            "-9.3.0",
            "gcc-",
            "gcc-9.3.0/",
            "gcc/c++,",
            "gcc/,lto",
            "gcc 9.3.0",
            "gcc-9.3_0",
            "g!cc",
            "gcc/c++/lto",
            "gcc/l_to",
        ] {
            assert!(
                TargetSpec::parse(token).is_err(),
                "token {:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_display_round_trip() {
        for token in ["gcc", "gcc-9.3.0", "gcc-9.3.0/c++,lto", "newlib/nano"] {
            let spec = TargetSpec::parse(token).unwrap();
            let again = TargetSpec::parse(&spec.to_string()).unwrap();
            assert_eq!(spec, again);
        }
    }
}
