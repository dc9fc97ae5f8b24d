//! Minimum-version gate for the external tools.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use regex::{Captures, Regex};
use semver::Version;
use std::sync::OnceLock;

/// A tool's version line and the capture groups of its major, minor and
/// patch numbers. The regex is compiled on first use.
pub struct VersionPattern {
    program: &'static str,
    pattern: &'static str,
    regex: OnceLock<Regex>,
}

impl VersionPattern {
    pub const fn new(program: &'static str, pattern: &'static str) -> Self {
        Self {
            program,
            pattern,
            regex: OnceLock::new(),
        }
    }

    /// Matches `pveversion` output, e.g.
    /// `pve-manager/8.1.4/ec5affc9e41f1d79 (running kernel: 6.5.11-8-pve)`.
    pub const fn pve() -> Self {
        Self::new("pveversion", r"pve-manager/(\d+)(?:\.(\d+))?(?:\.(\d+))?")
    }

    /// Matches `borg -V` output, e.g. `borg 1.2.7`.
    pub const fn borg() -> Self {
        Self::new("borg", r"borg\s*(\d+)(?:\.(\d+))?(?:\.(\d+))?")
    }

    fn regex(&self) -> Result<&Regex> {
        if let Some(regex) = self.regex.get() {
            return Ok(regex);
        }
        let regex = Regex::new(self.pattern)?;
        Ok(self.regex.get_or_init(|| regex))
    }

    /// Missing minor or patch components count as zero.
    pub fn parse(&self, output: &str) -> Result<Version> {
        let unparsable = || Error::UnparsableVersion {
            program: self.program,
            output: output.trim().to_owned(),
        };
        let captures = self.regex()?.captures(output).ok_or_else(unparsable)?;
        let component = |captures: &Captures, index: usize| -> Result<u64> {
            captures
                .get(index)
                .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| unparsable()))
        };
        Ok(Version::new(
            component(&captures, 1)?,
            component(&captures, 2)?,
            component(&captures, 3)?,
        ))
    }

    pub fn program(&self) -> &'static str {
        self.program
    }
}

pub fn require_minimum(program: &'static str, found: Version, required: Version) -> Result<Version> {
    if found < required {
        Err(Error::VersionTooOld {
            program,
            found,
            required,
        })
    } else {
        Ok(found)
    }
}
