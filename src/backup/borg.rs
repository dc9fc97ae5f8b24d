//! Borg side: archive creation fed by a producer command, per-prefix pruning,
//! repository compaction and the `borg -V` probe.

use crate::backup::command::{command_argv, CommandRunner};
use crate::backup::function_path;
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddFunctionName;
use crate::backup::validate::{validate_keep_within, validate_not_blank};
use crate::backup::version::{require_minimum, VersionPattern};
use bon::Builder;
use function_name::named;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::process::Command;
use validator::Validate;

pub const MINIMUM_BORG_VERSION: semver::Version = semver::Version::new(1, 2, 4);

/// Compression spec handed to `borg create`
pub static ARCHIVE_COMPRESSION: &str = "auto,zlib";

/// Repository and credentials for one job
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate, Builder)]
#[serde(deny_unknown_fields)]
pub struct BorgSettings {
    #[validate(custom(function = validate_not_blank))]
    #[builder(into)]
    pub repository: String,
    #[serde(default)]
    #[builder(default, into)]
    pub remote_path: String,
    #[builder(into)]
    pub passphrase: Option<RedactedString>,
    #[serde(default)]
    #[validate(nested)]
    #[builder(default)]
    pub prune: PruneSettings,
}

/// Retention policy of a job. Zero counts and an empty `keep_within` are left
/// out of the prune invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate, Builder)]
#[serde(deny_unknown_fields, default)]
pub struct PruneSettings {
    #[builder(default)]
    pub enabled: bool,
    /// Run `borg compact` once the prune pass of a job is over
    #[builder(default)]
    pub compact: bool,
    #[validate(custom(function = validate_keep_within))]
    #[builder(default, into)]
    pub keep_within: String,
    #[builder(default)]
    pub keep_last: u64,
    #[builder(default)]
    pub keep_minutely: u64,
    #[builder(default)]
    pub keep_hourly: u64,
    #[builder(default)]
    pub keep_daily: u64,
    #[builder(default)]
    pub keep_weekly: u64,
    #[builder(default)]
    pub keep_monthly: u64,
    #[builder(default)]
    pub keep_yearly: u64,
}

impl PruneSettings {
    /// `--keep-*` arguments for every constraint that is actually set.
    pub fn keep_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.keep_within.is_empty() {
            args.push("--keep-within".to_owned());
            args.push(self.keep_within.clone());
        }
        let counts = [
            ("--keep-last", self.keep_last),
            ("--keep-minutely", self.keep_minutely),
            ("--keep-hourly", self.keep_hourly),
            ("--keep-daily", self.keep_daily),
            ("--keep-weekly", self.keep_weekly),
            ("--keep-monthly", self.keep_monthly),
            ("--keep-yearly", self.keep_yearly),
        ];
        for (flag, count) in counts.into_iter().filter(|(_, count)| *count > 0) {
            args.push(flag.to_owned());
            args.push(count.to_string());
        }
        args
    }
}

/// Options of one `borg create` invocation
#[derive(Clone, Debug, Default, Builder)]
pub struct CreateArchiveSettings {
    #[builder(into)]
    pub compression: Option<String>,
    #[builder(into)]
    pub comment: Option<String>,
    #[builder(default, into)]
    pub extra_args: Vec<String>,
}

impl BorgSettings {
    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new("borg");
        cmd.arg(subcommand);
        if !self.remote_path.is_empty() {
            cmd.args(["--remote-path", &self.remote_path]);
        }
        if let Some(passphrase) = &self.passphrase {
            cmd.env("BORG_PASSPHRASE", passphrase.inner());
        }
        cmd
    }

    /// `borg create` that spawns `source` itself and archives its stdout as a
    /// single item named after the archive.
    pub fn create_archive_command(
        &self,
        archive_name: &str,
        settings: &CreateArchiveSettings,
        source: &Command,
    ) -> Command {
        let mut cmd = self.command("create");
        cmd.args(["--files-cache", "disabled"])
            .args(["--stdin-name", archive_name]);
        if let Some(compression) = &settings.compression {
            cmd.args(["--compression", compression]);
        }
        if let Some(comment) = &settings.comment {
            cmd.args(["--comment", comment]);
        }
        cmd.args(&settings.extra_args)
            .arg("--content-from-command")
            .arg(format!("{}::{}", self.repository, archive_name))
            .arg("--")
            .args(command_argv(source));
        cmd
    }

    /// `borg prune` restricted to archives starting with `archive_prefix`.
    pub fn prune_command(&self, archive_prefix: &str) -> Result<Command> {
        if !self.prune.enabled {
            return Err(Error::PruneDisabled(self.repository.clone()));
        }
        let mut cmd = self.command("prune");
        cmd.args(self.prune.keep_args())
            .args(["--glob-archives", &format!("{archive_prefix}*")])
            .arg(&self.repository);
        Ok(cmd)
    }

    pub fn compact_command(&self) -> Result<Command> {
        if !self.prune.compact {
            return Err(Error::CompactDisabled(self.repository.clone()));
        }
        let mut cmd = self.command("compact");
        cmd.arg(&self.repository);
        Ok(cmd)
    }

    #[named]
    pub fn compact<R: CommandRunner>(&self, runner: &R) -> Result<()> {
        let mut cmd = self.compact_command()?;
        tracing::info!("Now compacting repository {}", self.repository);
        runner.run(&mut cmd).add_fn_name(function_path!())
    }
}

#[named]
pub fn check_version<R: CommandRunner>(runner: &R) -> Result<semver::Version> {
    let output = runner
        .output(Command::new("borg").arg("-V"))
        .add_fn_name(function_path!())?;
    let output = String::from_utf8_lossy(&output);
    let pattern = VersionPattern::borg();
    let found = pattern.parse(&output)?;
    require_minimum(pattern.program(), found, MINIMUM_BORG_VERSION)
}
