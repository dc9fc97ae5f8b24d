//! Job declarations as loaded from the YAML configuration file.

use crate::backup::borg::{BorgSettings, PruneSettings};
use crate::backup::notifications::{Frequency, NotificationConfig, NotificationTarget, Priority};
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::AddMsg;
use crate::backup::validate::validate_archive_prefix;
use bon::Builder;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::result;
use validator::{Validate, ValidationError};

/// How a guest is backed up. Only `image` (a `vzdump --stdout` stream) is
/// implemented; any other name is kept so the job can report it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackupMode {
    #[default]
    Image,
    Unimplemented(String),
}

impl BackupMode {
    pub fn name(&self) -> &str {
        match self {
            BackupMode::Image => "image",
            BackupMode::Unimplemented(name) => name,
        }
    }
}

impl Display for BackupMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for BackupMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for BackupMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_str(BackupModeVisitor)
    }
}

struct BackupModeVisitor;

impl Visitor<'_> for BackupModeVisitor {
    type Value = BackupMode;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a backup mode name")
    }

    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(match v {
            "image" => BackupMode::Image,
            other => BackupMode::Unimplemented(other.to_owned()),
        })
    }
}

fn validate_backup_mode(mode: &BackupMode) -> result::Result<(), ValidationError> {
    match mode {
        BackupMode::Image => Ok(()),
        BackupMode::Unimplemented(name) => Err(ValidationError::new("UnimplementedMode")
            .with_message(format!("Backup mode {name:?} is not implemented").into())),
    }
}

/// One named backup job
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Pools whose guests are backed up, resolved in this order
    #[validate(length(min = 1))]
    #[builder(into)]
    pub pools: Vec<String>,
    /// Leading part of every archive name, empty means the local hostname
    #[serde(default)]
    #[validate(custom(function = validate_archive_prefix))]
    #[builder(default, into)]
    pub archive_prefix: String,
    #[serde(default)]
    #[validate(custom(function = validate_backup_mode))]
    #[builder(default)]
    pub vm_mode: BackupMode,
    #[serde(default)]
    #[validate(custom(function = validate_backup_mode))]
    #[builder(default)]
    pub container_mode: BackupMode,
    #[validate(nested)]
    pub borg: BorgSettings,
    #[serde(default)]
    #[validate(nested)]
    #[builder(default)]
    pub notification: NotificationConfig,
}

/// Root of the configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupJobsConfig {
    pub jobs: BTreeMap<String, JobConfig>,
}

impl BackupJobsConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::File::open(path)
            .map_err(Error::from)
            .add_msg(format!("Cannot open config file: {path:?}"))
            .and_then(|f| {
                serde_yml::from_reader::<_, BackupJobsConfig>(f)
                    .map_err(Error::from)
                    .add_msg(format!("Parse YAML config failed: {path:?}"))
            })
    }

    /// Validates every job, reporting all invalid jobs at once.
    pub fn validate_all(&self) -> Result<()> {
        let errors = self
            .jobs
            .iter()
            .filter_map(|(name, job)| {
                job.validate()
                    .map_err(Error::from)
                    .add_msg(format!("Job {name:?} is invalid"))
                    .err()
            })
            .collect();
        convert_error_vec(errors)
    }

    /// Example document printed by `--print-sample-config`.
    pub fn sample() -> Self {
        let job = JobConfig::builder()
            .pools(vec!["my_vm_pool".to_owned(), "my_lxc_pool".to_owned()])
            .borg(
                BorgSettings::builder()
                    .repository("ssh://borg@backup.example.com/./pve")
                    .remote_path("/usr/local/bin/borg")
                    .passphrase(RedactedString::from("my-borg-passphrase"))
                    .prune(
                        PruneSettings::builder()
                            .keep_within("15d")
                            .keep_last(10)
                            .keep_weekly(8)
                            .keep_monthly(12)
                            .keep_yearly(10)
                            .build(),
                    )
                    .build(),
            )
            .notification(
                NotificationConfig::builder()
                    .server("https://ntfy.example.com")
                    .topic("pve-backups")
                    .auth_user("my_user_or_empty_for_access_token")
                    .auth_password(RedactedString::from("my_user_password_or_token"))
                    .backup(
                        NotificationTarget::builder()
                            .frequency(Frequency::PerJob)
                            .success_priority(Priority::Default)
                            .failure_priority(Priority::High)
                            .build(),
                    )
                    .prune(
                        NotificationTarget::builder()
                            .frequency(Frequency::PerMachine)
                            .success_priority(Priority::Low)
                            .failure_priority(Priority::High)
                            .build(),
                    )
                    .build(),
            )
            .build();
        Self {
            jobs: BTreeMap::from([("nightly".to_owned(), job)]),
        }
    }
}
