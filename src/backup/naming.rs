//! Archive names and the vzdump job tag.
//!
//! An archive is named `[prefix-]<kind>-<vmid>-<YYYY_MM_DD-HH_MM_SS>.<ext>`,
//! always in UTC. Everything before the timestamp is the per-machine prefix
//! that pruning globs on.

use crate::backup::proxmox::{MachineInfo, MachineKind};
use chrono::{DateTime, NaiveDateTime, Utc};

static TIME_FORMAT: &str = "%Y_%m_%d-%H_%M_%S";
static JOB_TAG_PREFIX: &str = "pve-borg";

/// Replaces every whitespace character with `_`.
pub fn normalize_whitespace(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Prefix shared by every archive of `machine`. An empty `host_prefix` yields
/// a prefix that starts directly with the kind tag.
pub fn archive_prefix(host_prefix: &str, machine: &MachineInfo) -> String {
    let mut prefix = String::new();
    if !host_prefix.is_empty() {
        prefix.push_str(host_prefix);
        prefix.push('-');
    }
    prefix.push_str(&format!("{}-{}-", machine.kind.tag(), machine.vmid));
    prefix
}

pub fn archive_name(prefix: &str, dt: DateTime<Utc>, extension: &str) -> String {
    let mut name = format!("{prefix}{}", dt.format(TIME_FORMAT));
    if !extension.is_empty() {
        name.push('.');
        name.push_str(extension);
    }
    name
}

/// Tag passed to `vzdump --job-id` so a running dump can be traced back to the
/// job and guest that started it.
pub fn job_tag(job_name: &str, machine: &MachineInfo) -> String {
    format!(
        "{JOB_TAG_PREFIX}-{}-vmid_{}-id_{}-job_{}",
        machine.kind.tag(),
        machine.vmid,
        normalize_whitespace(&machine.id),
        normalize_whitespace(job_name)
    )
}

/// Parts recovered from a generated archive name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedArchiveName {
    pub host_prefix: Option<String>,
    pub kind: MachineKind,
    pub vmid: u64,
    pub date_time: DateTime<Utc>,
}

impl ParsedArchiveName {
    pub fn parse(name: &str) -> Option<Self> {
        let (stem, extension) = name.rsplit_once('.')?;
        let mut parts = stem.rsplitn(5, '-');
        let time = parts.next()?;
        let date = parts.next()?;
        let vmid = parts.next()?.parse::<u64>().ok()?;
        let kind = MachineKind::from_tag(parts.next()?)?;
        if kind.archive_extension() != extension {
            return None;
        }
        let host_prefix = parts.next().map(str::to_owned);
        let date_time =
            NaiveDateTime::parse_from_str(&format!("{date}-{time}"), TIME_FORMAT).ok()?;

        Some(Self {
            host_prefix,
            kind,
            vmid,
            date_time: date_time.and_utc(),
        })
    }
}
