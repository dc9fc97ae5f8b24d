//! Proxmox VE side: pool inventory (`pvesh`), image dumps (`vzdump`) and the
//! `pveversion` probe.

use crate::backup::command::CommandRunner;
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use crate::backup::version::{require_minimum, VersionPattern};
use bon::Builder;
use function_name::named;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::process::Command;

pub const MINIMUM_PVE_VERSION: semver::Version = semver::Version::new(8, 0, 0);

/// Kind of guest a backup can be taken of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    /// QEMU virtual machine
    Qemu,
    /// LXC container
    Lxc,
}

impl MachineKind {
    /// Tag used by the Proxmox API and inside archive names.
    pub fn tag(&self) -> &'static str {
        match self {
            MachineKind::Qemu => "qemu",
            MachineKind::Lxc => "lxc",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "qemu" => Some(MachineKind::Qemu),
            "lxc" => Some(MachineKind::Lxc),
            _ => None,
        }
    }

    /// Human readable label for logs and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            MachineKind::Qemu => "VM",
            MachineKind::Lxc => "LXC",
        }
    }

    /// Extension of the stream vzdump writes for this kind.
    pub fn archive_extension(&self) -> &'static str {
        match self {
            MachineKind::Qemu => "vma",
            MachineKind::Lxc => "tar",
        }
    }
}

impl Display for MachineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Running,
    Stopped,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry of the `members` array of `pvesh get /pools/<pool>`.
///
/// Pools can also hold storages, so the type tag stays a plain string here and
/// is only narrowed when converting into [`MachineInfo`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolMember {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub vmid: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub status: MachineStatus,
}

#[derive(Clone, Debug, Deserialize)]
struct PoolInfo {
    #[serde(default)]
    members: Vec<PoolMember>,
}

/// Snapshot of a guest as reported by the inventory.
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
pub struct MachineInfo {
    #[builder(into)]
    pub id: String,
    pub kind: MachineKind,
    pub vmid: u64,
    #[builder(into, default)]
    pub name: String,
    #[builder(into, default)]
    pub node: String,
    #[builder(default)]
    pub status: MachineStatus,
}

impl TryFrom<PoolMember> for MachineInfo {
    type Error = Error;

    fn try_from(member: PoolMember) -> Result<Self> {
        let unsupported = |member: &PoolMember| Error::UnsupportedMachineType {
            id: member.id.clone(),
            kind: member.kind.clone(),
        };
        let kind = MachineKind::from_tag(&member.kind).ok_or_else(|| unsupported(&member))?;
        let vmid = member.vmid.ok_or_else(|| unsupported(&member))?;
        Ok(MachineInfo {
            id: member.id,
            kind,
            vmid,
            name: member.name.unwrap_or_default(),
            node: member.node.unwrap_or_default(),
            status: member.status,
        })
    }
}

#[named]
pub fn machines_by_pool<R: CommandRunner>(runner: &R, pool: &str) -> Result<Vec<PoolMember>> {
    let mut cmd = Command::new("pvesh");
    cmd.args(["get", &format!("/pools/{pool}"), "--output-format=json"]);
    let output = runner
        .output(&mut cmd)
        .add_msg("pvesh returned an error")
        .add_fn_name(function_path!())?;
    serde_json::from_slice::<PoolInfo>(&output)
        .map(|info| info.members)
        .map_err(Error::from)
        .add_msg("json decoding of pvesh data returned an error")
        .add_fn_name(function_path!())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpMode {
    #[default]
    Snapshot,
    Suspend,
    Stop,
}

impl DumpMode {
    fn as_arg(&self) -> &'static str {
        match self {
            DumpMode::Snapshot => "snapshot",
            DumpMode::Suspend => "suspend",
            DumpMode::Stop => "stop",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpCompression {
    /// Raw stream, the archive tool compresses
    #[default]
    None,
    Gzip,
    Lzo,
    Zstd,
}

impl DumpCompression {
    fn as_arg(&self) -> &'static str {
        match self {
            DumpCompression::None => "0",
            DumpCompression::Gzip => "gzip",
            DumpCompression::Lzo => "lzo",
            DumpCompression::Zstd => "zstd",
        }
    }
}

/// Options of a `vzdump --stdout` producer.
#[derive(Clone, Debug, Default, Builder)]
pub struct ImageDumpSettings {
    #[builder(default)]
    pub compression: DumpCompression,
    #[builder(default)]
    pub mode: DumpMode,
    #[builder(into)]
    pub job_id: Option<String>,
    #[builder(default, into)]
    pub extra_args: Vec<String>,
}

/// Builds the producer process whose stdout is the guest's image stream.
pub fn image_dump_command(vmid: u64, settings: &ImageDumpSettings) -> Command {
    let mut cmd = Command::new("vzdump");
    cmd.arg(vmid.to_string())
        .args(["--stdout", "--quiet"])
        .args(["--mode", settings.mode.as_arg()])
        .args(["--compress", settings.compression.as_arg()]);
    if let Some(job_id) = &settings.job_id {
        cmd.args(["--job-id", job_id]);
    }
    cmd.args(&settings.extra_args);
    cmd
}

#[named]
pub fn check_version<R: CommandRunner>(runner: &R) -> Result<semver::Version> {
    let output = runner
        .output(&mut Command::new("pveversion"))
        .add_fn_name(function_path!())?;
    let output = String::from_utf8_lossy(&output);
    let pattern = VersionPattern::pve();
    let found = pattern.parse(&output)?;
    require_minimum(pattern.program(), found, MINIMUM_PVE_VERSION)
}
