//! Notices sent after a machine or after a whole phase of a job.

use crate::backup::notifications::{NotificationTarget, Notice, Outcome};
use crate::backup::proxmox::MachineInfo;
use crate::backup::result_error::error::Error;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

static TAG_SUCCESS: &str = "white_check_mark";
static TAG_INCOMPLETE: &str = "warning";
static TAG_FAILURE: &str = "rotating_light";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Backup,
    Prune,
}

impl Phase {
    fn title(&self) -> &'static str {
        match self {
            Phase::Backup => "Backup",
            Phase::Prune => "Prune",
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Phase::Backup => "backup",
            Phase::Prune => "prune",
        }
    }
}

fn machine_display(machine: &MachineInfo) -> String {
    if machine.name.is_empty() {
        format!("{} VMID {}", machine.kind.label(), machine.vmid)
    } else {
        format!("{} VMID {} ({})", machine.kind.label(), machine.vmid, machine.name)
    }
}

fn error_text(error: &Error) -> String {
    indent::indent_with("  ", error.to_string())
}

/// Notice for a single machine's attempt in `phase`.
pub fn machine_notice(
    phase: Phase,
    target: &NotificationTarget,
    job_name: &str,
    machine: &MachineInfo,
    result: Result<(), &Error>,
) -> Notice {
    let subject = match phase {
        Phase::Backup => format!("{} backup", machine.kind.label()),
        Phase::Prune => "Archive prune".to_owned(),
    };
    let (outcome, title, body, tag) = match result {
        Ok(()) => (
            Outcome::Success,
            format!("{subject} completed!"),
            format!(
                "{} in job {job_name:?}: {} completed!",
                machine_display(machine),
                phase.title()
            ),
            TAG_SUCCESS,
        ),
        Err(e) => (
            Outcome::Failure,
            format!("{subject} failed!"),
            format!(
                "{} in job {job_name:?}: {} failed!\n{}",
                machine_display(machine),
                phase.title(),
                error_text(e)
            ),
            TAG_FAILURE,
        ),
    };
    Notice {
        outcome,
        priority: target.priority(outcome),
        title,
        body,
        tags: vec![tag, phase.tag()],
    }
}

/// Summary notice of a whole phase, `None` when no machine reached it.
///
/// Mixed results are reported as incomplete at the higher of the target's two
/// priorities.
pub fn job_notice(
    phase: Phase,
    target: &NotificationTarget,
    job_name: &str,
    succeeded: &BTreeSet<u64>,
    failed: &BTreeMap<u64, Error>,
) -> Option<Notice> {
    let lower = phase.tag();
    let failed_list = || {
        failed.iter().fold(String::new(), |mut s, (vmid, e)| {
            let _ = writeln!(s, "- {vmid} ({})", error_text(e));
            s
        })
    };

    let notice = match (succeeded.is_empty(), failed.is_empty()) {
        (true, true) => return None,
        (false, false) => {
            let mut body =
                format!("Job {job_name:?}: some VM/LXC {lower} jobs failed!\nSucceeded:\n");
            for vmid in succeeded {
                let _ = writeln!(body, "- {vmid}");
            }
            body.push_str("\nFailed:\n");
            body.push_str(&failed_list());
            Notice {
                outcome: Outcome::Failure,
                priority: target.incomplete_priority(),
                title: format!("{} Job incomplete!", phase.title()),
                body,
                tags: vec![TAG_INCOMPLETE, lower],
            }
        }
        (true, false) => Notice {
            outcome: Outcome::Failure,
            priority: target.priority(Outcome::Failure),
            title: format!("{} Job failed!", phase.title()),
            body: format!(
                "Job {job_name:?}: all VM/LXC {lower} jobs failed!\n\n{}",
                failed_list()
            ),
            tags: vec![TAG_FAILURE, lower],
        },
        (false, true) => Notice {
            outcome: Outcome::Success,
            priority: target.priority(Outcome::Success),
            title: format!("{} Job completed!", phase.title()),
            body: format!("Job {job_name:?}: all VM/LXC {lower} jobs succeeded!"),
            tags: vec![TAG_SUCCESS, lower],
        },
    };
    Some(notice)
}
