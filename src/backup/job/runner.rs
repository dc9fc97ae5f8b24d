use crate::backup::borg::{CreateArchiveSettings, ARCHIVE_COMPRESSION};
use crate::backup::command::CommandRunner;
use crate::backup::function_path;
use crate::backup::job::config::{BackupJobsConfig, BackupMode, JobConfig};
use crate::backup::job::report::{job_notice, machine_notice, Phase};
use crate::backup::job::result::JobResult;
use crate::backup::naming::{archive_name, archive_prefix, job_tag};
use crate::backup::notifications::{Frequency, NotificationSink, NotificationTarget, Notifier};
use crate::backup::proxmox::{
    image_dump_command, machines_by_pool, ImageDumpSettings, MachineInfo, MachineKind,
};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use chrono::{DateTime, Utc};
use function_name::named;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Guests selected by a job, keyed and ordered by VMID
pub type MachineSet = BTreeMap<u64, MachineInfo>;

/// Guests selected by a job, and the pool members left out of it.
#[derive(Debug, Default)]
pub struct Resolution {
    pub machines: MachineSet,
    /// Ids of unsupported members, each listed once, in first-seen order
    pub skipped: Vec<String>,
}

/// Runs backup jobs one after another, and the machines of a job one after
/// another.
pub struct JobRunner<R: CommandRunner, N: NotificationSink> {
    runner: R,
    sink: N,
    hostname: OnceLock<String>,
    clock: Box<dyn Fn() -> DateTime<Utc>>,
}

impl<R: CommandRunner, N: NotificationSink> JobRunner<R, N> {
    pub fn new(runner: R, sink: N) -> Self {
        Self {
            runner,
            sink,
            hostname: OnceLock::new(),
            clock: Box::new(Utc::now),
        }
    }

    /// Uses `hostname` instead of asking the system for it.
    pub fn with_hostname<S: Into<String>>(self, hostname: S) -> Self {
        Self {
            hostname: OnceLock::from(hostname.into()),
            ..self
        }
    }

    pub fn with_clock<F: Fn() -> DateTime<Utc> + 'static>(self, clock: F) -> Self {
        Self {
            clock: Box::new(clock),
            ..self
        }
    }

    /// Local hostname, looked up on first use and kept for the lifetime of
    /// the runner.
    pub fn hostname(&self) -> &str {
        self.hostname.get_or_init(|| {
            sysinfo::System::host_name().unwrap_or_else(|| {
                warn!("Cannot determine the local hostname, archive names will have no host prefix");
                String::new()
            })
        })
    }

    pub fn archive_prefix(&self, job: &JobConfig, machine: &MachineInfo) -> String {
        if job.archive_prefix.is_empty() {
            archive_prefix(self.hostname(), machine)
        } else {
            archive_prefix(&job.archive_prefix, machine)
        }
    }

    /// Merges the guests of every pool. A VMID listed by several pools keeps
    /// the record of the first pool that lists it. Any pool failure aborts the
    /// whole resolution. Unsupported members are warned about once per id.
    #[named]
    pub fn resolve(&self, job_name: &str, pools: &[String]) -> Result<Resolution> {
        let mut resolution = Resolution::default();

        for pool in pools {
            debug!("Resolving pool {pool:?} of job {job_name:?}");
            let members = machines_by_pool(&self.runner, pool)
                .add_msg(format!(
                    "cannot receive Proxmox machines with pool {pool:?} in backup job {job_name:?}"
                ))
                .add_fn_name(function_path!())?;

            for member in members {
                match MachineInfo::try_from(member) {
                    Ok(machine) => match resolution.machines.entry(machine.vmid) {
                        Entry::Vacant(entry) => {
                            entry.insert(machine);
                        }
                        Entry::Occupied(_) => debug!(
                            "VMID {} of pool {pool:?} already selected by an earlier pool",
                            machine.vmid
                        ),
                    },
                    Err(Error::UnsupportedMachineType { id, kind }) => {
                        if !resolution.skipped.contains(&id) {
                            warn!("Invalid machine type {kind:?} for {id:?}, skipping.");
                            resolution.skipped.push(id);
                        }
                    }
                    Err(e) => warn!("Skipping pool member of {pool:?}: {e}"),
                }
            }
        }

        Ok(resolution)
    }

    /// Backs up one guest with the mode configured for its kind.
    pub fn run_backup(&self, job_name: &str, job: &JobConfig, machine: &MachineInfo) -> Result<()> {
        let mode = match machine.kind {
            MachineKind::Qemu => &job.vm_mode,
            MachineKind::Lxc => &job.container_mode,
        };
        match mode {
            BackupMode::Image => self.run_image_backup(job_name, job, machine),
            BackupMode::Unimplemented(name) => Err(Error::UnimplementedMode {
                kind: machine.kind.label(),
                mode: name.clone(),
            }),
        }
    }

    /// Streams `vzdump --stdout` straight into `borg create`; borg starts the
    /// dump itself and consumes its output, nothing touches local disk.
    #[named]
    fn run_image_backup(&self, job_name: &str, job: &JobConfig, machine: &MachineInfo) -> Result<()> {
        let dump_settings = ImageDumpSettings::builder()
            .job_id(job_tag(job_name, machine))
            .build();
        let producer = image_dump_command(machine.vmid, &dump_settings);

        let prefix = self.archive_prefix(job, machine);
        let name = archive_name(&prefix, (self.clock)(), machine.kind.archive_extension());
        let create_settings = CreateArchiveSettings::builder()
            .compression(ARCHIVE_COMPRESSION)
            .comment(format!(
                "{} {} ({}) on {:?}, job {job_name:?}",
                machine.kind.label(),
                machine.vmid,
                machine.name,
                machine.node
            ))
            .extra_args(vec!["--progress".to_owned()])
            .build();
        let mut cmd = job
            .borg
            .create_archive_command(&name, &create_settings, &producer);

        info!(
            "Now backing up {} {} ({}) into {}",
            machine.kind.label(),
            machine.name,
            machine.vmid,
            name
        );
        self.runner
            .run(&mut cmd)
            .add_msg(format!("Backup of VMID {} into archive {name} failed", machine.vmid))
            .add_fn_name(function_path!())
    }

    /// Prunes the archives of one guest, leaving every other guest's archives
    /// alone.
    #[named]
    pub fn run_prune(&self, job: &JobConfig, machine: &MachineInfo) -> Result<()> {
        let prefix = self.archive_prefix(job, machine);
        let mut cmd = job.borg.prune_command(&prefix).add_fn_name(function_path!())?;

        info!(
            "Now pruning archives of {} {} ({})",
            machine.kind.label(),
            machine.name,
            machine.vmid
        );
        self.runner
            .run(&mut cmd)
            .add_msg(format!("Prune of archives {prefix}* failed"))
            .add_fn_name(function_path!())
    }

    fn notify_machine(
        &self,
        notifier: &Notifier<'_, N>,
        phase: Phase,
        target: &NotificationTarget,
        job_name: &str,
        machine: &MachineInfo,
        result: &Result<()>,
    ) {
        if target.frequency == Frequency::PerMachine {
            let notice = machine_notice(phase, target, job_name, machine, result.as_ref().copied());
            notifier.send(target, &notice);
        }
    }

    pub fn run_job(&self, job_name: &str, job: &JobConfig) -> JobResult {
        info!("Starting backup job {job_name:?}");
        debug!("Job {job_name:?}: resolving {} pools", job.pools.len());

        let Resolution { machines, skipped } = match self.resolve(job_name, &job.pools) {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("Backup job {job_name:?} aborted:\n{e}");
                return JobResult::resolution_failed(e);
            }
        };

        let notifier = Notifier::new(&job.notification, &self.sink);
        let mut result = JobResult {
            skipped_members: skipped,
            ..JobResult::default()
        };
        let mut prunable = Vec::with_capacity(machines.len());

        debug!("Job {job_name:?}: backing up {} machines", machines.len());
        for (vmid, machine) in &machines {
            let backup = self.run_backup(job_name, job, machine);
            self.notify_machine(
                &notifier,
                Phase::Backup,
                &job.notification.backup,
                job_name,
                machine,
                &backup,
            );
            match backup {
                Ok(()) => {
                    result.succeeded_backups.insert(*vmid);
                    prunable.push(machine);
                }
                Err(e) => {
                    error!("{e}");
                    result.failed_backups.insert(*vmid, e);
                }
            }
        }

        if job.borg.prune.enabled {
            debug!("Job {job_name:?}: pruning {} machines", prunable.len());
            for machine in prunable {
                let prune = self.run_prune(job, machine);
                self.notify_machine(
                    &notifier,
                    Phase::Prune,
                    &job.notification.prune,
                    job_name,
                    machine,
                    &prune,
                );
                match prune {
                    Ok(()) => {
                        result.succeeded_prunes.insert(machine.vmid);
                    }
                    Err(e) => {
                        error!("{e}");
                        result.failed_prunes.insert(machine.vmid, e);
                    }
                }
            }

            if job.borg.prune.compact && !result.succeeded_prunes.is_empty() {
                if let Err(e) = job.borg.compact(&self.runner) {
                    error!("{e}");
                    result.compact_error = Some(e);
                }
            }
        }

        debug!("Job {job_name:?}: sending job notifications");
        self.notify_job(&notifier, Phase::Backup, &job.notification.backup, job_name, &result);
        self.notify_job(&notifier, Phase::Prune, &job.notification.prune, job_name, &result);

        info!(
            "Finished backup job {job_name:?}: {} backups succeeded, {} failed; {} prunes succeeded, {} failed",
            result.succeeded_backups.len(),
            result.failed_backups.len(),
            result.succeeded_prunes.len(),
            result.failed_prunes.len()
        );
        result
    }

    fn notify_job(
        &self,
        notifier: &Notifier<'_, N>,
        phase: Phase,
        target: &NotificationTarget,
        job_name: &str,
        result: &JobResult,
    ) {
        if target.frequency != Frequency::PerJob {
            return;
        }
        let (succeeded, failed) = match phase {
            Phase::Backup => (&result.succeeded_backups, &result.failed_backups),
            Phase::Prune => (&result.succeeded_prunes, &result.failed_prunes),
        };
        if let Some(notice) = job_notice(phase, target, job_name, succeeded, failed) {
            notifier.send(target, &notice);
        }
    }

    /// Runs every job in name order. A failing job never stops the others.
    pub fn run_all(&self, config: &BackupJobsConfig) -> BTreeMap<String, JobResult> {
        config
            .jobs
            .iter()
            .map(|(name, job)| (name.clone(), self.run_job(name, job)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::borg::{BorgSettings, PruneSettings};
    use crate::backup::notifications::{NotificationConfig, Priority};
    use crate::backup::test_support::{pool_json, RecordingSink, ScriptedRunner};
    use chrono::TimeZone;

    fn job(pools: &[&str]) -> JobConfig {
        JobConfig::builder()
            .pools(pools.iter().map(|p| p.to_string()).collect::<Vec<_>>())
            .borg(BorgSettings::builder().repository("ssh://repo").build())
            .build()
    }

    fn with_prune(mut job: JobConfig) -> JobConfig {
        job.borg.prune = PruneSettings::builder().enabled(true).keep_last(3).build();
        job
    }

    fn with_notification(mut job: JobConfig, backup: NotificationTarget, prune: NotificationTarget) -> JobConfig {
        job.notification = NotificationConfig::builder()
            .server("https://ntfy.example.com")
            .topic("pve")
            .backup(backup)
            .prune(prune)
            .build();
        job
    }

    fn target(frequency: Frequency, success: Priority, failure: Priority) -> NotificationTarget {
        NotificationTarget::builder()
            .frequency(frequency)
            .success_priority(success)
            .failure_priority(failure)
            .build()
    }

    fn job_runner<'a>(
        runner: &'a ScriptedRunner,
        sink: &'a RecordingSink,
    ) -> JobRunner<&'a ScriptedRunner, &'a RecordingSink> {
        JobRunner::new(runner, sink)
            .with_hostname("host")
            .with_clock(|| Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap())
    }

    fn two_pools() -> ScriptedRunner {
        ScriptedRunner::default()
            .with_pool("a", &pool_json(&[("qemu", 102, "db"), ("qemu", 101, "web")]))
            .with_pool("b", &pool_json(&[("qemu", 102, "db-dup"), ("lxc", 200, "dns")]))
    }

    #[test]
    fn test_resolve_deduplicates_first_pool_wins() {
        let runner = two_pools();
        let sink = RecordingSink::default();
        let machines = job_runner(&runner, &sink)
            .resolve("j", &["a".to_owned(), "b".to_owned()])
            .unwrap()
            .machines;

        assert_eq!(machines.keys().copied().collect::<Vec<_>>(), vec![101, 102, 200]);
        assert_eq!(machines[&102].name, "db");

        let machines = job_runner(&runner, &sink)
            .resolve("j", &["b".to_owned(), "a".to_owned()])
            .unwrap()
            .machines;
        assert_eq!(machines.keys().copied().collect::<Vec<_>>(), vec![101, 102, 200]);
        assert_eq!(machines[&102].name, "db-dup");
    }

    const UNSUPPORTED_POOL: &str = r#"{"members": [
        {"id": "storage/pve1/local", "type": "storage", "node": "pve1"},
        {"id": "openvz/300", "type": "openvz", "vmid": 300},
        {"id": "qemu/101", "type": "qemu", "vmid": 101},
        {"id": "storage/pve1/local", "type": "storage", "node": "pve1"}
    ]}"#;

    #[test]
    fn test_resolve_skips_unsupported_members_once_per_id() {
        let runner = ScriptedRunner::default()
            .with_pool("a", UNSUPPORTED_POOL)
            .with_pool("b", UNSUPPORTED_POOL);
        let sink = RecordingSink::default();
        let resolution = job_runner(&runner, &sink)
            .resolve("j", &["a".to_owned(), "b".to_owned()])
            .unwrap();

        assert_eq!(resolution.machines.keys().copied().collect::<Vec<_>>(), vec![101]);
        assert_eq!(resolution.skipped, vec!["storage/pve1/local", "openvz/300"]);
    }

    #[test]
    fn test_skipped_members_reported_again_by_next_job_run() {
        let runner = ScriptedRunner::default()
            .with_pool("a", UNSUPPORTED_POOL)
            .with_pool("b", UNSUPPORTED_POOL);
        let sink = RecordingSink::default();
        let job_runner = job_runner(&runner, &sink);
        let job = job(&["a", "b"]);

        let first = job_runner.run_job("j", &job);
        let second = job_runner.run_job("j", &job);

        assert_eq!(first.skipped_members, vec!["storage/pve1/local", "openvz/300"]);
        assert_eq!(second.skipped_members, first.skipped_members);
        assert_eq!(second.succeeded_backups.iter().copied().collect::<Vec<_>>(), vec![101]);
        assert!(second.is_success());
    }

    #[test]
    fn test_resolution_failure_aborts_job() {
        let runner = ScriptedRunner::default().with_pool("a", &pool_json(&[("qemu", 101, "web")]));
        let sink = RecordingSink::default();
        let job = with_notification(
            with_prune(job(&["a", "missing"])),
            target(Frequency::PerJob, Priority::Default, Priority::High),
            target(Frequency::PerJob, Priority::Default, Priority::High),
        );

        let result = job_runner(&runner, &sink).run_job("j", &job);

        let error = result.resolution_error.as_ref().unwrap().to_string();
        assert!(error.contains("pool \"missing\""));
        assert!(result.succeeded_backups.is_empty());
        assert!(result.failed_backups.is_empty());
        assert!(result.succeeded_prunes.is_empty());
        assert!(result.failed_prunes.is_empty());
        assert!(runner.commands_starting_with("borg").is_empty());
        assert!(sink.requests().is_empty());
    }

    #[test]
    fn test_backups_run_once_in_vmid_order() {
        let runner = two_pools();
        let sink = RecordingSink::default();
        let result = job_runner(&runner, &sink).run_job("nightly", &job(&["a", "b"]));

        let creates = runner.commands_starting_with("borg create");
        assert_eq!(creates.len(), 3);
        assert!(creates[0].contains("-- vzdump 101 "));
        assert!(creates[1].contains("-- vzdump 102 "));
        assert!(creates[2].contains("-- vzdump 200 "));
        assert_eq!(result.succeeded_backups.iter().copied().collect::<Vec<_>>(), vec![101, 102, 200]);
        assert!(result.is_success());
    }

    #[test]
    fn test_backup_command_names_archive_and_tags_dump() {
        let runner = ScriptedRunner::default().with_pool("a", &pool_json(&[("qemu", 101, "web")]));
        let sink = RecordingSink::default();
        job_runner(&runner, &sink).run_job("My Job", &job(&["a"]));

        let create = &runner.commands_starting_with("borg create")[0];
        assert!(create.contains("--stdin-name host-qemu-101-2024_03_05-14_07_09.vma"));
        assert!(create.contains("--compression auto,zlib"));
        assert!(create.contains("--progress --content-from-command"));
        assert!(create.contains("ssh://repo::host-qemu-101-2024_03_05-14_07_09.vma -- vzdump 101"));
        assert!(create.contains("--mode snapshot --compress 0"));
        assert!(create.contains("--job-id pve-borg-qemu-vmid_101-id_qemu/101-job_My_Job"));
    }

    #[test]
    fn test_configured_prefix_overrides_hostname() {
        let runner = ScriptedRunner::default().with_pool("a", &pool_json(&[("lxc", 200, "dns")]));
        let sink = RecordingSink::default();
        let mut job = with_prune(job(&["a"]));
        job.archive_prefix = "pve-east".into();
        job_runner(&runner, &sink).run_job("j", &job);

        assert!(runner.commands_starting_with("borg create")[0]
            .contains("ssh://repo::pve-east-lxc-200-2024_03_05-14_07_09.tar"));
        assert!(runner.commands_starting_with("borg prune")[0]
            .contains("--glob-archives pve-east-lxc-200-* ssh://repo"));
    }

    #[test]
    fn test_failed_backup_is_never_pruned() {
        let runner = two_pools().failing_on("vzdump 102 ");
        let sink = RecordingSink::default();
        let result = job_runner(&runner, &sink).run_job("j", &with_prune(job(&["a", "b"])));

        assert_eq!(result.failed_backups.keys().copied().collect::<Vec<_>>(), vec![102]);
        assert_eq!(result.succeeded_backups.iter().copied().collect::<Vec<_>>(), vec![101, 200]);
        assert_eq!(result.succeeded_prunes, result.succeeded_backups);
        assert!(result
            .succeeded_prunes
            .iter()
            .chain(result.failed_prunes.keys())
            .all(|vmid| result.succeeded_backups.contains(vmid)));

        let prunes = runner.commands_starting_with("borg prune");
        assert_eq!(prunes.len(), 2);
        assert!(prunes[0].contains("host-qemu-101-*"));
        assert!(prunes[1].contains("host-lxc-200-*"));
        assert!(!result.is_success());
    }

    #[test]
    fn test_prune_runs_after_all_backups() {
        let runner = two_pools();
        let sink = RecordingSink::default();
        job_runner(&runner, &sink).run_job("j", &with_prune(job(&["a", "b"])));

        let lines = runner.command_lines();
        let last_create = lines.iter().rposition(|l| l.starts_with("borg create")).unwrap();
        let first_prune = lines.iter().position(|l| l.starts_with("borg prune")).unwrap();
        assert!(last_create < first_prune);
    }

    #[test]
    fn test_prune_disabled_skips_prune_pass() {
        let runner = two_pools();
        let sink = RecordingSink::default();
        let result = job_runner(&runner, &sink).run_job("j", &job(&["a", "b"]));

        assert!(runner.commands_starting_with("borg prune").is_empty());
        assert!(result.succeeded_prunes.is_empty());
        assert!(result.failed_prunes.is_empty());
    }

    #[test]
    fn test_failed_prune_is_isolated() {
        let runner = two_pools().failing_on("host-qemu-101-*");
        let sink = RecordingSink::default();
        let result = job_runner(&runner, &sink).run_job("j", &with_prune(job(&["a", "b"])));

        assert_eq!(result.failed_prunes.keys().copied().collect::<Vec<_>>(), vec![101]);
        assert_eq!(result.succeeded_prunes.iter().copied().collect::<Vec<_>>(), vec![102, 200]);
        assert_eq!(result.succeeded_backups.len(), 3);
    }

    #[test]
    fn test_compact_runs_once_and_failure_keeps_prune_results() {
        let runner = two_pools().failing_on("borg compact");
        let sink = RecordingSink::default();
        let mut job = with_prune(job(&["a", "b"]));
        job.borg.prune.compact = true;
        let result = job_runner(&runner, &sink).run_job("j", &job);

        assert_eq!(runner.commands_starting_with("borg compact"), vec!["borg compact ssh://repo"]);
        assert_eq!(result.succeeded_prunes.len(), 3);
        assert!(result.compact_error.is_some());
        assert!(!result.is_success());
        assert_eq!(runner.command_lines().last().unwrap(), "borg compact ssh://repo");
    }

    #[test]
    fn test_unimplemented_mode_fails_only_that_kind() {
        let runner = two_pools();
        let sink = RecordingSink::default();
        let mut job = with_prune(job(&["a", "b"]));
        job.container_mode = BackupMode::Unimplemented("files".into());
        let result = job_runner(&runner, &sink).run_job("j", &job);

        assert!(matches!(
            result.failed_backups[&200],
            Error::UnimplementedMode { kind: "LXC", .. }
        ));
        assert_eq!(result.succeeded_backups.iter().copied().collect::<Vec<_>>(), vec![101, 102]);
        assert!(!runner.command_lines().iter().any(|l| l.contains("vzdump 200")));
    }

    #[test]
    fn test_incomplete_job_sends_one_escalated_notification() {
        let runner = ScriptedRunner::default()
            .with_pool("a", &pool_json(&[("qemu", 101, "web"), ("lxc", 200, "dns")]))
            .failing_on("vzdump 200 ");
        let sink = RecordingSink::default();
        let job = with_notification(
            job(&["a"]),
            target(Frequency::PerJob, Priority::Default, Priority::High),
            target(Frequency::PerJob, Priority::Default, Priority::High),
        );
        let result = job_runner(&runner, &sink).run_job("nightly", &job);

        assert_eq!(result.succeeded_backups.len(), 1);
        assert_eq!(result.failed_backups.len(), 1);
        let requests = sink.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].priority, Priority::High);
        assert_eq!(requests[0].title, "Backup Job incomplete!");
        assert_eq!(requests[0].url, "https://ntfy.example.com/pve");
        assert!(requests[0].body.contains("Succeeded:\n- 101\n"));
        assert!(requests[0].body.contains("- 200 ("));
        assert!(requests[0].body.contains("Backup of VMID 200 into archive"));
    }

    #[test]
    fn test_disabled_failure_priority_never_posts() {
        let runner = ScriptedRunner::default()
            .with_pool("a", &pool_json(&[("qemu", 101, "web")]))
            .failing_on("vzdump 101 ");
        let sink = RecordingSink::default();
        let job = with_notification(
            job(&["a"]),
            target(Frequency::PerMachine, Priority::Default, Priority::Disabled),
            target(Frequency::Never, Priority::Default, Priority::High),
        );
        let result = job_runner(&runner, &sink).run_job("j", &job);

        assert!(result.failed_backups.contains_key(&101));
        assert!(sink.requests().is_empty());

        let job = with_notification(
            job.clone(),
            target(Frequency::PerJob, Priority::Default, Priority::Disabled),
            target(Frequency::Never, Priority::Default, Priority::High),
        );
        job_runner(&runner, &sink).run_job("j", &job);
        assert!(sink.requests().is_empty());
    }

    #[test]
    fn test_per_machine_notifications_follow_each_attempt() {
        let runner = two_pools().failing_on("host-lxc-200-*");
        let sink = RecordingSink::default();
        let job = with_notification(
            with_prune(job(&["a", "b"])),
            target(Frequency::PerMachine, Priority::Low, Priority::High),
            target(Frequency::PerMachine, Priority::Min, Priority::Urgent),
        );
        job_runner(&runner, &sink).run_job("j", &job);

        let requests = sink.requests();
        let titles: Vec<_> = requests.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "VM backup completed!",
                "VM backup completed!",
                "LXC backup completed!",
                "Archive prune completed!",
                "Archive prune completed!",
                "Archive prune failed!",
            ]
        );
        assert_eq!(requests[0].priority, Priority::Low);
        assert_eq!(requests[3].priority, Priority::Min);
        assert_eq!(requests[5].priority, Priority::Urgent);
    }

    #[test]
    fn test_notification_failure_never_fails_job() {
        let runner = two_pools();
        let sink = RecordingSink::failing();
        let job = with_notification(
            job(&["a", "b"]),
            target(Frequency::PerMachine, Priority::Default, Priority::High),
            target(Frequency::Never, Priority::Default, Priority::High),
        );
        let result = job_runner(&runner, &sink).run_job("j", &job);

        assert_eq!(sink.requests().len(), 3);
        assert!(result.is_success());
    }

    #[test]
    fn test_run_all_keeps_jobs_independent() {
        let runner = two_pools();
        let sink = RecordingSink::default();
        let config = BackupJobsConfig {
            jobs: BTreeMap::from([
                ("broken".to_owned(), job(&["missing"])),
                ("fine".to_owned(), job(&["a"])),
            ]),
        };
        let results = job_runner(&runner, &sink).run_all(&config);

        assert_eq!(results.len(), 2);
        assert!(results["broken"].resolution_error.is_some());
        assert!(results["fine"].resolution_error.is_none());
        assert_eq!(results["fine"].succeeded_backups.len(), 2);
        assert!(!crate::backup::job::result::all_succeeded(results.values()));
    }

    #[test]
    fn test_hostname_resolved_once() {
        let runner = ScriptedRunner::default();
        let sink = RecordingSink::default();
        let job_runner = JobRunner::new(&runner, &sink);
        let first = job_runner.hostname().as_ptr();
        let second = job_runner.hostname().as_ptr();
        assert_eq!(first, second);
    }
}
