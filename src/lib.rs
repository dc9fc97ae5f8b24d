//! # pve_borg
//!
//! Scheduled backups of Proxmox VE guests straight into a borg repository.
//!
//! ## Features
//!
//! - **Pool Selection**: Jobs pick their VMs and containers by Proxmox pool
//! - **Streaming Backups**: `vzdump --stdout` is piped into `borg create`, nothing is staged on disk
//! - **Retention Management**: Per-guest `borg prune` with optional `borg compact`
//! - **Notifications**: ntfy push notifications per machine or per job, with priority escalation
//! - **Partial Failure Isolation**: A failing guest never stops the rest of the job
//!
//! ## Quick Start
//!
//! ```no_run
//! use pve_borg::backup::command::SystemCommandRunner;
//! use pve_borg::backup::job::config::BackupJobsConfig;
//! use pve_borg::backup::job::runner::JobRunner;
//! use pve_borg::backup::notifications::ntfy::NtfySink;
//!
//! let config = BackupJobsConfig::from_yaml_file("config.yml")?;
//! config.validate_all()?;
//!
//! let runner = JobRunner::new(SystemCommandRunner, NtfySink::default());
//! let results = runner.run_all(&config);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
