use crate::backup::result_error::error::Error;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one job. Ids are VMIDs; ordered containers keep reports and
/// notifications stable.
#[derive(Debug, Default)]
pub struct JobResult {
    /// Set when a pool could not be resolved; nothing else ran
    pub resolution_error: Option<Error>,
    /// Ids of pool members that are neither VMs nor containers
    pub skipped_members: Vec<String>,
    pub succeeded_backups: BTreeSet<u64>,
    pub failed_backups: BTreeMap<u64, Error>,
    pub succeeded_prunes: BTreeSet<u64>,
    pub failed_prunes: BTreeMap<u64, Error>,
    /// Set when the repository compaction after the prune pass failed
    pub compact_error: Option<Error>,
}

impl JobResult {
    pub fn resolution_failed(error: Error) -> Self {
        Self {
            resolution_error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.resolution_error.is_none()
            && self.failed_backups.is_empty()
            && self.failed_prunes.is_empty()
            && self.compact_error.is_none()
    }
}

/// True when every job in `results` ended without any recorded error.
pub fn all_succeeded<'a, I: IntoIterator<Item = &'a JobResult>>(results: I) -> bool {
    results.into_iter().all(JobResult::is_success)
}
