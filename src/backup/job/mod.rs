//! The job pipeline: resolve the guests of a job's pools, back each one up
//! into borg, prune the archives of the ones that succeeded and report.

pub mod config;
pub mod report;
pub mod result;
pub mod runner;
