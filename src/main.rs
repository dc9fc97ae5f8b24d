use clap::Parser;
use pve_borg::backup::command::SystemCommandRunner;
use pve_borg::backup::job::config::BackupJobsConfig;
use pve_borg::backup::job::result::all_succeeded;
use pve_borg::backup::job::runner::JobRunner;
use pve_borg::backup::notifications::ntfy::NtfySink;
use pve_borg::backup::result_error::error::Error;
use pve_borg::backup::result_error::result::Result;
use pve_borg::backup::{borg, proxmox};
use std::path::{Path, PathBuf};
use std::process::exit;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Back up Proxmox VE guests into borg, prune old archives and notify
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long, required_unless_present = "print_sample_config")]
    config: Option<PathBuf>,

    /// Print a sample config file to stdout and exit
    #[arg(long)]
    print_sample_config: bool,

    /// Do not check the installed pve-manager and borg versions
    #[arg(long)]
    skip_version_check: bool,
}

fn print_sample_config() -> Result<()> {
    let yaml = serde_yml::to_string(&BackupJobsConfig::sample())?;
    print!("{yaml}");
    Ok(())
}

fn run(args: &Args, config_path: &Path) -> Result<bool> {
    let config = BackupJobsConfig::from_yaml_file(config_path)?;
    config.validate_all()?;

    if !args.skip_version_check {
        let pve = proxmox::check_version(&SystemCommandRunner)?;
        let borg = borg::check_version(&SystemCommandRunner)?;
        info!("Found pve-manager {pve} and borg {borg}");
    }

    let runner = JobRunner::new(SystemCommandRunner, NtfySink::default());
    let results = runner.run_all(&config);
    for (name, result) in &results {
        if result.is_success() {
            info!("Job {name:?} succeeded");
        } else {
            error!("Job {name:?} failed");
        }
    }
    Ok(all_succeeded(results.values()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let res = match (&args.config, args.print_sample_config) {
        (_, true) => print_sample_config().map(|_| true),
        (Some(config), false) => run(&args, config),
        (None, false) => Err(Error::from(std::io::Error::other("missing --config"))),
    };

    match res {
        Ok(true) => exit(0),
        Ok(false) => exit(1),
        Err(e) => {
            error!("{e}");
            exit(1)
        }
    }
}
