//! Execution of the external tools (`pvesh`, `vzdump`, `borg`, ...).
//!
//! Everything that spawns a process goes through [`CommandRunner`] so the job
//! pipeline can be driven by a scripted runner in tests.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use itertools::Itertools;
use std::process::{Command, Stdio};

pub trait CommandRunner {
    /// Runs the command to completion with stdout/stderr forwarded to the
    /// operator's console. Any non-zero exit is an error.
    fn run(&self, cmd: &mut Command) -> Result<()>;

    /// Runs the command and returns its captured stdout. Any non-zero exit is
    /// an error.
    fn output(&self, cmd: &mut Command) -> Result<Vec<u8>>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &mut Command) -> Result<()> {
        (**self).run(cmd)
    }

    fn output(&self, cmd: &mut Command) -> Result<Vec<u8>> {
        (**self).output(cmd)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, cmd: &mut Command) -> Result<()> {
        tracing::debug!("Running {}", command_line(cmd));
        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                program: program_name(cmd),
                status,
            })
        }
    }

    fn output(&self, cmd: &mut Command) -> Result<Vec<u8>> {
        tracing::debug!("Running {}", command_line(cmd));
        let output = cmd.stdin(Stdio::null()).stderr(Stdio::inherit()).output()?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(Error::CommandFailed {
                program: program_name(cmd),
                status: output.status,
            })
        }
    }
}

pub fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Program and arguments joined by spaces; environment is never included.
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy())
        .join(" ")
}

/// Argument vector of the command, program first.
pub fn command_argv(cmd: &Command) -> Vec<String> {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect_vec()
}
