//! Scripted stand-ins for the external tools and the notification server.

use crate::backup::command::{command_argv, command_line, program_name, CommandRunner};
use crate::backup::notifications::{NotificationRequest, NotificationSink};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::process::Command;

/// Records every command line. `pvesh` answers from the registered pools,
/// other `output` calls from the registered program outputs, and `run`
/// succeeds unless the command line contains a registered failure pattern.
#[derive(Default)]
pub struct ScriptedRunner {
    pools: HashMap<String, String>,
    outputs: HashMap<String, String>,
    failing: Vec<String>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn with_pool(mut self, pool: &str, json: &str) -> Self {
        self.pools.insert(pool.to_owned(), json.to_owned());
        self
    }

    pub fn with_output(mut self, program: &str, output: &str) -> Self {
        self.outputs.insert(program.to_owned(), output.to_owned());
        self
    }

    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_owned());
        self
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// Recorded command lines starting with `start`, e.g. `"borg create"`.
    pub fn commands_starting_with(&self, start: &str) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .filter(|line| line.starts_with(start))
            .cloned()
            .collect()
    }

    fn scripted_failure(cmd: &Command) -> Error {
        Error::Io(std::io::Error::other(format!(
            "scripted failure of {}",
            program_name(cmd)
        )))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &mut Command) -> Result<()> {
        let line = command_line(cmd);
        self.commands.borrow_mut().push(line.clone());
        if self.failing.iter().any(|pattern| line.contains(pattern)) {
            Err(Self::scripted_failure(cmd))
        } else {
            Ok(())
        }
    }

    fn output(&self, cmd: &mut Command) -> Result<Vec<u8>> {
        self.commands.borrow_mut().push(command_line(cmd));
        let argv = command_argv(cmd);
        let answer = if argv[0] == "pvesh" {
            argv.get(2)
                .and_then(|path| path.strip_prefix("/pools/"))
                .and_then(|pool| self.pools.get(pool))
        } else {
            self.outputs.get(&argv[0])
        };
        answer
            .map(|out| out.clone().into_bytes())
            .ok_or_else(|| Self::scripted_failure(cmd))
    }
}

/// Keeps every posted request; optionally fails every post afterwards.
#[derive(Default)]
pub struct RecordingSink {
    requests: RefCell<Vec<NotificationRequest>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.borrow().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn post(&self, request: &NotificationRequest) -> Result<()> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail {
            Err(Error::NotificationStatus {
                url: request.url.clone(),
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

/// JSON body of `pvesh get /pools/<pool>` listing `(type, vmid, name)`
/// members.
pub fn pool_json(members: &[(&str, u64, &str)]) -> String {
    let members: Vec<serde_json::Value> = members
        .iter()
        .map(|(kind, vmid, name)| {
            serde_json::json!({
                "id": format!("{kind}/{vmid}"),
                "type": kind,
                "vmid": vmid,
                "name": name,
                "node": "pve1",
                "status": "running",
            })
        })
        .collect();
    serde_json::json!({ "members": members }).to_string()
}
