use crate::backup::result_error::{AddFunctionName, AddMsg};
use itertools::Itertools;
use std::fmt::Debug;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Http(Box<ureq::Transport>),
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
    #[error("unsupported machine type {kind:?} for {id:?}")]
    UnsupportedMachineType { id: String, kind: String },
    #[error("unimplemented backup mode for {kind}: {mode:?}")]
    UnimplementedMode { kind: &'static str, mode: String },
    #[error("prune is disabled in the borg configuration of {0:?}")]
    PruneDisabled(String),
    #[error("compact is disabled in the borg configuration of {0:?}")]
    CompactDisabled(String),
    #[error("{url} answered with HTTP status {status}")]
    NotificationStatus { url: String, status: u16 },
    #[error("{program} returned a non-parsable version string: {output:?}")]
    UnparsableVersion { program: &'static str, output: String },
    #[error("current {program} version: {found}, minimum version required: {required}")]
    VersionTooOld {
        program: &'static str,
        found: semver::Version,
        required: semver::Version,
    },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{} failed:\n{}", fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithFnName { error: Box<Error>, fn_name: String },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>> AddFunctionName<S> for Error {
    fn add_fn_name(self, fn_name: S) -> Self {
        Error::WithFnName {
            error: Box::new(self),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> AddMsg<S> for Error {
    fn add_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::Status(status, response) => Self::NotificationStatus {
                url: response.get_url().to_owned(),
                status,
            },
            ureq::Error::Transport(transport) => Self::Http(Box::new(transport)),
        }
    }
}

impl Error {
    pub fn lots_of_error(errors: Vec<Error>) -> Self {
        Self::LotsOfError(errors.into_iter().flat_map(Error::into_iter).collect_vec())
    }

    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    /// Walks through message and function-name wrappers down to the error that
    /// actually happened.
    pub fn root(&self) -> &Error {
        match self {
            Error::WithMsg { error, .. } | Error::WithFnName { error, .. } => error.root(),
            e => e,
        }
    }
}
