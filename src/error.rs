//! Error taxonomy.
//!
//! Each stage of a run has its own error type. [`AppError`] gathers them and
//! decides the process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Reference table or target list could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path} line {line}: '{column}' is empty")]
    EmptyField {
        path: PathBuf,
        line: u64,
        column: String,
    },
}

/// Session with the directory could not be established.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {code}: {description}")]
    Denied { code: String, description: String },
    #[error("device login expired before it was completed")]
    Expired,
    #[error("session cache: {0}")]
    Cache(String),
}

/// Operator input that cannot be turned into a selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("'{0}' is not a number")]
    Invalid(String),
    #[error("{value} is out of range (1-{max})")]
    OutOfRange { value: usize, max: usize },
    #[error("cannot read a plan identifier from '{0}'")]
    MalformedPlan(String),
    #[error("no reference entry named '{0}'")]
    Unmapped(String),
    #[error("no valid answer after {0} attempts")]
    Exhausted(usize),
    #[error("input closed")]
    EndOfInput,
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),
}

/// A group name did not resolve to exactly one group.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("no group named '{0}'")]
    NoMatch(String),
    #[error("{count} groups are named '{name}'")]
    Ambiguous { name: String, count: usize },
    #[error("none of the groups in {0} could be resolved")]
    NothingResolved(PathBuf),
}

/// A directory call failed.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{}: {0}", crate::constants::ERR_NETWORK_REQUEST_FAILED)]
    Http(#[from] reqwest::Error),
    #[error("{status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("{}: {0}", crate::constants::ERR_INVALID_RESPONSE)]
    Decode(#[from] serde_json::Error),
}

/// Any failure that ends a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("cannot connect to the directory: {0}")]
    Connection(#[from] ConnectionError),
    #[error("invalid selection: {0}")]
    Selection(#[from] SelectionError),
    #[error("{0}")]
    NotFound(#[from] NotFoundError),
    #[error("directory query failed: {0}")]
    Directory(#[from] DirectoryError),
    #[error("{}", crate::constants::MSG_NOTHING_SELECTED)]
    NothingSelected,
    #[error("{}", crate::constants::MSG_DECLINED)]
    Declined,
}

impl AppError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Load(_) => 2,
            Self::Connection(_) => 3,
            Self::Selection(_) => 4,
            Self::NotFound(_) => 5,
            Self::Directory(_) => 6,
            Self::NothingSelected => 7,
            Self::Declined => 8,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
