//! Error types for the scaling harness.
//!
//! Per-run failures are not errors here: they are [`RunOutcome`](crate::runner::RunOutcome)
//! variants and never leave the aggregator. Only a failed build aborts a sweep.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// The two build collaborator steps, run in this order when the artifact is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Clean,
    Build,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Clean => f.write_str("clean"),
            BuildStep::Build => f.write_str("build"),
        }
    }
}

/// Fatal failure of the build collaborator. Aborts the sweep before any run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{step} step has no command configured")]
    MissingCommand { step: BuildStep },

    #[error("failed to spawn {step} command `{command}`: {source}")]
    Spawn {
        step: BuildStep,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} command `{command}` exited with {status}")]
    Failed {
        step: BuildStep,
        command: String,
        status: ExitStatus,
    },
}

impl BuildError {
    pub fn step(&self) -> BuildStep {
        match self {
            BuildError::MissingCommand { step }
            | BuildError::Spawn { step, .. }
            | BuildError::Failed { step, .. } => *step,
        }
    }
}

/// Harness-level errors: bad input, unreadable config, or a fatal build.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error(transparent)]
    Build(#[from] BuildError),
}
