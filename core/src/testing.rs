//! Scripted collaborators shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;

use crate::aggregate::ConfigurationResult;
use crate::error::{BuildError, BuildStep};
use crate::runner::{ProcessLauncher, RunOutcome};
use crate::sweep::{ArtifactBuilder, SweepResult};

pub(crate) fn success(elapsed_secs: f64) -> RunOutcome {
    RunOutcome::Success { elapsed_secs }
}

pub(crate) fn timeout() -> RunOutcome {
    RunOutcome::Timeout {
        limit: Duration::from_secs(300),
    }
}

pub(crate) fn failure(stderr: &str) -> RunOutcome {
    RunOutcome::ProcessFailure {
        exit_code: Some(1),
        stderr: stderr.to_string(),
    }
}

/// Replays fixed outcomes per worker count, in order. Unscripted calls become
/// launch errors so a test never hangs on a missing entry.
#[derive(Debug, Default)]
pub(crate) struct ScriptedLauncher {
    script: HashMap<usize, VecDeque<RunOutcome>>,
    calls: Vec<usize>,
}

impl ScriptedLauncher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, workers: usize, outcomes: impl IntoIterator<Item = RunOutcome>) -> Self {
        self.script.entry(workers).or_default().extend(outcomes);
        self
    }

    pub(crate) fn calls(&self) -> &[usize] {
        &self.calls
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(&mut self, _executable: &Path, workers: usize, _timeout: Duration) -> RunOutcome {
        self.calls.push(workers);
        self.script
            .get_mut(&workers)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| RunOutcome::LaunchError {
                cause: format!("no scripted outcome for {} workers", workers),
            })
    }
}

/// Records build steps; optionally fails one of them.
#[derive(Debug, Default)]
pub(crate) struct RecordingBuilder {
    steps: Vec<BuildStep>,
    fail_on: Option<BuildStep>,
}

impl RecordingBuilder {
    pub(crate) fn failing_on(step: BuildStep) -> Self {
        Self {
            steps: Vec::new(),
            fail_on: Some(step),
        }
    }

    pub(crate) fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    fn step(&mut self, step: BuildStep) -> Result<(), BuildError> {
        self.steps.push(step);
        if self.fail_on == Some(step) {
            return Err(BuildError::MissingCommand { step });
        }
        Ok(())
    }
}

impl ArtifactBuilder for RecordingBuilder {
    fn clean(&mut self) -> Result<(), BuildError> {
        self.step(BuildStep::Clean)
    }

    fn build(&mut self) -> Result<(), BuildError> {
        self.step(BuildStep::Build)
    }
}

/// Sweep result from `(process_count, raw_times)` pairs, in the given order.
pub(crate) fn sweep_of(entries: &[(usize, &[f64])]) -> SweepResult {
    entries
        .iter()
        .map(|(count, times)| ConfigurationResult::from_times(*count, times.to_vec()))
        .collect()
}
