//! Scaling sweep: build precondition, then one aggregation per process count.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{Configuration, ConfigurationResult, aggregate_runs};
use crate::config::HarnessConfig;
use crate::error::{BuildError, BuildStep, HarnessError, Result};
use crate::runner::ProcessLauncher;

/// Ordered process counts plus the run count shared by every configuration.
///
/// Order and duplicates are kept as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    configurations: Vec<Configuration>,
    run_count: usize,
}

impl SweepPlan {
    pub fn new(process_counts: Vec<usize>, run_count: usize) -> Result<Self> {
        if process_counts.is_empty() {
            return Err(HarnessError::InvalidConfiguration("no process counts given".to_string()));
        }
        let configurations = process_counts
            .into_iter()
            .map(|count| Configuration::new(count, run_count))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            configurations,
            run_count,
        })
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Self::new(config.process_counts.clone(), config.run_count)
    }

    pub fn process_counts(&self) -> Vec<usize> {
        self.configurations.iter().map(Configuration::process_count).collect()
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }
}

/// Per-process-count results in request order.
///
/// Inserting a count that is already present replaces the earlier entry in its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ConfigurationResult>", into = "Vec<ConfigurationResult>")]
pub struct SweepResult {
    entries: Vec<ConfigurationResult>,
}

impl SweepResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced entry, if any.
    pub fn insert(&mut self, result: ConfigurationResult) -> Option<ConfigurationResult> {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.process_count() == result.process_count())
        {
            Some(slot) => Some(std::mem::replace(slot, result)),
            None => {
                self.entries.push(result);
                None
            }
        }
    }

    pub fn get(&self, process_count: usize) -> Option<&ConfigurationResult> {
        self.entries.iter().find(|entry| entry.process_count() == process_count)
    }

    /// Entries in request order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConfigurationResult> {
        self.entries.iter()
    }

    /// Entries by ascending process count.
    pub fn sorted(&self) -> Vec<&ConfigurationResult> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by_key(|entry| entry.process_count());
        sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_valid_time(&self) -> bool {
        self.entries.iter().any(|entry| entry.avg_time().is_some())
    }
}

impl FromIterator<ConfigurationResult> for SweepResult {
    fn from_iter<I: IntoIterator<Item = ConfigurationResult>>(iter: I) -> Self {
        let mut sweep = SweepResult::new();
        for result in iter {
            sweep.insert(result);
        }
        sweep
    }
}

impl From<Vec<ConfigurationResult>> for SweepResult {
    fn from(entries: Vec<ConfigurationResult>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<SweepResult> for Vec<ConfigurationResult> {
    fn from(sweep: SweepResult) -> Self {
        sweep.entries
    }
}

impl<'a> IntoIterator for &'a SweepResult {
    type Item = &'a ConfigurationResult;
    type IntoIter = std::slice::Iter<'a, ConfigurationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Produces the workload artifact when it is missing.
pub trait ArtifactBuilder {
    fn clean(&mut self) -> std::result::Result<(), BuildError>;
    fn build(&mut self) -> std::result::Result<(), BuildError>;
}

/// Runs external clean/build commands, e.g. `make clean` then `make`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    clean: Vec<String>,
    build: Vec<String>,
}

impl CommandBuilder {
    pub fn new(clean: Vec<String>, build: Vec<String>) -> Self {
        Self { clean, build }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.clean_command.clone(), config.build_command.clone())
    }

    fn run_step(step: BuildStep, argv: &[String]) -> std::result::Result<(), BuildError> {
        let (program, args) = argv.split_first().ok_or(BuildError::MissingCommand { step })?;
        let command = argv.join(" ");
        debug!(%step, %command, "running build collaborator");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| BuildError::Spawn {
                step,
                command: command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(BuildError::Failed { step, command, status });
        }
        Ok(())
    }
}

impl ArtifactBuilder for CommandBuilder {
    fn clean(&mut self) -> std::result::Result<(), BuildError> {
        Self::run_step(BuildStep::Clean, &self.clean)
    }

    fn build(&mut self) -> std::result::Result<(), BuildError> {
        Self::run_step(BuildStep::Build, &self.build)
    }
}

/// Drives the aggregator over a [`SweepPlan`], one configuration at a time.
pub struct ScalingSweep<L, B> {
    executable: PathBuf,
    timeout: Duration,
    launcher: L,
    builder: B,
}

impl<L, B> ScalingSweep<L, B>
where
    L: ProcessLauncher,
    B: ArtifactBuilder,
{
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration, launcher: L, builder: B) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            launcher,
            builder,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Clean and build when the artifact is absent. Any build failure is fatal.
    pub fn ensure_artifact(&mut self) -> std::result::Result<(), BuildError> {
        if self.executable.exists() {
            return Ok(());
        }
        info!(executable = %self.executable.display(), "workload missing, building executable");
        self.builder.clean()?;
        self.builder.build()?;
        if !self.executable.exists() {
            warn!(
                executable = %self.executable.display(),
                "build finished but the workload is still missing; runs will fail"
            );
        }
        Ok(())
    }

    /// Run every configuration of `plan` in order.
    ///
    /// Only a build failure returns `Err`; configurations where every attempt
    /// failed are kept in the result with `successful_runs == 0`.
    pub fn run(&mut self, plan: &SweepPlan) -> std::result::Result<SweepResult, BuildError> {
        self.ensure_artifact()?;

        info!(
            configurations = plan.configurations().len(),
            runs = plan.run_count(),
            "running scaling benchmark"
        );
        let mut results = SweepResult::new();
        for &configuration in plan.configurations() {
            let result = aggregate_runs(&mut self.launcher, &self.executable, configuration, self.timeout);
            if result.is_failed() {
                warn!(
                    processes = result.process_count(),
                    "no successful runs for this configuration"
                );
            }
            if results.insert(result).is_some() {
                debug!(
                    processes = configuration.process_count(),
                    "duplicate process count replaced earlier result"
                );
            }
        }
        Ok(results)
    }
}
