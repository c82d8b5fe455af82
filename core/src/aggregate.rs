//! Repeated runs of one configuration reduced to timing statistics.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HarnessError, Result};
use crate::runner::{ProcessLauncher, RunOutcome};

/// One sweep point: how many workers, and how many attempts at that count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    process_count: usize,
    run_count: usize,
}

impl Configuration {
    pub fn new(process_count: usize, run_count: usize) -> Result<Self> {
        if process_count == 0 {
            return Err(HarnessError::InvalidConfiguration("process count must be positive".to_string()));
        }
        if run_count == 0 {
            return Err(HarnessError::InvalidConfiguration("run count must be positive".to_string()));
        }
        Ok(Self {
            process_count,
            run_count,
        })
    }

    pub fn process_count(&self) -> usize {
        self.process_count
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }
}

/// Failed attempts by kind. Diagnostic only; never feeds the statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureTally {
    pub timeouts: usize,
    pub process_failures: usize,
    pub launch_errors: usize,
}

impl FailureTally {
    pub fn record(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Success { .. } => {}
            RunOutcome::Timeout { .. } => self.timeouts += 1,
            RunOutcome::ProcessFailure { .. } => self.process_failures += 1,
            RunOutcome::LaunchError { .. } => self.launch_errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.timeouts + self.process_failures + self.launch_errors
    }
}

/// Statistics for one process count.
///
/// Built only from the list of successful times, so `successful_runs ==
/// raw_times.len()` and the optional fields are present exactly when there is
/// at least one success. Deserializing recomputes everything from `raw_times`
/// and rejects a zero process count or a time that is not a positive number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredConfigurationResult")]
pub struct ConfigurationResult {
    process_count: usize,
    successful_runs: usize,
    avg_time: Option<f64>,
    min_time: Option<f64>,
    max_time: Option<f64>,
    raw_times: Vec<f64>,
    failures: FailureTally,
}

#[derive(Deserialize)]
struct StoredConfigurationResult {
    process_count: usize,
    #[serde(default)]
    raw_times: Vec<f64>,
    #[serde(default)]
    failures: FailureTally,
}

impl TryFrom<StoredConfigurationResult> for ConfigurationResult {
    type Error = String;

    fn try_from(stored: StoredConfigurationResult) -> std::result::Result<Self, Self::Error> {
        if stored.process_count == 0 {
            return Err("process_count must be positive".to_string());
        }
        if let Some(bad) = stored.raw_times.iter().find(|time| !(time.is_finite() && **time > 0.0)) {
            return Err(format!(
                "raw time {} for {} processes is not a positive number of seconds",
                bad, stored.process_count
            ));
        }
        Ok(ConfigurationResult::from_times(stored.process_count, stored.raw_times).with_failures(stored.failures))
    }
}

impl ConfigurationResult {
    pub fn from_times(process_count: usize, raw_times: Vec<f64>) -> Self {
        let (avg_time, min_time, max_time) = match summarize(&raw_times) {
            Some((avg, min, max)) => (Some(avg), Some(min), Some(max)),
            None => (None, None, None),
        };
        Self {
            process_count,
            successful_runs: raw_times.len(),
            avg_time,
            min_time,
            max_time,
            raw_times,
            failures: FailureTally::default(),
        }
    }

    pub fn with_failures(mut self, failures: FailureTally) -> Self {
        self.failures = failures;
        self
    }

    pub fn process_count(&self) -> usize {
        self.process_count
    }

    pub fn successful_runs(&self) -> usize {
        self.successful_runs
    }

    pub fn avg_time(&self) -> Option<f64> {
        self.avg_time
    }

    pub fn min_time(&self) -> Option<f64> {
        self.min_time
    }

    pub fn max_time(&self) -> Option<f64> {
        self.max_time
    }

    pub fn raw_times(&self) -> &[f64] {
        &self.raw_times
    }

    pub fn failures(&self) -> FailureTally {
        self.failures
    }

    pub fn is_failed(&self) -> bool {
        self.successful_runs == 0
    }
}

/// Mean, min and max; `None` for an empty slice.
fn summarize(times: &[f64]) -> Option<(f64, f64, f64)> {
    if times.is_empty() {
        return None;
    }
    let min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    // Rounding in the sum can push the mean a hair outside [min, max].
    Some((mean.clamp(min, max), min, max))
}

/// Run `configuration.run_count()` sequential attempts and reduce them.
///
/// Failed attempts are logged and tallied but never stop the remaining ones;
/// a configuration where everything failed comes back with
/// `successful_runs == 0`.
pub fn aggregate_runs<L>(
    launcher: &mut L,
    executable: &Path,
    configuration: Configuration,
    timeout: Duration,
) -> ConfigurationResult
where
    L: ProcessLauncher + ?Sized,
{
    let processes = configuration.process_count();
    let runs = configuration.run_count();
    info!(processes, runs, "running benchmark configuration");

    let mut times = Vec::with_capacity(runs);
    let mut failures = FailureTally::default();
    for attempt in 1..=runs {
        let outcome = launcher.launch(executable, processes, timeout);
        match &outcome {
            RunOutcome::Success { elapsed_secs } => {
                info!(processes, attempt, runs, "execution time: {:.2}s", elapsed_secs);
                times.push(*elapsed_secs);
            }
            RunOutcome::Timeout { limit } => {
                warn!(processes, attempt, runs, "timed out after {:?}", limit);
            }
            RunOutcome::ProcessFailure { exit_code, stderr } => {
                warn!(processes, attempt, runs, ?exit_code, stderr = %stderr, "workload failed");
            }
            RunOutcome::LaunchError { cause } => {
                warn!(processes, attempt, runs, "launch error: {}", cause);
            }
        }
        failures.record(&outcome);
    }

    ConfigurationResult::from_times(processes, times).with_failures(failures)
}
