//! Speedup and efficiency relative to a baseline configuration.
//!
//! The baseline is the *smallest process count that succeeded*, which is not
//! necessarily 1: when the single-process configuration failed entirely, every
//! speedup is relative to whichever count first produced a time. Reports state
//! the baseline explicitly for that reason.

use serde::{Deserialize, Serialize};

use crate::sweep::SweepResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub process_count: usize,
    pub time: f64,
}

/// Derived metrics for one process count with a valid average time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedupRecord {
    pub process_count: usize,
    pub speedup: f64,
    /// `speedup / process_count`; 1.0 is ideal linear scaling.
    pub efficiency: f64,
    /// Average time of this configuration, in seconds.
    pub time: f64,
}

/// Speedup records sorted by ascending process count. Empty when no
/// configuration produced a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeedupModel {
    baseline: Option<Baseline>,
    records: Vec<SpeedupRecord>,
}

impl SpeedupModel {
    pub fn from_sweep(sweep: &SweepResult) -> Self {
        let sorted = sweep.sorted();
        let Some(baseline) = sorted.iter().find_map(|result| {
            result.avg_time().map(|time| Baseline {
                process_count: result.process_count(),
                time,
            })
        }) else {
            return Self::default();
        };

        let records = sorted
            .iter()
            .filter_map(|result| {
                let time = result.avg_time()?;
                let process_count = result.process_count();
                let speedup = if process_count == baseline.process_count {
                    1.0
                } else {
                    baseline.time / time
                };
                Some(SpeedupRecord {
                    process_count,
                    speedup,
                    efficiency: speedup / process_count as f64,
                    time,
                })
            })
            .collect();

        Self {
            baseline: Some(baseline),
            records,
        }
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    pub fn records(&self) -> &[SpeedupRecord] {
        &self.records
    }

    pub fn get(&self, process_count: usize) -> Option<&SpeedupRecord> {
        self.records.iter().find(|record| record.process_count == process_count)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
