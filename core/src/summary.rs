//! Presentation-ready view of a speedup model.

use serde::Serialize;

use crate::speedup::{Baseline, SpeedupModel, SpeedupRecord};
use crate::verdict::ScalabilityVerdict;

/// Best speedup and best efficiency are chosen independently and may name
/// different process counts. Equal maxima resolve to the smallest count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScalingSummary {
    pub baseline: Option<Baseline>,
    pub best_speedup: Option<SpeedupRecord>,
    pub best_efficiency: Option<SpeedupRecord>,
    pub verdict: Option<ScalabilityVerdict>,
    pub valid_configurations: usize,
}

impl ScalingSummary {
    pub fn from_model(model: &SpeedupModel) -> Self {
        Self {
            baseline: model.baseline(),
            best_speedup: best_by(model.records(), |record| record.speedup),
            best_efficiency: best_by(model.records(), |record| record.efficiency),
            verdict: ScalabilityVerdict::from_model(model),
            valid_configurations: model.len(),
        }
    }

    pub fn has_results(&self) -> bool {
        self.valid_configurations > 0
    }
}

fn best_by(records: &[SpeedupRecord], key: impl Fn(&SpeedupRecord) -> f64) -> Option<SpeedupRecord> {
    let mut sorted: Vec<&SpeedupRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.process_count);
    let mut best: Option<&SpeedupRecord> = None;
    for record in sorted {
        // Strictly greater, so the earliest (smallest) count keeps a tie.
        if best.is_none_or(|current| key(record) > key(current)) {
            best = Some(record);
        }
    }
    best.copied()
}
