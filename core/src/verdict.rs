//! Diminishing-returns heuristic over the first two scaling steps.
//!
//! Only the first three valid records are inspected: the verdict compares the
//! speedup gained by the second step against the first. Later steps do not
//! influence it.

use serde::{Deserialize, Serialize};

use crate::speedup::{SpeedupModel, SpeedupRecord};

pub const MIN_RECORDS_FOR_VERDICT: usize = 3;
/// The second gain must reach this fraction of the first to count as scaling well.
pub const DIMINISHING_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalabilityVerdict {
    pub diminishing: bool,
    /// `speedup[1] - speedup[0]`
    pub first_gain: f64,
    /// `speedup[2] - speedup[1]`
    pub second_gain: f64,
    /// Process counts of the three records compared.
    pub counts: [usize; 3],
}

/// `None` when fewer than three records are available.
pub fn detect_diminishing_returns(records: &[SpeedupRecord]) -> Option<ScalabilityVerdict> {
    if records.len() < MIN_RECORDS_FOR_VERDICT {
        return None;
    }
    let mut sorted: Vec<&SpeedupRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.process_count);
    let (a, b, c) = (sorted[0], sorted[1], sorted[2]);

    let first_gain = b.speedup - a.speedup;
    let second_gain = c.speedup - b.speedup;
    Some(ScalabilityVerdict {
        diminishing: second_gain < DIMINISHING_RATIO * first_gain,
        first_gain,
        second_gain,
        counts: [a.process_count, b.process_count, c.process_count],
    })
}

impl ScalabilityVerdict {
    pub fn from_model(model: &SpeedupModel) -> Option<Self> {
        detect_diminishing_returns(model.records())
    }
}
