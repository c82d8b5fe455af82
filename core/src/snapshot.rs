//! JSON snapshot of a finished sweep.
//!
//! The file carries the raw results plus the derived speedup table and summary
//! for external tooling. Loading reads only the raw results back; derived
//! views are always recomputed.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;
use crate::speedup::{SpeedupModel, SpeedupRecord};
use crate::summary::ScalingSummary;
use crate::sweep::SweepResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSnapshot {
    pub generated_at: String,
    pub executable: PathBuf,
    pub run_count: usize,
    pub timeout_secs: u64,
    pub results: SweepResult,
}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    #[serde(flatten)]
    snapshot: &'a SweepSnapshot,
    speedup: &'a [SpeedupRecord],
    summary: &'a ScalingSummary,
}

impl SweepSnapshot {
    pub fn new(config: &HarnessConfig, results: SweepResult) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            executable: config.executable.clone(),
            run_count: config.run_count,
            timeout_secs: config.timeout_secs,
            results,
        }
    }

    pub fn speedup_model(&self) -> SpeedupModel {
        SpeedupModel::from_sweep(&self.results)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let model = self.speedup_model();
        let summary = ScalingSummary::from_model(&model);
        let document = SnapshotDocument {
            snapshot: self,
            speedup: model.records(),
            summary: &summary,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create snapshot directory {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &document).with_context(|| format!("write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parse snapshot {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sweep_of;

    #[test]
    fn test_write_then_load_reproduces_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sweep.json");
        let snapshot = SweepSnapshot::new(
            &HarnessConfig::default(),
            sweep_of(&[(2, &[5.1, 4.9]), (1, &[10.3, 9.7, 10.0]), (4, &[])]),
        );
        snapshot.write(&path).expect("write snapshot");

        let loaded = SweepSnapshot::load(&path).expect("load snapshot");
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.speedup_model(), snapshot.speedup_model());
    }

    #[test]
    fn test_document_carries_derived_views() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sweep.json");
        let snapshot = SweepSnapshot::new(&HarnessConfig::default(), sweep_of(&[(1, &[8.0]), (2, &[4.0])]));
        snapshot.write(&path).expect("write snapshot");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["run_count"], 3);
        assert_eq!(value["results"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["speedup"][1]["speedup"], 2.0);
        assert_eq!(value["summary"]["best_speedup"]["process_count"], 2);
        assert!(value["summary"]["verdict"].is_null());
    }

    #[test]
    fn test_load_rejects_invalid_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cases = [
            ("zero_count.json", r#"[{"process_count": 0, "raw_times": [2.0]}, {"process_count": 2, "raw_times": [1.0]}]"#, "process_count must be positive"),
            ("zero_time.json", r#"[{"process_count": 1, "raw_times": [0.0]}]"#, "not a positive number"),
            ("negative_time.json", r#"[{"process_count": 2, "raw_times": [1.5, -1.0]}]"#, "not a positive number"),
        ];
        for (name, results, expected) in cases {
            let path = dir.path().join(name);
            let body = format!(
                r#"{{"generated_at": "2024-01-01T00:00:00Z", "executable": "./workload", "run_count": 1, "timeout_secs": 300, "results": {}}}"#,
                results
            );
            std::fs::write(&path, body).expect("write snapshot");
            let err = SweepSnapshot::load(&path).expect_err("invalid snapshot must not load");
            assert!(format!("{:#}", err).contains(expected), "{name}: {:#}", err);
        }
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = SweepSnapshot::load(Path::new("/nonexistent/sweep.json")).expect_err("missing file");
        assert!(err.to_string().contains("read snapshot"));
    }
}
