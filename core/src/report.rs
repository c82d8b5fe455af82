//! Fixed-format text report.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::speedup::SpeedupModel;
use crate::summary::ScalingSummary;
use crate::sweep::SweepResult;
use crate::verdict::MIN_RECORDS_FOR_VERDICT;

const TITLE: &str = "=== PARALLEL SCALING BENCHMARK - PERFORMANCE REPORT ===";
const RULE_WIDTH: usize = 50;

pub fn render_report(sweep: &SweepResult, model: &SpeedupModel, summary: &ScalingSummary) -> String {
    let mut out = String::new();
    let _ = render_into(&mut out, sweep, model, summary);
    out
}

fn render_into(
    out: &mut String,
    sweep: &SweepResult,
    model: &SpeedupModel,
    summary: &ScalingSummary,
) -> std::fmt::Result {
    writeln!(out, "{}", TITLE)?;
    writeln!(out)?;

    section(out, "EXECUTION TIMES")?;
    for result in sweep.sorted() {
        match (result.avg_time(), result.min_time(), result.max_time()) {
            (Some(avg), Some(min), Some(max)) => writeln!(
                out,
                "Processes: {:2} | Avg: {:6.2}s | Min: {:6.2}s | Max: {:6.2}s | Runs: {}",
                result.process_count(),
                avg,
                min,
                max,
                result.successful_runs()
            )?,
            _ => writeln!(out, "Processes: {:2} | FAILED", result.process_count())?,
        }
    }

    writeln!(out)?;
    section(out, "SPEEDUP AND EFFICIENCY")?;
    if model.is_empty() {
        writeln!(out, "No valid results: every configuration failed")?;
    }
    for record in model.records() {
        writeln!(
            out,
            "Processes: {:2} | Speedup: {:5.2}x | Efficiency: {:5.2} | Time: {:6.2}s",
            record.process_count, record.speedup, record.efficiency, record.time
        )?;
    }

    writeln!(out)?;
    section(out, "ANALYSIS")?;
    match (summary.baseline, summary.best_speedup, summary.best_efficiency) {
        (Some(baseline), Some(speedup), Some(efficiency)) => {
            writeln!(
                out,
                "Baseline: {:.2}s with {} processes",
                baseline.time, baseline.process_count
            )?;
            writeln!(
                out,
                "Best speedup: {:.2}x with {} processes",
                speedup.speedup, speedup.process_count
            )?;
            writeln!(
                out,
                "Best efficiency: {:.2} with {} processes",
                efficiency.efficiency, efficiency.process_count
            )?;
        }
        _ => writeln!(out, "No valid results; speedup and efficiency are unavailable")?,
    }

    writeln!(out)?;
    section(out, "PERFORMANCE INSIGHTS")?;
    match summary.verdict {
        Some(verdict) => {
            let [a, b, c] = verdict.counts;
            writeln!(
                out,
                "Speedup improvement from {} to {} processes: {:.2}x",
                a, b, verdict.first_gain
            )?;
            writeln!(
                out,
                "Speedup improvement from {} to {} processes: {:.2}x",
                b, c, verdict.second_gain
            )?;
            if verdict.diminishing {
                writeln!(out, "→ Diminishing returns observed with higher process counts")?;
                writeln!(out, "→ Communication overhead may be limiting scalability")?;
            } else {
                writeln!(out, "→ Good scalability observed")?;
            }
        }
        None => writeln!(
            out,
            "Not enough successful configurations for a scalability verdict (need {}, have {})",
            MIN_RECORDS_FOR_VERDICT, summary.valid_configurations
        )?,
    }

    writeln!(out)?;
    section(out, "RECOMMENDATIONS")?;
    match summary.best_speedup {
        Some(best) => writeln!(
            out,
            "1. Use {} processes for the shortest wall-clock time",
            best.process_count
        )?,
        None => writeln!(out, "1. Fix the failing runs before choosing a process count")?,
    }
    writeln!(out, "2. Expect communication overhead to grow with the process count")?;
    writeln!(out, "3. Watch CPU and memory use while the workload runs")?;
    writeln!(out, "4. Profile the workload to locate serial bottlenecks")?;
    Ok(())
}

fn section(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out, "{}:", title)?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

pub fn write_report(path: &Path, sweep: &SweepResult, model: &SpeedupModel, summary: &ScalingSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create report directory {}", parent.display()))?;
    }
    fs::write(path, render_report(sweep, model, summary)).with_context(|| format!("write {}", path.display()))
}
