use criterion::{Criterion, criterion_group, criterion_main};
use scalebench_core::aggregate::ConfigurationResult;
use scalebench_core::report::render_report;
use scalebench_core::speedup::SpeedupModel;
use scalebench_core::summary::ScalingSummary;
use scalebench_core::sweep::SweepResult;
use std::hint::black_box;

// Roughly Amdahl-shaped timings with a little jitter per run.
fn synthetic_sweep(configurations: usize, runs: usize) -> SweepResult {
    (1..=configurations)
        .map(|processes| {
            let ideal = 0.1 + 100.0 / processes as f64;
            let times = (0..runs).map(|run| ideal * (1.0 + 0.01 * run as f64)).collect();
            ConfigurationResult::from_times(processes, times)
        })
        .collect()
}

fn bench_speedup_model(c: &mut Criterion) {
    let sweep = synthetic_sweep(512, 5);

    c.bench_function("speedup_model_512", |b| {
        b.iter(|| {
            let model = SpeedupModel::from_sweep(black_box(&sweep));
            black_box(&model);
        })
    });

    let model = SpeedupModel::from_sweep(&sweep);
    c.bench_function("scaling_summary_512", |b| {
        b.iter(|| {
            let summary = ScalingSummary::from_model(black_box(&model));
            black_box(&summary);
        })
    });
}

fn bench_report(c: &mut Criterion) {
    let sweep = synthetic_sweep(64, 3);
    let model = SpeedupModel::from_sweep(&sweep);
    let summary = ScalingSummary::from_model(&model);

    c.bench_function("render_report_64", |b| {
        b.iter(|| {
            let text = render_report(black_box(&sweep), &model, &summary);
            black_box(text.len());
        })
    });
}

criterion_group!(benches, bench_speedup_model, bench_report);
criterion_main!(benches);
