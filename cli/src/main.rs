use std::path::{Path, PathBuf};
use std::sync::Once;

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "scalebench=info,scalebench_core=info";

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use scalebench_core::{
    config::{DEFAULT_PLOT_PATH, DEFAULT_REPORT_PATH, HarnessConfig},
    plot::write_plot,
    report::write_report,
    runner::CommandLauncher,
    snapshot::SweepSnapshot,
    summary::ScalingSummary,
    sweep::{CommandBuilder, ScalingSweep, SweepPlan},
};
use tracing::{info, warn};


#[derive(Debug, Parser)]
#[command(
    name = "scalebench",
    author,
    version,
    about = "Measure how a parallel workload scales with process count",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct CliArgs {
    #[command(subcommand)]
    command: Option<Commands>,

    // Without a subcommand these options drive `run`.
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the workload if needed, sweep the process counts and write the report
    Run(RunArgs),
    /// Re-render report and plot from a saved JSON snapshot
    Report(ReportArgs),
}

#[derive(Debug, Clone, Default, Args)]
struct RunArgs {
    /// Process counts to measure, in order
    #[arg(short = 'p', long = "processes", value_name = "N", num_args = 1.., value_parser = parse_positive)]
    processes: Option<Vec<usize>>,

    /// Timed runs per process count
    #[arg(short = 'r', long = "runs", value_name = "N", value_parser = parse_positive)]
    runs: Option<usize>,

    /// Text report path [default: performance_report.txt]
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// SVG plot path [default: performance_plot.svg]
    #[arg(long = "plot", value_name = "PATH")]
    plot: Option<PathBuf>,

    /// Also write a JSON snapshot of the sweep
    #[arg(long = "json", value_name = "PATH")]
    json: Option<PathBuf>,

    /// Workload artifact handed to the launcher
    #[arg(long = "executable", value_name = "PATH")]
    executable: Option<PathBuf>,

    /// Launcher program [default: mpirun]
    #[arg(long = "launcher", value_name = "PROGRAM")]
    launcher: Option<String>,

    /// Launcher argument; repeat to build the full template ({workers} and {executable} are substituted)
    #[arg(long = "launcher-arg", value_name = "ARG", allow_hyphen_values = true)]
    launcher_args: Vec<String>,

    /// Per-run timeout in seconds [default: 300]
    #[arg(long = "timeout", value_name = "SECS", value_parser = parse_positive_secs)]
    timeout: Option<u64>,

    /// Harness config file (.toml, .yaml, .yml or .json)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReportArgs {
    /// Snapshot written by `run --json`
    #[arg(long = "from", value_name = "PATH")]
    from: PathBuf,

    #[arg(short = 'o', long = "output", value_name = "PATH", default_value = DEFAULT_REPORT_PATH)]
    output: PathBuf,

    #[arg(long = "plot", value_name = "PATH", default_value = DEFAULT_PLOT_PATH)]
    plot: PathBuf,
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("must be a positive integer".to_string()),
        Ok(value) => Ok(value),
        Err(e) => Err(format!("invalid number '{}': {}", raw, e)),
    }
}

fn parse_positive_secs(raw: &str) -> Result<u64, String> {
    parse_positive(raw).map(|value| value as u64)
}

/// How `SCALEBENCH_LOG` asks for logging to be set up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogSetting {
    Off,
    /// Use `RUST_LOG` if set, else the built-in filter.
    Inherit,
    Filter(String),
}

impl LogSetting {
    fn from_env_value(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return LogSetting::Inherit;
        };
        match value.to_ascii_lowercase().as_str() {
            "0" | "false" | "off" => LogSetting::Off,
            "" | "1" | "true" | "on" => LogSetting::Inherit,
            _ => LogSetting::Filter(value.to_string()),
        }
    }
}

/// `SCALEBENCH_LOG` wins over `RUST_LOG`; `SCALEBENCH_LOG=off` silences logging.
fn init_tracing() {
    let filter_expr = match LogSetting::from_env_value(std::env::var("SCALEBENCH_LOG").ok().as_deref()) {
        LogSetting::Off => return,
        LogSetting::Inherit => std::env::var("RUST_LOG").ok(),
        LogSetting::Filter(expr) => Some(expr),
    };

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = filter_expr
            .and_then(|expr| EnvFilter::try_new(expr).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_TRACE_FILTER));
        let _ = fmt().with_writer(std::io::stderr).with_env_filter(filter).try_init();
    });
}

/// Layer CLI flags over the config file (or the defaults) and validate the result.
fn resolve_config(args: &RunArgs) -> anyhow::Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(processes) = &args.processes {
        config.process_counts = processes.clone();
    }
    if let Some(runs) = args.runs {
        config.run_count = runs;
    }
    if let Some(output) = &args.output {
        config.report_path = output.clone();
    }
    if let Some(plot) = &args.plot {
        config.plot_path = plot.clone();
    }
    if let Some(json) = &args.json {
        config.json_path = Some(json.clone());
    }
    if let Some(executable) = &args.executable {
        config.executable = executable.clone();
    }
    if let Some(launcher) = &args.launcher {
        config.launcher = launcher.clone();
    }
    // The template is replaced as a whole, never merged.
    if !args.launcher_args.is_empty() {
        config.launcher_args = args.launcher_args.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

fn run_sweep(args: &RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let plan = SweepPlan::from_config(&config)?;

    info!(
        processes = ?plan.process_counts(),
        runs = plan.run_count(),
        launcher = %config.launcher,
        "starting performance analysis"
    );

    let mut sweep = ScalingSweep::new(
        config.executable.clone(),
        config.timeout(),
        CommandLauncher::from_config(&config),
        CommandBuilder::from_config(&config),
    );
    let results = sweep.run(&plan).context("Benchmark aborted")?;
    let snapshot = SweepSnapshot::new(&config, results);

    publish(&snapshot, &config.report_path, &config.plot_path)?;

    // The report is already on disk; a snapshot failure only loses the extra copy.
    if let Some(json) = &config.json_path {
        match snapshot.write(json) {
            Ok(()) => println!("Snapshot saved to {}", json.display()),
            Err(err) => warn!(path = %json.display(), "failed to save snapshot: {:#}", err),
        }
    }
    Ok(())
}

fn replay_report(args: &ReportArgs) -> anyhow::Result<()> {
    let snapshot = SweepSnapshot::load(&args.from)?;
    info!(
        snapshot = %args.from.display(),
        generated_at = %snapshot.generated_at,
        "re-rendering saved sweep"
    );
    publish(&snapshot, &args.output, &args.plot)
}

fn publish(snapshot: &SweepSnapshot, report_path: &Path, plot_path: &Path) -> anyhow::Result<()> {
    let model = snapshot.speedup_model();
    let summary = ScalingSummary::from_model(&model);

    write_report(report_path, &snapshot.results, &model, &summary)?;
    println!("Performance report saved to {}", report_path.display());

    if write_plot(plot_path, &model)? {
        println!("Performance plot saved to {}", plot_path.display());
    } else {
        println!("No valid results for plotting");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_tracing();

    match args.command {
        Some(Commands::Run(run)) => run_sweep(&run),
        Some(Commands::Report(report)) => replay_report(&report),
        None => run_sweep(&args.run),
    }
}
