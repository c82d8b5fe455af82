//! Harness configuration.
//!
//! Values come from three layers: built-in defaults, an optional config file
//! (TOML, YAML or JSON, picked by extension) and CLI overrides applied by the
//! binary on top of the loaded struct.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

pub const DEFAULT_PROCESS_COUNTS: [usize; 4] = [1, 2, 4, 8];
pub const DEFAULT_RUN_COUNT: usize = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_EXECUTABLE: &str = "./spotify_processor";
pub const DEFAULT_LAUNCHER: &str = "mpirun";
pub const DEFAULT_REPORT_PATH: &str = "performance_report.txt";
pub const DEFAULT_PLOT_PATH: &str = "performance_plot.svg";

/// Placeholder replaced by the requested worker count in launcher arguments.
pub const WORKERS_PLACEHOLDER: &str = "{workers}";
/// Placeholder replaced by the workload path in launcher arguments.
pub const EXECUTABLE_PLACEHOLDER: &str = "{executable}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub executable: PathBuf,
    pub launcher: String,
    pub launcher_args: Vec<String>,
    pub timeout_secs: u64,
    pub process_counts: Vec<usize>,
    pub run_count: usize,
    pub clean_command: Vec<String>,
    pub build_command: Vec<String>,
    pub report_path: PathBuf,
    pub plot_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            launcher: DEFAULT_LAUNCHER.to_string(),
            launcher_args: vec!["-np".to_string(), WORKERS_PLACEHOLDER.to_string(), EXECUTABLE_PLACEHOLDER.to_string()],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            process_counts: DEFAULT_PROCESS_COUNTS.to_vec(),
            run_count: DEFAULT_RUN_COUNT,
            clean_command: vec!["make".to_string(), "clean".to_string()],
            build_command: vec!["make".to_string()],
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            plot_path: PathBuf::from(DEFAULT_PLOT_PATH),
            json_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

impl HarnessConfig {
    /// Load a config file; missing keys fall back to [`HarnessConfig::default`].
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            message: "unsupported extension (expected .toml, .yaml, .yml or .json)".to_string(),
        })?;
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, format).map_err(|message| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str, format: ConfigFormat) -> std::result::Result<Self, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.launcher.trim().is_empty() {
            return Err(HarnessError::InvalidConfiguration("launcher must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(HarnessError::InvalidConfiguration("timeout must be at least one second".to_string()));
        }
        if self.run_count == 0 {
            return Err(HarnessError::InvalidConfiguration("run count must be positive".to_string()));
        }
        if self.process_counts.is_empty() {
            return Err(HarnessError::InvalidConfiguration("no process counts given".to_string()));
        }
        if self.process_counts.contains(&0) {
            return Err(HarnessError::InvalidConfiguration("process counts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
