//! JSON run report.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{WriteError, WriteResult};
use crate::models::RunStatistics;

/// Summary of one run, written once at the end whatever the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub timestamp: String,
    pub tool_name: String,
    pub input_file: Option<String>,
    pub output_file: String,
    pub statistics: RunStatistics,
    /// Percentage string, e.g. `"87.50%"`.
    pub success_rate: String,
    pub duration_seconds: f64,
    pub configuration: Value,
}

impl MigrationReport {
    pub fn new(
        tool_name: &str,
        input_file: Option<&Path>,
        output_file: &Path,
        statistics: &RunStatistics,
        duration_seconds: f64,
        configuration: Value,
    ) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            tool_name: tool_name.to_string(),
            input_file: input_file.map(|p| p.display().to_string()),
            output_file: output_file.display().to_string(),
            statistics: statistics.clone(),
            success_rate: format!("{:.2}%", statistics.success_rate()),
            duration_seconds,
            configuration,
        }
    }
}

/// `<dir>/<tool>_report_<YYYYmmdd_HHMMSS>.json`
pub fn report_path(report_dir: &Path, tool: &str, at: DateTime<Local>) -> PathBuf {
    report_dir.join(format!("{}_report_{}.json", tool, at.format("%Y%m%d_%H%M%S")))
}

/// Write the report as pretty JSON and return where it landed.
pub fn write_report(report: &MigrationReport, report_dir: &Path) -> WriteResult<PathBuf> {
    fs::create_dir_all(report_dir).map_err(|source| WriteError::Io {
        path: report_dir.to_path_buf(),
        source,
    })?;

    let path = report_path(report_dir, &report.tool_name, Local::now());
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).map_err(|source| WriteError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}
