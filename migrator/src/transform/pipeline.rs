//! Migration driver.
//!
//! One run goes through the stages of [`Stage`] in order:
//!
//! 1. Loading: the optional mapping file is read into the mapper
//! 2. Reading: input rows are parsed
//! 3. Processing: every row is validated then converted
//! 4. Writing: the output CSV is written when there is anything to write
//! 5. Reporting: the JSON report is written
//!
//! A failure in Loading or Reading aborts the run before anything is
//! written. Row-level failures never abort: they end up in the counters.
//!
//! # Example
//!
//! ```rust,ignore
//! use woo_to_shopify::config::{OrderOptions, RunOptions};
//! use woo_to_shopify::transform::{run_migration, OrderMapper};
//!
//! let mut mapper = OrderMapper::new(OrderOptions::default());
//! let options = RunOptions::new(Some("orders.csv".into()), "shopify_orders.csv");
//! let summary = run_migration(&mut mapper, &options)?;
//! println!("{} orders converted", summary.statistics.successful);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::{Conversion, RecordMapper, RunContext};
use crate::config::RunOptions;
use crate::error::MigrationResult;
use crate::logs::Progress;
use crate::models::{OutputRecord, RunStatistics, SourceRow};
use crate::parser::write_csv;
use crate::report::{write_report, MigrationReport};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loading,
    Reading,
    Processing,
    Writing,
    Reporting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::Reading => "reading",
            Stage::Processing => "processing",
            Stage::Writing => "writing",
            Stage::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tool_name: String,
    pub statistics: RunStatistics,
    /// Number of output rows produced.
    pub records: usize,
    /// Output path, `None` when nothing was converted.
    pub output_written: Option<PathBuf>,
    pub report_path: PathBuf,
    pub duration_seconds: f64,
}

fn enter(tool: &str, stage: Stage) {
    debug!("[{}] stage: {}", tool, stage);
}

/// Validate and convert every row, then let the mapper post-process the
/// output. Counters are updated in `ctx.stats`.
pub fn process_rows<M: RecordMapper + ?Sized>(
    mapper: &mut M,
    rows: &[SourceRow],
    ctx: &mut RunContext,
    show_progress: bool,
) -> Vec<OutputRecord> {
    ctx.stats.register(mapper.counters());
    ctx.stats.total += rows.len() as u64;

    let progress = Progress::new("Processing", rows.len(), show_progress);
    let mut records = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if let Err(errors) = mapper.validate(row) {
            warn!(
                "Skipping {}: {}",
                mapper.row_label(row),
                errors.join("; ")
            );
            ctx.stats.warnings += 1;
            progress.tick(i + 1);
            continue;
        }

        match mapper.convert(row, ctx) {
            Ok(Conversion::One(record)) => {
                records.push(record);
                ctx.stats.successful += 1;
            }
            Ok(Conversion::Many(many)) => {
                records.extend(many);
                ctx.stats.successful += 1;
            }
            Ok(Conversion::Skip) => {}
            Err(e) => {
                error!("Error processing {}: {}", mapper.row_label(row), e);
                ctx.stats.failed += 1;
            }
        }
        progress.tick(i + 1);
    }

    mapper.finish(&mut records, ctx);
    records
}

/// Run one migration end to end.
pub fn run_migration<M: RecordMapper + ?Sized>(
    mapper: &mut M,
    options: &RunOptions,
) -> MigrationResult<RunSummary> {
    let tool = mapper.tool_name();
    let started = Instant::now();
    let mut ctx = RunContext::new();
    info!("Starting {} migration", tool);

    enter(tool, Stage::Loading);
    if let Some(mapping) = &options.mapping {
        mapper.load_mapping(mapping)?;
    }

    enter(tool, Stage::Reading);
    let rows = mapper.read_rows(options.input.as_deref())?;
    info!("Read {} rows", rows.len());

    enter(tool, Stage::Processing);
    let records = process_rows(mapper, &rows, &mut ctx, options.show_progress);

    enter(tool, Stage::Writing);
    let output_written = if records.is_empty() {
        warn!("No {} converted, output file not written", tool);
        None
    } else {
        write_csv(&records, &options.output)?;
        info!("Output saved to {}", options.output.display());
        Some(options.output.clone())
    };

    enter(tool, Stage::Reporting);
    let duration_seconds = started.elapsed().as_secs_f64();
    let report = MigrationReport::new(
        tool,
        options.input.as_deref(),
        &options.output,
        &ctx.stats,
        duration_seconds,
        mapper.configuration(),
    );
    let report_path = write_report(&report, &options.report_dir)?;
    info!("Migration report saved to {}", report_path.display());

    log_summary(tool, &ctx.stats);
    enter(tool, Stage::Idle);

    Ok(RunSummary {
        tool_name: tool.to_string(),
        statistics: ctx.stats,
        records: records.len(),
        output_written,
        report_path,
        duration_seconds,
    })
}

fn log_summary(tool: &str, stats: &RunStatistics) {
    info!("Conversion summary for {}:", tool);
    info!("  Total rows: {}", stats.total);
    info!("  Successful: {}", stats.successful);
    info!("  Failed: {}", stats.failed);
    info!("  Warnings: {}", stats.warnings);
    for (name, value) in &stats.details {
        info!("  {}: {}", name.replace('_', " "), value);
    }
    info!("  Success rate: {:.2}%", stats.success_rate());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConversionError, ConversionResult, LoadResult};
    use crate::validation::RowCheck;
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::tempdir;

    /// Emits one record per row, two for `kind=pair`, none for `kind=skip`
    /// and fails on `kind=bad`.
    struct EchoMapper {
        rows: Vec<SourceRow>,
        finished: bool,
    }

    impl EchoMapper {
        fn new(rows: Vec<SourceRow>) -> Self {
            Self { rows, finished: false }
        }
    }

    impl RecordMapper for EchoMapper {
        fn tool_name(&self) -> &'static str {
            "echo"
        }

        fn configuration(&self) -> Value {
            json!({"mode": "echo"})
        }

        fn counters(&self) -> &'static [&'static str] {
            &["echoed"]
        }

        fn read_rows(&mut self, _input: Option<&Path>) -> LoadResult<Vec<SourceRow>> {
            Ok(self.rows.clone())
        }

        fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
            RowCheck::new(row).required(&["id"]).finish()
        }

        fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
            let id = row.text_or("id", "");
            let record = |suffix: &str| {
                let mut r = OutputRecord::new();
                r.insert("Id".into(), json!(format!("{}{}", id, suffix)));
                r
            };
            match row.text_or("kind", "one").as_str() {
                "pair" => Ok(Conversion::Many(vec![record("a"), record("b")])),
                "skip" => Ok(Conversion::Skip),
                "bad" => Err(ConversionError::InvalidValue {
                    column: "kind".into(),
                    message: "rejected".into(),
                }),
                _ => {
                    ctx.stats.bump("echoed");
                    Ok(Conversion::One(record("")))
                }
            }
        }

        fn finish(&mut self, _records: &mut [OutputRecord], _ctx: &mut RunContext) {
            self.finished = true;
        }
    }

    fn row(id: &str, kind: &str) -> SourceRow {
        SourceRow::from_pairs([("id", id), ("kind", kind)])
    }

    #[test]
    fn test_row_outcomes_are_counted() {
        let rows = vec![
            row("1", "one"),
            row("2", "pair"),
            row("3", "skip"),
            row("4", "bad"),
            row("", "one"),
        ];
        let mut mapper = EchoMapper::new(Vec::new());
        let mut ctx = RunContext::new();
        let records = process_rows(&mut mapper, &rows, &mut ctx, false);

        assert_eq!(records.len(), 3);
        assert_eq!(ctx.stats.total, 5);
        assert_eq!(ctx.stats.successful, 2);
        assert_eq!(ctx.stats.failed, 1);
        assert_eq!(ctx.stats.warnings, 1);
        assert_eq!(ctx.stats.get("echoed"), 1);
        assert!(mapper.finished);
    }

    #[test]
    fn test_counters_registered_at_zero() {
        let mut mapper = EchoMapper::new(Vec::new());
        let mut ctx = RunContext::new();
        process_rows(&mut mapper, &[], &mut ctx, false);
        assert_eq!(ctx.stats.details.get("echoed"), Some(&0));
    }

    #[test]
    fn test_run_writes_output_and_report() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out").join("echo.csv");
        let options = RunOptions::new(None, &output)
            .with_report_dir(dir.path().join("reports"))
            .with_progress(false);
        let mut mapper = EchoMapper::new(vec![row("1", "one"), row("2", "pair")]);

        let summary = run_migration(&mut mapper, &options).unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.output_written.as_deref(), Some(output.as_path()));

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(csv.lines().collect::<Vec<_>>(), vec!["Id", "1", "2a", "2b"]);

        let report: Value =
            serde_json::from_str(&std::fs::read_to_string(&summary.report_path).unwrap()).unwrap();
        assert_eq!(report["tool_name"], "echo");
        assert_eq!(report["statistics"]["successful"], 2);
        assert_eq!(report["success_rate"], "100.00%");
        assert_eq!(report["configuration"]["mode"], "echo");
    }

    #[test]
    fn test_empty_run_skips_output_but_reports() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("echo.csv");
        let options = RunOptions::new(None, &output)
            .with_report_dir(dir.path().join("reports"))
            .with_progress(false);
        let mut mapper = EchoMapper::new(vec![row("1", "skip")]);

        let summary = run_migration(&mut mapper, &options).unwrap();
        assert!(summary.output_written.is_none());
        assert!(!output.exists());
        assert!(summary.report_path.exists());
        assert_eq!(summary.statistics.total, 1);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Processing.to_string(), "processing");
        assert_eq!(Stage::Idle.to_string(), "idle");
    }
}
