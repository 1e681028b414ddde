//! Transformation module.
//!
//! - Clean: field cleaners shared by every mapper
//! - Countries: country name to ISO code lookup
//! - Orders: line-item expansion of WooCommerce orders
//! - Customers, Products, Collections, Reviews, Discounts: record mappers
//! - Pipeline: the migration driver

pub mod clean;
pub mod collections;
pub mod countries;
pub mod customers;
pub mod discounts;
pub mod orders;
pub mod pipeline;
pub mod products;
pub mod reviews;

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{ConversionError, ConversionResult, LoadError, LoadResult};
use crate::models::{Cell, HandleRegistry, OutputRecord, RunStatistics, SourceRow};
use crate::parser::parse_csv_file_auto;

pub use collections::CollectionMapper;
pub use customers::CustomerMapper;
pub use discounts::DiscountMapper;
pub use orders::{load_meta_rules, MetaFieldRule, MetaRules, OrderMapper, PromotionRule};
pub use pipeline::{process_rows, run_migration, RunSummary, Stage};
pub use products::ProductMapper;
pub use reviews::ReviewMapper;

// =============================================================================
// Run context
// =============================================================================

/// Mutable state of one run, handed to every conversion.
///
/// Everything a mapper must remember between rows lives here, so the same
/// mapper can be run again with a fresh context.
#[derive(Debug)]
pub struct RunContext {
    /// When the run started; stands in for unreadable source dates.
    pub started: DateTime<Local>,
    pub stats: RunStatistics,
    pub handles: HandleRegistry,
    /// Dedup keys already emitted (customer emails).
    pub seen_keys: HashSet<String>,
    /// Source id to the handle issued for it (category term ids).
    pub handles_by_key: HashMap<String, String>,
    /// `(child handle, parent source id)` pairs resolved in `finish`.
    pub pending_parents: Vec<(String, String)>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            started: Local::now(),
            stats: RunStatistics::default(),
            handles: HandleRegistry::default(),
            seen_keys: HashSet::new(),
            handles_by_key: HashMap::new(),
            pending_parents: Vec::new(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Money amount of a column. Absent is `None`; present but unreadable is
/// an error so the row is counted as failed instead of emitting `0.00`.
pub fn amount(row: &SourceRow, column: &str) -> ConversionResult<Option<f64>> {
    match row.get(column) {
        Cell::Absent => Ok(None),
        Cell::Number(n) => Ok(Some(*n)),
        Cell::Text(text) => clean::parse_amount(text).map(Some).ok_or_else(|| {
            ConversionError::InvalidValue {
                column: column.to_string(),
                message: format!("'{}' is not an amount", text.trim()),
            }
        }),
    }
}

// =============================================================================
// Record mapper
// =============================================================================

/// Outcome of converting one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    One(OutputRecord),
    /// Several output rows for one input row, counted as one success.
    Many(Vec<OutputRecord>),
    /// Nothing to emit. Counters are whatever `convert` bumped itself.
    Skip,
}

/// One migration kind: how rows are read, validated and converted.
pub trait RecordMapper {
    /// Short name used for log and report file names.
    fn tool_name(&self) -> &'static str;

    /// Resolved options, embedded in the report.
    fn configuration(&self) -> Value;

    /// Extra counters that should show up in the report even at zero.
    fn counters(&self) -> &'static [&'static str] {
        &[]
    }

    /// Load the optional mapping file before the run.
    fn load_mapping(&mut self, _path: &Path) -> LoadResult<()> {
        Ok(())
    }

    /// Read the input rows. Defaults to one auto-detected CSV file.
    fn read_rows(&mut self, input: Option<&Path>) -> LoadResult<Vec<SourceRow>> {
        let path = input.ok_or_else(|| LoadError::MissingInput(self.tool_name().to_string()))?;
        Ok(parse_csv_file_auto(path)?.rows)
    }

    /// Cheap structural checks. Errors are counted as warnings.
    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>>;

    /// Map one valid row.
    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion>;

    /// Post-processing over every converted record.
    fn finish(&mut self, _records: &mut [OutputRecord], _ctx: &mut RunContext) {}

    /// How a row is named in log lines.
    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["ID", "id"])
    }
}
