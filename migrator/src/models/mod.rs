//! Domain models shared by every migration tool.
//!
//! - [`Cell`] / [`SourceRow`] - one input row, column name to tagged value
//! - [`OutputRecord`] - one output row, ordered column name to JSON value
//! - [`RunStatistics`] - counters accumulated during a run
//! - [`HandleRegistry`] - handles already issued in the current run
//! - [`LineItem`] - a main or derived order line item

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

// =============================================================================
// Source rows
// =============================================================================

/// A single input cell.
///
/// CSV parsing only ever produces `Absent` or `Text`; `Number` exists for
/// rows assembled in code (subscriber exports, tests).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Absent,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Build a cell from raw CSV text. Blank text is absent.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Absent
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    /// Trimmed textual form; numbers render without a trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Absent => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) => Some(format_number(*n)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Absent => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Cell::Number(n) => Some(*n),
        }
    }
}

impl From<&str> for Cell {
    fn from(raw: &str) -> Self {
        Cell::from_raw(raw)
    }
}

impl From<String> for Cell {
    fn from(raw: String) -> Self {
        Cell::from_raw(&raw)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

static ABSENT: Cell = Cell::Absent;

/// One input row: column name to [`Cell`].
///
/// Lookups of unknown columns yield [`Cell::Absent`], so a missing column
/// and an empty cell are the same state for the mappers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    cells: HashMap<String, Cell>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Cell>,
    {
        let cells = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { cells }
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: impl Into<Cell>) {
        self.cells.insert(column.into(), cell.into());
    }

    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&ABSENT)
    }

    /// True when the column holds a non-absent value.
    pub fn has(&self, column: &str) -> bool {
        !self.get(column).is_absent()
    }

    /// Trimmed text of a column, `None` when absent.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).as_text()
    }

    pub fn text_or(&self, column: &str, default: &str) -> String {
        self.text(column).unwrap_or_else(|| default.to_string())
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Cell)> {
        self.cells.iter()
    }

    /// First present value among `candidates`, for log lines.
    pub fn label(&self, candidates: &[&str]) -> String {
        candidates
            .iter()
            .find_map(|c| self.text(c))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Render a number the way a spreadsheet would show it.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// =============================================================================
// Output records
// =============================================================================

/// One output row. Column order is insertion order.
pub type OutputRecord = Map<String, Value>;

// =============================================================================
// Run statistics
// =============================================================================

/// Counters accumulated during one run and flushed into the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub warnings: u64,
    /// Tool-specific counters (`line_items_created`, `codes_truncated`, ...).
    #[serde(flatten)]
    pub details: BTreeMap<String, u64>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make counters visible in the report even when they stay at zero.
    pub fn register(&mut self, counters: &[&str]) {
        for counter in counters {
            self.details.entry((*counter).to_string()).or_insert(0);
        }
    }

    pub fn bump(&mut self, counter: &str) {
        self.add(counter, 1);
    }

    pub fn add(&mut self, counter: &str, amount: u64) {
        *self.details.entry(counter.to_string()).or_insert(0) += amount;
    }

    pub fn get(&self, counter: &str) -> u64 {
        self.details.get(counter).copied().unwrap_or(0)
    }

    /// Percentage of successful rows, computed against `max(total, 1)`.
    pub fn success_rate(&self) -> f64 {
        self.successful as f64 / self.total.max(1) as f64 * 100.0
    }
}

// =============================================================================
// Handle registry
// =============================================================================

/// Handles issued during one run. Grows monotonically, discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    issued: HashSet<String>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a handle unique within this registry.
    ///
    /// Collisions get `-xxxx` appended, four hex characters of
    /// `sha256(base_handle + collision_count)`.
    pub fn issue(&mut self, base_handle: &str) -> String {
        let base = if base_handle.is_empty() {
            "untitled"
        } else {
            base_handle
        };

        let mut handle = base.to_string();
        let mut counter: u32 = 1;
        while self.issued.contains(&handle) {
            handle = format!("{}-{}", base, short_hash(base, counter));
            counter += 1;
        }

        self.issued.insert(handle.clone());
        handle
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.issued.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

fn short_hash(base: &str, counter: u32) -> String {
    let digest = Sha256::digest(format!("{}{}", base, counter).as_bytes());
    format!("{:02x}{:02x}", digest[0], digest[1])
}

// =============================================================================
// Line items
// =============================================================================

/// An order line item, either the main product of a slot or an item
/// derived from one of its meta fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub sku: String,
    pub requires_shipping: bool,
    pub taxable: bool,
    pub is_main_item: bool,
    pub variant_description: Option<String>,
}

impl LineItem {
    pub fn main(name: impl Into<String>, quantity: u32, price: f64, sku: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
            sku: sku.into(),
            requires_shipping: true,
            taxable: true,
            is_main_item: true,
            variant_description: None,
        }
    }

    pub fn derived(name: impl Into<String>, price: f64, sku: impl Into<String>) -> Self {
        Self {
            quantity: 1,
            is_main_item: false,
            ..Self::main(name, 1, price, sku)
        }
    }

    /// Name as shown on the order: `"{name} ({variant description})"`.
    pub fn display_name(&self) -> String {
        match &self.variant_description {
            Some(desc) if !desc.is_empty() => format!("{} ({})", self.name, desc),
            _ => self.name.clone(),
        }
    }
}
