//! Per-tool options.
//!
//! Every tool owns one options struct. The resolved struct is serialised
//! into the run report under `configuration`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default log directory, overridable with `WOO_TO_SP_LOG_DIR`.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default report directory, overridable with `WOO_TO_SP_REPORT_DIR`.
pub const DEFAULT_REPORT_DIR: &str = "reports";

// =============================================================================
// Run options (shared by every tool)
// =============================================================================

/// Where one run reads from and writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Input CSV. Customers may run without one.
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    /// Optional auxiliary mapping file.
    pub mapping: Option<PathBuf>,
    /// Log `processed/total` every 10% of the loop.
    pub show_progress: bool,
    pub report_dir: PathBuf,
}

impl RunOptions {
    pub fn new(input: Option<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input,
            output: output.into(),
            mapping: None,
            show_progress: true,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }

    pub fn with_mapping(mut self, mapping: Option<PathBuf>) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_report_dir(mut self, report_dir: impl Into<PathBuf>) -> Self {
        self.report_dir = report_dir.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

// =============================================================================
// Tool options
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOptions {
    pub image_migration: bool,
    pub skip_drafts: bool,
    pub default_weight_unit: String,
    pub inventory_tracking: bool,
}

impl Default for ProductOptions {
    fn default() -> Self {
        Self {
            image_migration: true,
            skip_drafts: false,
            default_weight_unit: "kg".to_string(),
            inventory_tracking: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOptions {
    pub use_smart_collections: bool,
    pub link_parents: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            use_smart_collections: true,
            link_parents: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOptions {
    /// Rating used when a review carries none. Clamped into `[1, 5]`.
    pub default_rating: i64,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self { default_rating: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountOptions {
    pub default_minimum_amount: f64,
    pub default_usage_limit: Option<u64>,
    pub max_code_length: usize,
}

impl Default for DiscountOptions {
    fn default() -> Self {
        Self {
            default_minimum_amount: 0.0,
            default_usage_limit: None,
            max_code_length: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOptions {
    /// Number of `line_item_N` columns scanned per order.
    pub max_line_items: usize,
    pub default_currency: String,
    pub default_shipping_title: String,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            max_line_items: 19,
            default_currency: "USD".to_string(),
            default_shipping_title: "Standard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerOptions {
    /// Mailchimp export, either a folder or a `.zip`.
    pub mailchimp_export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(OrderOptions::default().max_line_items, 19);
        assert_eq!(DiscountOptions::default().max_code_length, 50);
        assert_eq!(ReviewOptions::default().default_rating, 5);
        assert!(ProductOptions::default().image_migration);
        assert!(!ProductOptions::default().skip_drafts);
    }

    #[test]
    fn test_options_serialize_for_report() {
        let json = serde_json::to_value(DiscountOptions::default()).unwrap();
        assert_eq!(json["max_code_length"], 50);
        assert!(json["default_usage_limit"].is_null());
    }

    #[test]
    fn test_run_options_builder() {
        let opts = RunOptions::new(Some("in.csv".into()), "out.csv")
            .with_progress(false)
            .with_report_dir("tmp/reports");
        assert!(!opts.show_progress);
        assert_eq!(opts.report_dir, PathBuf::from("tmp/reports"));
        assert!(opts.mapping.is_none());
    }
}
