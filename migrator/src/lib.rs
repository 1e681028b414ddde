//! # woo-to-shopify - WooCommerce to Shopify migration toolkit
//!
//! Converts WooCommerce exports (orders, customers, products, categories,
//! reviews, coupons) into Shopify's flat import CSVs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Woo CSV    │────▶│   Parser    │────▶│   Mapper    │────▶│ Shopify CSV │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (per kind)  │     │  + report   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use woo_to_shopify::{run_migration, OrderMapper, OrderOptions, RunOptions};
//!
//! let mut mapper = OrderMapper::new(OrderOptions::default());
//! let options = RunOptions::new(Some("orders.csv".into()), "shopify_orders.csv");
//! let summary = run_migration(&mut mapper, &options).unwrap();
//! println!("Converted {} orders", summary.statistics.successful);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per failure class
//! - [`models`] - Source rows, output records, statistics, handles, line items
//! - [`config`] - Run and per-tool options
//! - [`logs`] - Logging setup and progress
//! - [`parser`] - CSV reading/writing, mapping files, line-item slots
//! - [`transform`] - Field cleaners, record mappers and the driver
//! - [`validation`] - Row checks
//! - [`report`] - JSON run report

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Output
pub mod logs;
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConversionError, ConversionResult, LoadError, LoadResult, MigrationError, MigrationResult,
    WriteError, WriteResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, HandleRegistry, LineItem, OutputRecord, RunStatistics, SourceRow};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    CollectionOptions, CustomerOptions, DiscountOptions, OrderOptions, ProductOptions,
    ReviewOptions, RunOptions,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, load_mapping, load_records,
    parse_addon_prices, parse_bytes_auto, parse_csv_file_auto, parse_slot, write_csv,
    ParseResult, ParsedSlot,
};

// =============================================================================
// Re-exports - Cleaners
// =============================================================================

pub use transform::clean::{
    clean_discount_code, clean_handle, clean_phone, discount_code, format_date, format_price,
    strip_html, CleanedCode,
};
pub use transform::countries::country_code;

// =============================================================================
// Re-exports - Mappers and driver
// =============================================================================

pub use transform::{
    process_rows, run_migration, CollectionMapper, Conversion, CustomerMapper, DiscountMapper,
    MetaFieldRule, MetaRules, OrderMapper, ProductMapper, PromotionRule, RecordMapper,
    ReviewMapper, RunContext, RunSummary, Stage,
};

// =============================================================================
// Re-exports - Validation and report
// =============================================================================

pub use report::{write_report, MigrationReport};
pub use validation::RowCheck;
