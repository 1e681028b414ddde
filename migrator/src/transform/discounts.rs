//! Coupon to discount-code mapping.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::clean::{discount_code, format_date, is_truthy};
use super::{amount, Conversion, RecordMapper, RunContext};
use crate::config::DiscountOptions;
use crate::error::{ConversionResult, LoadResult};
use crate::models::{OutputRecord, SourceRow};
use crate::parser::load_mapping;
use crate::validation::RowCheck;

/// Shopify discount type for a WooCommerce one.
pub fn discount_type(woo_type: &str) -> &'static str {
    match woo_type.trim() {
        "percent" => "percentage",
        "fixed_cart" | "fixed_product" => "fixed_amount",
        _ => "percentage",
    }
}

/// Converts WooCommerce coupons into Shopify discount codes.
#[derive(Debug, Clone)]
pub struct DiscountMapper {
    options: DiscountOptions,
    product_mapping: HashMap<String, String>,
}

impl DiscountMapper {
    pub fn new(options: DiscountOptions) -> Self {
        Self {
            options,
            product_mapping: HashMap::new(),
        }
    }

    /// Comma list of product ids, each remapped when the mapping knows it.
    fn product_list(&self, row: &SourceRow, column: &str) -> Vec<String> {
        row.text_or(column, "")
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                self.product_mapping
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| id.to_string())
            })
            .collect()
    }
}

impl RecordMapper for DiscountMapper {
    fn tool_name(&self) -> &'static str {
        "discounts"
    }

    fn configuration(&self) -> Value {
        let mut config = serde_json::to_value(&self.options).unwrap_or_default();
        if let Some(map) = config.as_object_mut() {
            map.insert("product_mapping_used".into(), json!(!self.product_mapping.is_empty()));
        }
        config
    }

    fn counters(&self) -> &'static [&'static str] {
        &["codes_truncated", "percentage_discounts", "fixed_discounts"]
    }

    fn load_mapping(&mut self, path: &Path) -> LoadResult<()> {
        self.product_mapping = load_mapping(path)?;
        Ok(())
    }

    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
        let raw = row.text_or("code", "");
        let cleaned = discount_code(&raw, self.options.max_code_length);
        RowCheck::new(row)
            .required(&["code"])
            .check(
                raw.is_empty() || !cleaned.code.is_empty(),
                format!("Invalid coupon code: {}", raw),
            )
            .non_negative("amount")
            .finish()
    }

    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
        let raw = row.text_or("code", "");
        let cleaned = discount_code(&raw, self.options.max_code_length);
        if cleaned.truncated {
            debug!("Code '{}' truncated to '{}'", raw, cleaned.code);
            ctx.stats.bump("codes_truncated");
        }

        let kind = discount_type(&row.text_or("discount_type", "percent"));
        let value = amount(row, "amount")?.unwrap_or(0.0);
        let minimum =
            amount(row, "minimum_amount")?.unwrap_or(self.options.default_minimum_amount);
        let usage_limit = match row.number("usage_limit") {
            Some(n) => json!(n as u64),
            None => match self.options.default_usage_limit {
                Some(limit) => json!(limit),
                None => json!(""),
            },
        };
        let products = self.product_list(row, "product_ids");
        let excluded = self.product_list(row, "exclude_product_ids");
        let applies_to = if products.is_empty() { "all" } else { "specific" };
        let status = if is_truthy(&row.text_or("enabled", "yes")) {
            "enabled"
        } else {
            "disabled"
        };
        let date = |column: &str| row.text(column).and_then(|d| format_date(&d)).unwrap_or_default();

        let mut record = OutputRecord::new();
        record.insert("Discount Code".into(), json!(cleaned.code));
        record.insert("Type".into(), json!(kind));
        record.insert("Amount".into(), json!(value));
        record.insert("Minimum Purchase Amount".into(), json!(minimum));
        record.insert("Starts At".into(), json!(date("date_created")));
        record.insert("Ends At".into(), json!(date("date_expires")));
        record.insert("Usage Limit".into(), usage_limit);
        record.insert(
            "Once Per Customer".into(),
            json!(row.text_or("individual_use", "no") == "yes"),
        );
        record.insert("Status".into(), json!(status));
        record.insert("Applies To".into(), json!(applies_to));
        record.insert("Products".into(), json!(products.join(",")));
        record.insert("Excluded Products".into(), json!(excluded.join(",")));
        record.insert("Description".into(), json!(row.text_or("description", "")));
        record.insert(
            "Times Used".into(),
            json!(row.number("usage_count").unwrap_or(0.0) as u64),
        );

        if kind == "percentage" {
            ctx.stats.bump("percentage_discounts");
        } else {
            ctx.stats.bump("fixed_discounts");
        }

        Ok(Conversion::One(record))
    }

    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["code", "ID"])
    }
}
