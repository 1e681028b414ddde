//! Product mapping.
//!
//! Variants and images arrive as JSON arrays inside single cells
//! (`variations`, `images`). Each variant expands into a family of
//! `Variant N <Field>` columns and each image into `Image N <Field>`.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use super::clean::{clean_handle, format_price, is_absolute_url, strip_html};
use super::{Conversion, RecordMapper, RunContext};
use crate::config::ProductOptions;
use crate::error::{ConversionError, ConversionResult, LoadResult};
use crate::models::{format_number, OutputRecord, SourceRow};
use crate::parser::load_mapping;
use crate::validation::RowCheck;

/// Read a JSON array cell. Absent cells are an empty array.
pub(crate) fn json_array(row: &SourceRow, column: &str) -> ConversionResult<Vec<Value>> {
    let Some(text) = row.text(column) else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(ConversionError::InvalidValue {
            column: column.to_string(),
            message: format!("expected a JSON array, got {}", other),
        }),
        Err(source) => Err(ConversionError::Json {
            column: column.to_string(),
            source,
        }),
    }
}

/// A JSON scalar as text. Empty strings are `None`.
pub(crate) fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n.as_f64().map(format_number),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A JSON scalar as a number, accepting numeric strings.
pub(crate) fn json_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts WooCommerce products into Shopify product rows.
#[derive(Debug, Clone)]
pub struct ProductMapper {
    options: ProductOptions,
    image_mapping: HashMap<String, String>,
}

impl ProductMapper {
    pub fn new(options: ProductOptions) -> Self {
        Self {
            options,
            image_mapping: HashMap::new(),
        }
    }

    fn add_variants(&self, record: &mut OutputRecord, variants: &[Value], ctx: &mut RunContext) {
        for (i, variant) in variants.iter().enumerate() {
            let n = i + 1;
            let price = json_number(variant.get("price"));
            let regular = json_number(variant.get("regular_price"));
            let mut put = |field: &str, value: Value| {
                record.insert(format!("Variant {} {}", n, field), value);
            };

            if let Some(sku) = json_text(variant.get("sku")) {
                put("SKU", json!(sku));
            }
            if let Some(price) = price {
                put("Price", json!(format_price(price)));
            }
            if let (Some(regular), Some(price)) = (regular, price) {
                if regular > price {
                    put("Compare At Price", json!(format_price(regular)));
                }
            }
            if let Some(weight) = json_number(variant.get("weight")) {
                put("Weight", json!(weight));
            }
            let unit = json_text(variant.get("weight_unit"))
                .unwrap_or_else(|| self.options.default_weight_unit.clone());
            put("Weight Unit", json!(unit));
            if self.options.inventory_tracking {
                let stock = json_number(variant.get("stock_quantity")).unwrap_or(0.0);
                put("Inventory Quantity", json!(stock as i64));
            }
            for option in 1..=3 {
                if let Some(value) = json_text(variant.get(format!("attribute_{}", option).as_str())) {
                    put(&format!("Option{}", option), json!(value));
                }
            }

            ctx.stats.bump("variants_processed");
        }
    }

    fn add_images(&self, record: &mut OutputRecord, images: &[Value], product: &str, ctx: &mut RunContext) {
        let mut position = 0;
        for image in images {
            let url = match image {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(obj) => json_text(obj.get("src")),
                _ => None,
            };
            let Some(url) = url.filter(|u| is_absolute_url(u)) else {
                warn!("Invalid image URL for product {}: {}", product, image);
                continue;
            };

            position += 1;
            let src = self.image_mapping.get(&url).cloned().unwrap_or(url);
            record.insert(format!("Image {} Src", position), json!(src));
            record.insert(format!("Image {} Position", position), json!(position));
            record.insert(
                format!("Image {} Alt Text", position),
                json!(format!("Product image {}", position)),
            );
            ctx.stats.bump("images_processed");
        }
    }
}

impl RecordMapper for ProductMapper {
    fn tool_name(&self) -> &'static str {
        "products"
    }

    fn configuration(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or_default()
    }

    fn counters(&self) -> &'static [&'static str] {
        &["variants_processed", "images_processed", "drafts_skipped"]
    }

    fn load_mapping(&mut self, path: &Path) -> LoadResult<()> {
        self.image_mapping = load_mapping(path)?;
        Ok(())
    }

    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
        RowCheck::new(row).required(&["post_title"]).finish()
    }

    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
        let status = row.text_or("status", "");
        if self.options.skip_drafts && status == "draft" {
            debug!("Skipping draft product {}", self.row_label(row));
            ctx.stats.bump("drafts_skipped");
            return Ok(Conversion::Skip);
        }

        let variants = json_array(row, "variations")?;
        let images = if self.options.image_migration {
            json_array(row, "images")?
        } else {
            Vec::new()
        };

        let title = row.text_or("post_title", "");
        let mut record = OutputRecord::new();
        record.insert("Handle".into(), json!(clean_handle(&title)));
        record.insert("Title".into(), json!(title));
        record.insert(
            "Body (HTML)".into(),
            json!(strip_html(&row.text_or("post_content", ""))),
        );
        record.insert("Vendor".into(), json!(row.text_or("vendor", "")));
        record.insert("Type".into(), json!(row.text_or("product_type", "")));
        record.insert("Tags".into(), json!(row.text_or("tags", "")));
        record.insert("Published".into(), json!(status == "publish"));
        for option in 1..=3 {
            if let Some(name) = row.text(&format!("attribute_{}_name", option)) {
                record.insert(format!("Option{} Name", option), json!(name));
            }
        }

        self.add_variants(&mut record, &variants, ctx);
        let label = self.row_label(row);
        self.add_images(&mut record, &images, &label, ctx);

        Ok(Conversion::One(record))
    }

    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["ID", "post_title"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> SourceRow {
        SourceRow::from_pairs([
            ("ID", "42"),
            ("post_title", "Hand Grinder Pro"),
            ("post_content", "<p>Burr&nbsp;grinder</p>"),
            ("status", "publish"),
            ("vendor", "Zerno"),
            ("attribute_1_name", "Color"),
            (
                "variations",
                r#"[{"sku":"HG-B","price":"79.00","regular_price":"99.00","weight":"0.8","stock_quantity":"5","attribute_1":"Black"},
                    {"sku":"HG-W","price":99,"regular_price":99,"weight_unit":"lb","attribute_1":"White"}]"#,
            ),
            (
                "images",
                r#"["https://shop.example/a.jpg", {"src":"https://shop.example/b.jpg"}, "/relative.jpg", "http://bad host/c.jpg"]"#,
            ),
        ])
    }

    fn convert_one(mapper: &mut ProductMapper, row: &SourceRow, ctx: &mut RunContext) -> OutputRecord {
        match mapper.convert(row, ctx).unwrap() {
            Conversion::One(record) => record,
            other => panic!("expected one record, got {:?}", other),
        }
    }

    #[test]
    fn test_product_basic_fields() {
        let mut mapper = ProductMapper::new(ProductOptions::default());
        let mut ctx = RunContext::new();
        let r = convert_one(&mut mapper, &product(), &mut ctx);

        assert_eq!(r["Handle"], "hand-grinder-pro");
        assert_eq!(r["Body (HTML)"], "Burr grinder");
        assert_eq!(r["Published"], true);
        assert_eq!(r["Vendor"], "Zerno");
        assert_eq!(r["Option1 Name"], "Color");
        assert!(r.get("Option2 Name").is_none());
    }

    #[test]
    fn test_variants_and_compare_at_price() {
        let mut mapper = ProductMapper::new(ProductOptions::default());
        let mut ctx = RunContext::new();
        let r = convert_one(&mut mapper, &product(), &mut ctx);

        assert_eq!(r["Variant 1 SKU"], "HG-B");
        assert_eq!(r["Variant 1 Price"], "79.00");
        assert_eq!(r["Variant 1 Compare At Price"], "99.00");
        assert_eq!(r["Variant 1 Weight Unit"], "kg");
        assert_eq!(r["Variant 1 Inventory Quantity"], 5);
        assert_eq!(r["Variant 1 Option1"], "Black");

        assert_eq!(r["Variant 2 Price"], "99.00");
        assert!(r.get("Variant 2 Compare At Price").is_none());
        assert_eq!(r["Variant 2 Weight Unit"], "lb");
        assert_eq!(r["Variant 2 Inventory Quantity"], 0);
        assert_eq!(ctx.stats.get("variants_processed"), 2);
    }

    #[test]
    fn test_images_skip_relative_urls_and_use_mapping() {
        let mut mapper = ProductMapper::new(ProductOptions::default());
        mapper.image_mapping.insert(
            "https://shop.example/b.jpg".into(),
            "https://cdn.shopify.com/b.jpg".into(),
        );
        let mut ctx = RunContext::new();
        let r = convert_one(&mut mapper, &product(), &mut ctx);

        assert_eq!(r["Image 1 Src"], "https://shop.example/a.jpg");
        assert_eq!(r["Image 2 Src"], "https://cdn.shopify.com/b.jpg");
        assert_eq!(r["Image 2 Position"], 2);
        assert_eq!(r["Image 2 Alt Text"], "Product image 2");
        assert!(r.get("Image 3 Src").is_none());
        assert_eq!(ctx.stats.get("images_processed"), 2);
    }

    #[test]
    fn test_no_images_option() {
        let options = ProductOptions {
            image_migration: false,
            ..Default::default()
        };
        let mut mapper = ProductMapper::new(options);
        let mut ctx = RunContext::new();
        let r = convert_one(&mut mapper, &product(), &mut ctx);
        assert!(r.get("Image 1 Src").is_none());
    }

    #[test]
    fn test_drafts_skipped_when_configured() {
        let options = ProductOptions {
            skip_drafts: true,
            ..Default::default()
        };
        let mut mapper = ProductMapper::new(options);
        let mut row = product();
        row.insert("status", "draft");
        let mut ctx = RunContext::new();

        assert_eq!(mapper.convert(&row, &mut ctx).unwrap(), Conversion::Skip);
        assert_eq!(ctx.stats.get("drafts_skipped"), 1);
    }

    #[test]
    fn test_bad_variations_json_is_conversion_error() {
        let mut mapper = ProductMapper::new(ProductOptions::default());
        let mut row = product();
        row.insert("variations", "[{not json");
        let mut ctx = RunContext::new();

        let err = mapper.convert(&row, &mut ctx).unwrap_err();
        assert!(matches!(err, ConversionError::Json { .. }));
    }

    #[test]
    fn test_validation_requires_title() {
        let mapper = ProductMapper::new(ProductOptions::default());
        assert!(mapper.validate(&SourceRow::from_pairs([("ID", "1")])).is_err());
        assert!(mapper.validate(&product()).is_ok());
    }
}
