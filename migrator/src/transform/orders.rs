//! Order line-item expansion.
//!
//! One WooCommerce order row carries up to `max_line_items` slot cells
//! (`line_item_1`, `line_item_2`, ...). Each usable slot becomes a main line
//! item plus one derived item per promotable meta field. Shopify imports
//! orders as one CSV row per line item, grouped by `Name`, so every item
//! becomes one output row repeating the order header.
//!
//! # Totals
//!
//! Order totals (tax, shipping, grand total) are written on the first row
//! of each order only. Every other row of the order carries empty strings
//! in those columns, so summing `Total` over an order's rows yields the
//! order total exactly once.
//!
//! # Prices
//!
//! The main item is priced `total / quantity` from its slot. Derived items
//! are priced from the slot's add-on table and are NOT subtracted from the
//! main item: the two figures come from different fields of the export.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::clean::{clean_phone, format_date, format_price};
use super::countries::normalize_country;
use super::{amount, Conversion, RecordMapper, RunContext};
use crate::config::OrderOptions;
use crate::error::{ConversionResult, LoadResult};
use crate::models::{LineItem, OutputRecord, SourceRow};
use crate::parser::{load_records, parse_slot, ParsedSlot};
use crate::validation::RowCheck;

// =============================================================================
// Meta-field rules
// =============================================================================

/// How a meta field promotes to its own line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRule {
    pub name_prefix: String,
    pub name_suffix: String,
    pub sku_prefix: String,
    /// Add-on table key used when the meta key itself has no price.
    pub price_field: String,
}

impl PromotionRule {
    pub fn new(name_suffix: &str, sku_prefix: &str, price_field: &str) -> Self {
        Self {
            name_prefix: String::new(),
            name_suffix: name_suffix.to_string(),
            sku_prefix: sku_prefix.to_string(),
            price_field: price_field.to_string(),
        }
    }

    /// `"{value} {suffix}"` without a prefix, otherwise the non-empty parts
    /// of prefix, value and suffix joined by spaces.
    pub fn item_name(&self, value: &str) -> String {
        if self.name_prefix.is_empty() {
            if self.name_suffix.is_empty() {
                return value.to_string();
            }
            return format!("{} {}", value, self.name_suffix);
        }
        [self.name_prefix.as_str(), value, self.name_suffix.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn item_sku(&self, value: &str) -> String {
        format!("{}{}", self.sku_prefix, value.to_lowercase().replace(' ', "-"))
    }

    pub fn item_price(&self, meta_key: &str, addon_prices: &HashMap<String, f64>) -> f64 {
        addon_prices
            .get(meta_key)
            .or_else(|| addon_prices.get(&self.price_field))
            .copied()
            .unwrap_or(0.0)
    }
}

/// What to do with one meta key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaFieldRule {
    /// Stays on the main item as `"Label: Value"`.
    Variant { label: String },
    /// Becomes a derived line item.
    Promote(PromotionRule),
}

/// `pa_cap-style` -> `Cap Style`
pub fn variant_label(meta_key: &str) -> String {
    let key = meta_key.strip_prefix("pa_").unwrap_or(meta_key);
    key.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Meta key to rule. Keys without a rule are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRules {
    rules: HashMap<String, MetaFieldRule>,
}

impl Default for MetaRules {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            "pa_burr-set".to_string(),
            MetaFieldRule::Promote(PromotionRule::new("Burr Set", "burr-set-", "burr_price")),
        );
        rules.insert(
            "pa_cap-style".to_string(),
            MetaFieldRule::Promote(PromotionRule::new("Cap", "cap-style-", "cap_price")),
        );
        rules.insert(
            "Accent Piece".to_string(),
            MetaFieldRule::Promote(PromotionRule::new("Accent Piece", "accent-piece-", "accent_price")),
        );
        rules.insert(
            "Optional Add-ons".to_string(),
            MetaFieldRule::Promote(PromotionRule::new("Add-on", "addon-", "addon_price")),
        );
        for key in ["pa_color", "pa_motor"] {
            rules.insert(
                key.to_string(),
                MetaFieldRule::Variant {
                    label: variant_label(key),
                },
            );
        }
        Self { rules }
    }
}

impl MetaRules {
    /// No rules at all: every meta field is ignored.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn get(&self, meta_key: &str) -> Option<&MetaFieldRule> {
        self.rules.get(meta_key)
    }

    pub fn insert(&mut self, meta_key: impl Into<String>, rule: MetaFieldRule) {
        self.rules.insert(meta_key.into(), rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Merge rules from a mapping file over the current ones.
    ///
    /// Columns: `meta_key` (required), `name_prefix`, `name_suffix`,
    /// `sku_prefix`, `price_field`, `kind` (`variant` keeps the key as a
    /// variant attribute, anything else promotes). A missing file changes
    /// nothing.
    pub fn merge_file(&mut self, path: &Path) -> LoadResult<usize> {
        let rows = load_records(path, &["meta_key"])?;
        let mut merged = 0;

        for row in rows {
            let Some(meta_key) = row.text("meta_key") else {
                continue;
            };
            let rule = if row.text_or("kind", "").eq_ignore_ascii_case("variant") {
                MetaFieldRule::Variant {
                    label: variant_label(&meta_key),
                }
            } else {
                MetaFieldRule::Promote(PromotionRule {
                    name_prefix: row.text_or("name_prefix", ""),
                    name_suffix: row.text_or("name_suffix", ""),
                    sku_prefix: row.text_or("sku_prefix", ""),
                    price_field: row.text_or("price_field", ""),
                })
            };
            self.rules.insert(meta_key, rule);
            merged += 1;
        }

        Ok(merged)
    }
}

/// Built-in rules with the rules of `path` merged over them.
pub fn load_meta_rules(path: &Path) -> LoadResult<MetaRules> {
    let mut rules = MetaRules::default();
    rules.merge_file(path)?;
    Ok(rules)
}

// =============================================================================
// Slot expansion
// =============================================================================

/// Main item followed by its derived items, in meta order.
pub fn expand_slot(slot: &ParsedSlot, rules: &MetaRules) -> Vec<LineItem> {
    let mut main = LineItem::main(&slot.name, slot.quantity, slot.unit_price(), &slot.sku);
    let mut variant_parts: Vec<String> = Vec::new();
    let mut derived: Vec<LineItem> = Vec::new();

    for (key, value) in &slot.meta {
        match rules.get(key) {
            Some(MetaFieldRule::Variant { label }) => {
                variant_parts.push(format!("{}: {}", label, value));
            }
            Some(MetaFieldRule::Promote(rule)) => {
                derived.push(LineItem::derived(
                    rule.item_name(value),
                    rule.item_price(key, &slot.addon_prices),
                    rule.item_sku(value),
                ));
            }
            None => debug!("Ignoring meta field '{}'", key),
        }
    }

    if !variant_parts.is_empty() {
        main.variant_description = Some(variant_parts.join(" - "));
    }

    let mut items = Vec::with_capacity(derived.len() + 1);
    items.push(main);
    items.extend(derived);
    items
}

/// All items of an order, slot by slot. Unusable slots contribute nothing.
pub fn expand_order(row: &SourceRow, rules: &MetaRules, max_line_items: usize) -> Vec<LineItem> {
    let mut items = Vec::new();
    for index in 1..=max_line_items {
        let column = format!("line_item_{}", index);
        let Some(text) = row.text(&column) else {
            continue;
        };
        match parse_slot(&text) {
            Some(slot) => items.extend(expand_slot(&slot, rules)),
            None => debug!("Skipping malformed {}", column),
        }
    }
    items
}

// =============================================================================
// Order rows
// =============================================================================

/// `(Financial Status, Fulfillment Status)` for a WooCommerce status.
pub fn order_status(status: &str) -> (&'static str, &'static str) {
    match status.trim().to_lowercase().as_str() {
        "completed" => ("paid", "fulfilled"),
        "processing" => ("paid", "unfulfilled"),
        "refunded" => ("refunded", "unfulfilled"),
        "cancelled" => ("voided", "unfulfilled"),
        _ => ("pending", "unfulfilled"),
    }
}

const TOTAL_COLUMNS: [&str; 6] = [
    "Taxes Included",
    "Tax 1 Name",
    "Tax 1 Value",
    "Shipping Line Title",
    "Shipping Line Price",
    "Total",
];

/// Converts order rows into Shopify line-item rows.
#[derive(Debug, Clone)]
pub struct OrderMapper {
    options: OrderOptions,
    rules: MetaRules,
}

impl OrderMapper {
    pub fn new(options: OrderOptions) -> Self {
        Self {
            options,
            rules: MetaRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: MetaRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &MetaRules {
        &self.rules
    }

    fn header(&self, row: &SourceRow) -> OutputRecord {
        let mut record = OutputRecord::new();
        let (financial, fulfillment) = order_status(&row.text_or("status", ""));

        record.insert("Name".into(), json!(format!("#{}", row.text_or("order_number", ""))));
        record.insert("Email".into(), json!(row.text_or("customer_email", "")));
        record.insert("Financial Status".into(), json!(financial));
        record.insert("Fulfillment Status".into(), json!(fulfillment));
        record.insert(
            "Currency".into(),
            json!(row.text_or("order_currency", &self.options.default_currency)),
        );
        let created = row.text("order_date").and_then(|d| format_date(&d));
        record.insert("Created at".into(), json!(created.unwrap_or_default()));

        address_columns(&mut record, row, "Billing", "billing");
        address_columns(&mut record, row, "Shipping", "shipping");
        record
    }

    fn totals(&self, row: &SourceRow) -> ConversionResult<[Value; 6]> {
        let price = |column: &str| -> ConversionResult<Value> {
            Ok(json!(format_price(amount(row, column)?.unwrap_or(0.0))))
        };
        Ok([
            json!("false"),
            json!("Tax"),
            price("tax_total")?,
            json!(row.text_or("shipping_method", &self.options.default_shipping_title)),
            price("shipping_total")?,
            price("order_total")?,
        ])
    }
}

fn address_columns(record: &mut OutputRecord, row: &SourceRow, label: &str, prefix: &str) {
    let field = |name: &str| row.text_or(&format!("{}_{}", prefix, name), "");
    let full_name = format!("{} {}", field("first_name"), field("last_name"));
    let state = field("state");

    record.insert(format!("{} Name", label), json!(full_name.trim()));
    record.insert(format!("{} Street", label), json!(field("address_1")));
    record.insert(format!("{} Address2", label), json!(field("address_2")));
    record.insert(format!("{} Company", label), json!(field("company")));
    record.insert(format!("{} City", label), json!(field("city")));
    record.insert(format!("{} Province", label), json!(state));
    record.insert(format!("{} Province Code", label), json!(state));
    record.insert(format!("{} Zip", label), json!(field("postcode")));
    record.insert(format!("{} Country", label), json!(normalize_country(&field("country"))));
    record.insert(format!("{} Phone", label), json!(clean_phone(&field("phone"))));
}

impl RecordMapper for OrderMapper {
    fn tool_name(&self) -> &'static str {
        "orders"
    }

    fn configuration(&self) -> Value {
        let mut config = serde_json::to_value(&self.options).unwrap_or_default();
        if let Some(map) = config.as_object_mut() {
            map.insert("meta_rules".into(), json!(self.rules.len()));
        }
        config
    }

    fn counters(&self) -> &'static [&'static str] {
        &["line_items_created", "derived_items_created", "orders_without_items"]
    }

    fn load_mapping(&mut self, path: &Path) -> LoadResult<()> {
        let merged = self.rules.merge_file(path)?;
        if merged > 0 {
            info!("Merged {} meta-field rules from {}", merged, path.display());
        }
        Ok(())
    }

    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
        RowCheck::new(row)
            .required(&["order_number", "customer_email"])
            .finish()
    }

    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
        let items = expand_order(row, &self.rules, self.options.max_line_items);
        if items.is_empty() {
            warn!("Order {} has no usable line items", self.row_label(row));
            ctx.stats.bump("orders_without_items");
            return Ok(Conversion::Skip);
        }

        let header = self.header(row);
        let totals = self.totals(row)?;
        let mut records = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let mut record = header.clone();
            record.insert("Lineitem name".into(), json!(item.display_name()));
            record.insert("Lineitem quantity".into(), json!(item.quantity));
            record.insert("Lineitem price".into(), json!(format_price(item.price)));
            record.insert("Lineitem sku".into(), json!(item.sku));
            record.insert("Lineitem requires shipping".into(), json!(item.requires_shipping.to_string()));
            record.insert("Lineitem taxable".into(), json!(item.taxable.to_string()));
            record.insert(
                "Lineitem variant title".into(),
                json!(item.variant_description.clone().unwrap_or_default()),
            );

            for (column, value) in TOTAL_COLUMNS.iter().zip(totals.iter()) {
                let value = if idx == 0 { value.clone() } else { json!("") };
                record.insert((*column).to_string(), value);
            }

            ctx.stats.bump("line_items_created");
            if !item.is_main_item {
                ctx.stats.bump("derived_items_created");
            }
            records.push(record);
        }

        Ok(Conversion::Many(records))
    }

    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["order_number"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use std::fs;
    use tempfile::tempdir;

    fn order(slots: &[(&str, &str)]) -> SourceRow {
        let mut row = SourceRow::from_pairs([
            ("order_number", "1001"),
            ("customer_email", "ann@example.com"),
            ("status", "completed"),
            ("order_date", "2024-01-15 10:30:00"),
            ("billing_first_name", "Ann"),
            ("billing_last_name", "Lee"),
            ("billing_country", "United States"),
            ("billing_phone", "555 123 4567"),
            ("tax_total", "1.60"),
            ("shipping_total", "5"),
            ("order_total", "26.58"),
        ]);
        for (column, value) in slots {
            row.insert(*column, *value);
        }
        row
    }

    fn convert(mapper: &mut OrderMapper, row: &SourceRow) -> (Vec<OutputRecord>, RunContext) {
        let mut ctx = RunContext::new();
        match mapper.convert(row, &mut ctx).unwrap() {
            Conversion::Many(records) => (records, ctx),
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_single_slot_order() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[("line_item_1", "name:Widget|quantity:2|total:19.98|sku:W-1")]);
        let (records, ctx) = convert(&mut mapper, &row);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r["Name"], "#1001");
        assert_eq!(r["Lineitem name"], "Widget");
        assert_eq!(r["Lineitem quantity"], 2);
        assert_eq!(r["Lineitem price"], "9.99");
        assert_eq!(r["Lineitem sku"], "W-1");
        assert_eq!(r["Total"], "26.58");
        assert_eq!(r["Financial Status"], "paid");
        assert_eq!(r["Fulfillment Status"], "fulfilled");
        assert_eq!(r["Billing Name"], "Ann Lee");
        assert_eq!(r["Billing Country"], "US");
        assert_eq!(r["Billing Phone"], "+15551234567");
        assert_eq!(ctx.stats.get("line_items_created"), 1);
    }

    #[test]
    fn test_promoted_meta_becomes_derived_row() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[(
            "line_item_1",
            "name:Widget|quantity:2|total:19.98|sku:W-1|meta:pa_burr-set:Standard",
        )]);
        let (records, ctx) = convert(&mut mapper, &row);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Lineitem name"], "Widget");
        assert_eq!(records[0]["Lineitem price"], "9.99");
        assert_eq!(records[0]["Total"], "26.58");

        assert_eq!(records[1]["Lineitem name"], "Standard Burr Set");
        assert_eq!(records[1]["Lineitem sku"], "burr-set-standard");
        assert_eq!(records[1]["Lineitem price"], "0.00");
        assert_eq!(records[1]["Lineitem quantity"], 1);
        assert_eq!(records[1]["Total"], "");
        assert_eq!(records[1]["Tax 1 Value"], "");
        assert_eq!(records[1]["Name"], "#1001");
        assert_eq!(ctx.stats.get("derived_items_created"), 1);
    }

    #[test]
    fn test_totals_appear_once_per_order() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[
            ("line_item_1", "name:A|quantity:1|total:10|meta:Accent Piece:Walnut"),
            ("line_item_2", "garbage"),
            ("line_item_3", "name:B|quantity:3|total:9|meta:pa_cap-style:Round"),
        ]);
        let (records, _) = convert(&mut mapper, &row);

        assert_eq!(records.len(), 4);
        let total: f64 = records
            .iter()
            .filter_map(|r| r["Total"].as_str())
            .filter_map(|t| t.parse::<f64>().ok())
            .sum();
        assert!((total - 26.58).abs() < 1e-9);
        assert_eq!(
            records.iter().filter(|r| r["Total"] != "").count(),
            1,
        );
        assert_eq!(records[2]["Lineitem name"], "B");
        assert_eq!(records[3]["Lineitem name"], "Round Cap");
    }

    #[test]
    fn test_zero_quantity_has_zero_price() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[("line_item_1", "name:Gift|quantity:0|total:10.00")]);
        let (records, _) = convert(&mut mapper, &row);
        assert_eq!(records[0]["Lineitem price"], "0.00");
    }

    #[test]
    fn test_formatted_totals_are_read() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let mut row = order(&[("line_item_1", "name:A|quantity:1|total:10")]);
        row.insert("order_total", "1,234.56");
        row.insert("tax_total", "$3.10");
        row.insert("shipping_total", "€ 12");
        let (records, _) = convert(&mut mapper, &row);

        assert_eq!(records[0]["Total"], "1234.56");
        assert_eq!(records[0]["Tax 1 Value"], "3.10");
        assert_eq!(records[0]["Shipping Line Price"], "12.00");
    }

    #[test]
    fn test_unreadable_totals_fail_the_order() {
        for column in ["order_total", "tax_total", "shipping_total"] {
            let mut mapper = OrderMapper::new(OrderOptions::default());
            let mut row = order(&[("line_item_1", "name:A|quantity:1|total:10")]);
            row.insert(column, "call us");
            let mut ctx = RunContext::new();

            let err = mapper.convert(&row, &mut ctx).unwrap_err();
            assert!(
                matches!(&err, ConversionError::InvalidValue { column: c, .. } if c == column),
                "{}: {}",
                column,
                err
            );
        }
    }

    #[test]
    fn test_empty_meta_value_adds_no_item() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[(
            "line_item_1",
            "name:Widget|quantity:1|total:10|meta:pa_burr-set:|meta:Accent Piece:",
        )]);
        let (records, ctx) = convert(&mut mapper, &row);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Lineitem name"], "Widget");
        assert_eq!(ctx.stats.get("derived_items_created"), 0);
    }

    #[test]
    fn test_variant_attributes_fold_into_name() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[(
            "line_item_1",
            "name:Grinder|quantity:1|total:300|meta:pa_color:Black|meta:pa_motor:220V|meta:_reduced_stock:1",
        )]);
        let (records, _) = convert(&mut mapper, &row);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Lineitem name"], "Grinder (Color: Black - Motor: 220V)");
        assert_eq!(records[0]["Lineitem variant title"], "Color: Black - Motor: 220V");
    }

    #[test]
    fn test_addon_prices_used_for_derived_items() {
        let pao = r#"a:1:{i:0;a:5:{s:3:"key";s:12:"Accent Piece";s:5:"value";s:6:"Walnut";s:5:"price";s:0:"";s:9:"raw_price";d:25;}}"#;
        let slot = parse_slot(&format!(
            "name:Grinder|quantity:1|total:300|meta:Accent Piece:Walnut|meta:_pao_ids:{}",
            pao
        ))
        .unwrap();
        let items = expand_slot(&slot, &MetaRules::default());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price, 300.0);
        assert_eq!(items[1].name, "Walnut Accent Piece");
        assert_eq!(items[1].sku, "accent-piece-walnut");
        assert_eq!(items[1].price, 25.0);
    }

    #[test]
    fn test_price_field_fallback() {
        let rule = PromotionRule::new("Cap", "cap-style-", "cap_price");
        let prices = HashMap::from([("cap_price".to_string(), 12.0)]);
        assert_eq!(rule.item_price("pa_cap-style", &prices), 12.0);
        assert_eq!(rule.item_price("pa_cap-style", &HashMap::new()), 0.0);
    }

    #[test]
    fn test_item_name_with_prefix() {
        let rule = PromotionRule {
            name_prefix: "Extra".into(),
            name_suffix: String::new(),
            sku_prefix: "x-".into(),
            price_field: String::new(),
        };
        assert_eq!(rule.item_name("Large Brush"), "Extra Large Brush");
        assert_eq!(rule.item_sku("Large Brush"), "x-large-brush");
    }

    #[test]
    fn test_order_without_items_is_skipped() {
        let mut mapper = OrderMapper::new(OrderOptions::default());
        let row = order(&[("line_item_1", "quantity:1|total:5")]);
        let mut ctx = RunContext::new();

        assert_eq!(mapper.convert(&row, &mut ctx).unwrap(), Conversion::Skip);
        assert_eq!(ctx.stats.get("orders_without_items"), 1);
    }

    #[test]
    fn test_slots_beyond_max_are_ignored() {
        let options = OrderOptions {
            max_line_items: 2,
            ..Default::default()
        };
        let mut mapper = OrderMapper::new(options);
        let row = order(&[
            ("line_item_1", "name:A|quantity:1|total:1"),
            ("line_item_3", "name:C|quantity:1|total:1"),
        ]);
        let (records, _) = convert(&mut mapper, &row);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_validation_requires_number_and_email() {
        let mapper = OrderMapper::new(OrderOptions::default());
        let row = SourceRow::from_pairs([("order_number", "1")]);
        let errors = mapper.validate(&row).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("customer_email"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(order_status("processing"), ("paid", "unfulfilled"));
        assert_eq!(order_status("refunded"), ("refunded", "unfulfilled"));
        assert_eq!(order_status("cancelled"), ("voided", "unfulfilled"));
        assert_eq!(order_status("on-hold"), ("pending", "unfulfilled"));
    }

    #[test]
    fn test_variant_label() {
        assert_eq!(variant_label("pa_cap-style"), "Cap Style");
        assert_eq!(variant_label("pa_color"), "Color");
        assert_eq!(variant_label("gift_wrap"), "Gift Wrap");
    }

    #[test]
    fn test_merge_rules_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta_mapping.csv");
        fs::write(
            &path,
            "meta_key,name_prefix,name_suffix,sku_prefix,price_field,kind\n\
             pa_color,,,,,variant\n\
             Engraving,Engraved,,engr-,engraving_price,\n\
             pa_motor,,Motor,motor-,,\n",
        )
        .unwrap();

        let mut rules = MetaRules::default();
        assert_eq!(rules.merge_file(&path).unwrap(), 3);
        assert!(matches!(rules.get("pa_color"), Some(MetaFieldRule::Variant { .. })));
        assert!(matches!(rules.get("pa_motor"), Some(MetaFieldRule::Promote(_))));
        match rules.get("Engraving") {
            Some(MetaFieldRule::Promote(rule)) => {
                assert_eq!(rule.item_name("Bob"), "Engraved Bob");
                assert_eq!(rule.price_field, "engraving_price");
            }
            other => panic!("unexpected rule {:?}", other),
        }
        assert!(rules.get("pa_burr-set").is_some());
    }

    #[test]
    fn test_load_meta_rules_missing_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let rules = load_meta_rules(&dir.path().join("absent.csv")).unwrap();
        assert_eq!(rules, MetaRules::default());
    }

    #[test]
    fn test_empty_rules_ignore_meta() {
        let slot = parse_slot("name:A|quantity:1|total:1|meta:pa_burr-set:Standard").unwrap();
        assert_eq!(expand_slot(&slot, &MetaRules::empty()).len(), 1);
    }
}
