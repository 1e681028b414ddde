//! Line-item slot mini-grammar.
//!
//! A slot is a single CSV cell describing one purchased product:
//!
//! ```text
//! name:Grinder|quantity:2|total:398.00|sku:G-1|meta:pa_color:Black|meta:_pao_ids:a:1:{...}
//! ```
//!
//! Segments are separated by `|`; each segment is `key:value` split on the
//! first `:`. Meta segments are `meta:<key>:<value>`. The `_pao_ids` meta
//! value is a PHP-serialised array of add-on descriptors from which a
//! key-to-price table is extracted.
//!
//! Nothing in here fails: an unusable slot parses to `None` and an
//! unusable add-on payload parses to an empty table.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Meta key holding the serialised add-on table.
pub const ADDON_META_KEY: &str = "_pao_ids";

static ADDON_TRIPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"s:3:"key";s:\d+:"([^"]+)";s:5:"value";s:\d+:"([^"]+)";.*?s:9:"raw_price";d:(\d+(?:\.\d+)?)"#,
    )
    .expect("valid add-on regex")
});

static LEADING_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.?\d*").expect("valid decimal regex"));

/// A slot that carried the three required fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSlot {
    pub name: String,
    pub quantity: u32,
    pub total: f64,
    /// Empty when the slot has no `sku` segment.
    pub sku: String,
    /// Meta fields in first-seen key order. A repeated key keeps its first
    /// position and takes the last value. Empty values are dropped.
    pub meta: Vec<(String, String)>,
    /// Add-on key to price, from the `_pao_ids` payload.
    pub addon_prices: HashMap<String, f64>,
}

impl ParsedSlot {
    /// `total / quantity`, or 0 when the quantity is 0.
    pub fn unit_price(&self) -> f64 {
        if self.quantity > 0 {
            self.total / self.quantity as f64
        } else {
            0.0
        }
    }

    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse one slot. Returns `None` unless `name`, `quantity` and `total`
/// are all present and well-formed.
pub fn parse_slot(text: &str) -> Option<ParsedSlot> {
    let mut name: Option<String> = None;
    let mut quantity: Option<u32> = None;
    let mut total: Option<f64> = None;
    let mut sku: Option<String> = None;
    let mut meta: Vec<(String, String)> = Vec::new();
    let mut addon_prices = HashMap::new();

    for segment in text.split('|') {
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };

        match key.trim() {
            "name" if name.is_none() => {
                let value = value.trim();
                if !value.is_empty() {
                    name = Some(value.to_string());
                }
            }
            "quantity" if quantity.is_none() => quantity = leading_integer(value),
            "total" if total.is_none() => total = leading_decimal(value),
            "sku" if sku.is_none() => sku = Some(value.trim().to_string()),
            "meta" => {
                let Some((meta_key, meta_value)) = value.split_once(':') else {
                    continue;
                };
                if meta_key.is_empty() {
                    continue;
                }
                if meta_key == ADDON_META_KEY {
                    addon_prices = parse_addon_prices(meta_value);
                    continue;
                }
                let meta_value = meta_value.trim().to_string();
                if meta_value.is_empty() {
                    continue;
                }
                match meta.iter_mut().find(|(k, _)| k == meta_key) {
                    Some(entry) => entry.1 = meta_value,
                    None => meta.push((meta_key.to_string(), meta_value)),
                }
            }
            _ => {}
        }
    }

    Some(ParsedSlot {
        name: name?,
        quantity: quantity?,
        total: total?,
        sku: sku.unwrap_or_default(),
        meta,
        addon_prices,
    })
}

/// Extract `key -> raw_price` from a serialised add-on payload.
///
/// Each add-on descriptor carries `key`, `value` and `raw_price` entries.
/// Payloads that match nothing yield an empty table.
pub fn parse_addon_prices(payload: &str) -> HashMap<String, f64> {
    ADDON_TRIPLE
        .captures_iter(payload)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let price = caps.get(3)?.as_str().parse::<f64>().ok()?;
            Some((key, price))
        })
        .collect()
}

fn leading_integer(value: &str) -> Option<u32> {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn leading_decimal(value: &str) -> Option<f64> {
    LEADING_DECIMAL
        .find(value.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAO: &str = r#"a:2:{i:0;a:5:{s:3:"key";s:12:"Accent Piece";s:5:"value";s:6:"Walnut";s:5:"price";s:0:"";s:9:"raw_price";d:25;s:10:"price_type";s:8:"flat_fee";}i:1;a:5:{s:3:"key";s:16:"Optional Add-ons";s:5:"value";s:5:"Brush";s:5:"price";s:0:"";s:9:"raw_price";d:4.5;s:10:"price_type";s:8:"flat_fee";}}"#;

    #[test]
    fn test_basic_slot() {
        let slot = parse_slot("name:Widget|quantity:2|total:19.98|sku:W-1").unwrap();
        assert_eq!(slot.name, "Widget");
        assert_eq!(slot.quantity, 2);
        assert_eq!(slot.total, 19.98);
        assert_eq!(slot.sku, "W-1");
        assert!((slot.unit_price() - 9.99).abs() < 1e-9);
        assert!(slot.meta.is_empty());
        assert!(slot.addon_prices.is_empty());
    }

    #[test]
    fn test_missing_required_field_skips_slot() {
        assert!(parse_slot("name:Widget|quantity:2").is_none());
        assert!(parse_slot("quantity:2|total:5.00").is_none());
        assert!(parse_slot("name:Widget|quantity:two|total:5.00").is_none());
        assert!(parse_slot("name: |quantity:1|total:5.00").is_none());
        assert!(parse_slot("").is_none());
    }

    #[test]
    fn test_zero_quantity_has_zero_price() {
        let slot = parse_slot("name:Gift|quantity:0|total:10.00").unwrap();
        assert_eq!(slot.unit_price(), 0.0);
    }

    #[test]
    fn test_sku_optional() {
        let slot = parse_slot("name:Widget|quantity:1|total:5").unwrap();
        assert_eq!(slot.sku, "");
        assert_eq!(slot.total, 5.0);
    }

    #[test]
    fn test_name_inside_meta_does_not_count() {
        let slot = parse_slot("meta:engraving:name:Bob|name:Mug|quantity:1|total:8.00").unwrap();
        assert_eq!(slot.name, "Mug");
        assert_eq!(slot.meta_value("engraving"), Some("name:Bob"));
    }

    #[test]
    fn test_meta_order_and_last_value_wins() {
        let slot = parse_slot(
            "name:G|quantity:1|total:1|meta:pa_color:Black|meta:pa_motor:220V|meta:pa_color: Red ",
        )
        .unwrap();
        assert_eq!(
            slot.meta,
            vec![
                ("pa_color".to_string(), "Red".to_string()),
                ("pa_motor".to_string(), "220V".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_meta_values_are_dropped() {
        let slot =
            parse_slot("name:Widget|quantity:1|total:5|meta:pa_burr-set:|meta:Accent Piece: |meta:pa_color:Red")
                .unwrap();
        assert_eq!(slot.meta, vec![("pa_color".to_string(), "Red".to_string())]);

        let slot = parse_slot("name:W|quantity:1|total:5|meta:pa_color:Red|meta:pa_color:").unwrap();
        assert_eq!(slot.meta_value("pa_color"), Some("Red"));
    }

    #[test]
    fn test_addon_prices_from_slot() {
        let text = format!("name:G|quantity:1|total:100|meta:Accent Piece:Walnut|meta:_pao_ids:{}", PAO);
        let slot = parse_slot(&text).unwrap();
        assert_eq!(slot.addon_prices.get("Accent Piece"), Some(&25.0));
        assert_eq!(slot.addon_prices.get("Optional Add-ons"), Some(&4.5));
        assert_eq!(slot.meta_value(ADDON_META_KEY), None);
    }

    #[test]
    fn test_malformed_addon_payload_is_empty() {
        assert!(parse_addon_prices("a:1:{garbage}").is_empty());
        assert!(parse_addon_prices("").is_empty());
    }
}
