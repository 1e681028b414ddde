//! Category to collection mapping.
//!
//! Handles are unique within a run (see [`crate::models::HandleRegistry`]).
//! Parent links are resolved after the loop, once every category has its
//! handle, since a parent may come before or after its children.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use super::clean::{clean_handle, is_absolute_url, tidy_html};
use super::{Conversion, RecordMapper, RunContext};
use crate::config::CollectionOptions;
use crate::error::{ConversionResult, LoadResult};
use crate::models::{OutputRecord, SourceRow};
use crate::parser::load_mapping;
use crate::validation::RowCheck;

/// Image URL from a category `image` cell: a plain absolute URL or a JSON
/// object with an absolute `url` field.
pub fn extract_image_url(image: &str) -> Option<String> {
    let image = image.trim();

    if image.starts_with('{') {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(image) {
            return obj
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| is_absolute_url(url))
                .map(str::to_string);
        }
    }
    is_absolute_url(image).then(|| image.to_string())
}

/// Smart-collection rules: products tagged `category_<slug>` and products
/// whose type equals the category name.
pub fn collection_rules(row: &SourceRow) -> Vec<Value> {
    let mut rules = Vec::new();
    if let Some(slug) = row.text("slug") {
        rules.push(json!({
            "column": "tag",
            "relation": "equals",
            "condition": format!("category_{}", slug),
        }));
    }
    if let Some(name) = row.text("name") {
        rules.push(json!({
            "column": "type",
            "relation": "equals",
            "condition": name,
        }));
    }
    rules
}

/// Converts WooCommerce categories into Shopify collections.
#[derive(Debug, Clone)]
pub struct CollectionMapper {
    options: CollectionOptions,
    image_mapping: HashMap<String, String>,
}

impl CollectionMapper {
    pub fn new(options: CollectionOptions) -> Self {
        Self {
            options,
            image_mapping: HashMap::new(),
        }
    }

    fn image_for(&self, row: &SourceRow) -> Option<String> {
        row.text("term_id")
            .and_then(|id| self.image_mapping.get(&id).cloned())
            .filter(|url| !url.is_empty())
            .or_else(|| row.text("image").and_then(|img| extract_image_url(&img)))
    }
}

impl RecordMapper for CollectionMapper {
    fn tool_name(&self) -> &'static str {
        "collections"
    }

    fn configuration(&self) -> Value {
        let mut config = serde_json::to_value(&self.options).unwrap_or_default();
        if let Some(map) = config.as_object_mut() {
            map.insert("image_mapping_used".into(), json!(!self.image_mapping.is_empty()));
        }
        config
    }

    fn counters(&self) -> &'static [&'static str] {
        &["rules_created", "images_processed", "parent_relations"]
    }

    fn load_mapping(&mut self, path: &Path) -> LoadResult<()> {
        self.image_mapping = load_mapping(path)?;
        Ok(())
    }

    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
        RowCheck::new(row).required(&["name"]).finish()
    }

    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
        let name = row.text_or("name", "");
        let handle = ctx.handles.issue(&clean_handle(&name));
        let smart = self.options.use_smart_collections;
        let image = self.image_for(row).unwrap_or_default();

        let rules = if smart {
            let rules = collection_rules(row);
            ctx.stats.bump("rules_created");
            serde_json::to_string(&rules).unwrap_or_default()
        } else {
            String::new()
        };
        if !image.is_empty() {
            ctx.stats.bump("images_processed");
        }

        let mut record = OutputRecord::new();
        record.insert("Handle".into(), json!(handle));
        record.insert("Title".into(), json!(name));
        record.insert(
            "Body HTML".into(),
            json!(tidy_html(&row.text_or("description", ""))),
        );
        let collection_type = if smart { "smart" } else { "custom" };
        record.insert("Collection Type".into(), json!(collection_type));
        record.insert("Published".into(), json!(true));
        record.insert("Image Src".into(), json!(image));
        record.insert("Sort Order".into(), json!("best-selling"));
        record.insert("Template Suffix".into(), json!(""));
        record.insert("Published Scope".into(), json!("web"));
        record.insert("SEO Title".into(), json!(row.text_or("seo_title", &name)));
        record.insert("SEO Description".into(), json!(row.text_or("seo_description", "")));
        record.insert("Rules".into(), json!(rules));

        if let Some(term_id) = row.text("term_id") {
            ctx.handles_by_key.insert(term_id, handle.clone());
        }
        if self.options.link_parents {
            if let Some(parent_id) = row.text("parent").filter(|p| p != "0") {
                ctx.pending_parents.push((handle, parent_id));
            }
        }

        Ok(Conversion::One(record))
    }

    fn finish(&mut self, records: &mut [OutputRecord], ctx: &mut RunContext) {
        let links = std::mem::take(&mut ctx.pending_parents);
        for (child_handle, parent_id) in links {
            let Some(parent_handle) = ctx.handles_by_key.get(&parent_id) else {
                warn!(
                    "Parent category {} of '{}' not found",
                    parent_id, child_handle
                );
                ctx.stats.warnings += 1;
                continue;
            };

            let child = records
                .iter_mut()
                .find(|r| r.get("Handle").and_then(Value::as_str) == Some(child_handle.as_str()));
            if let Some(child) = child {
                debug!("Linking {} -> {}", child_handle, parent_handle);
                child.insert("Parent Handle".into(), json!(parent_handle));
                ctx.stats.bump("parent_relations");
            }
        }
    }

    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["term_id", "name"])
    }
}
