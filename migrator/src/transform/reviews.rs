//! Product review mapping.
//!
//! Ratings are handled on two paths: a rating present on the input must be
//! an integer in `[1, 5]` or the row fails validation, while a missing
//! rating falls back to the configured default clamped into `[1, 5]`.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use super::clean::{clean_handle, format_date, strip_tags};
use super::{Conversion, RecordMapper, RunContext};
use crate::config::ReviewOptions;
use crate::error::{ConversionResult, LoadResult};
use crate::models::{OutputRecord, SourceRow};
use crate::parser::load_mapping;
use crate::validation::RowCheck;

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

/// Converts WooCommerce product reviews into Shopify review rows.
#[derive(Debug, Clone)]
pub struct ReviewMapper {
    options: ReviewOptions,
    product_mapping: HashMap<String, String>,
}

impl ReviewMapper {
    pub fn new(options: ReviewOptions) -> Self {
        Self {
            options,
            product_mapping: HashMap::new(),
        }
    }

    /// Rating to write: the row's own, else the clamped default.
    pub fn rating(&self, row: &SourceRow) -> i64 {
        match row.number("rating") {
            Some(n) => n as i64,
            None => self.options.default_rating.clamp(MIN_RATING, MAX_RATING),
        }
    }

    fn product_handle(&self, product_id: &str) -> String {
        self.product_mapping
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| clean_handle(product_id))
    }
}

impl RecordMapper for ReviewMapper {
    fn tool_name(&self) -> &'static str {
        "reviews"
    }

    fn configuration(&self) -> Value {
        let mut config = serde_json::to_value(&self.options).unwrap_or_default();
        if let Some(map) = config.as_object_mut() {
            map.insert("product_mapping_used".into(), json!(!self.product_mapping.is_empty()));
        }
        config
    }

    fn load_mapping(&mut self, path: &Path) -> LoadResult<()> {
        self.product_mapping = load_mapping(path)?;
        Ok(())
    }

    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
        RowCheck::new(row)
            .required(&["comment_ID", "comment_post_ID", "comment_author", "comment_content"])
            .integer_in("rating", MIN_RATING, MAX_RATING)
            .finish()
    }

    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
        let product_id = row.text_or("comment_post_ID", "");
        let date = row.text_or("comment_date", "");
        let review_date = format_date(&date).unwrap_or_else(|| {
            warn!(
                "Unreadable date '{}' on review {}, using run start",
                date,
                self.row_label(row)
            );
            ctx.started.format("%Y-%m-%d %H:%M:%S").to_string()
        });
        let status = if row.text_or("comment_approved", "1") == "1" {
            "published"
        } else {
            "unpublished"
        };

        let mut record = OutputRecord::new();
        record.insert("Product Handle".into(), json!(self.product_handle(&product_id)));
        record.insert("Review Date".into(), json!(review_date));
        record.insert("Reviewer Name".into(), json!(row.text_or("comment_author", "")));
        record.insert("Reviewer Email".into(), json!(row.text_or("comment_author_email", "")));
        record.insert("Review Title".into(), json!(row.text_or("title", "")));
        record.insert("Rating".into(), json!(self.rating(row)));
        record.insert(
            "Review Text".into(),
            json!(strip_tags(&row.text_or("comment_content", ""))),
        );
        record.insert("Review Status".into(), json!(status));
        record.insert(
            "Reviewer Location".into(),
            json!(row.text_or("comment_author_location", "")),
        );
        record.insert("Verified Buyer".into(), json!(row.text_or("verified", "0") == "1"));

        Ok(Conversion::One(record))
    }

    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["comment_ID"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use chrono::{Local, TimeZone};

    fn review() -> SourceRow {
        SourceRow::from_pairs([
            ("comment_ID", "11"),
            ("comment_post_ID", "42"),
            ("comment_author", "Ann"),
            ("comment_author_email", "ann@example.com"),
            ("comment_content", "<p>Great   grinder</p>"),
            ("comment_date", "2024-02-01 08:00:00"),
            ("comment_approved", "1"),
            ("verified", "1"),
        ])
    }

    fn convert_one(mapper: &mut ReviewMapper, row: &SourceRow) -> OutputRecord {
        match mapper.convert(row, &mut RunContext::new()).unwrap() {
            Conversion::One(record) => record,
            other => panic!("expected one record, got {:?}", other),
        }
    }

    #[test]
    fn test_review_fields() {
        let mut mapper = ReviewMapper::new(ReviewOptions::default());
        mapper.product_mapping.insert("42".into(), "hand-grinder".into());
        let r = convert_one(&mut mapper, &review());

        assert_eq!(r["Product Handle"], "hand-grinder");
        assert_eq!(r["Review Date"], "2024-02-01 08:00:00");
        assert_eq!(r["Review Text"], "Great grinder");
        assert_eq!(r["Review Status"], "published");
        assert_eq!(r["Verified Buyer"], true);
        assert_eq!(r["Rating"], 5);
    }

    #[test]
    fn test_unmapped_product_uses_id_handle() {
        let mut mapper = ReviewMapper::new(ReviewOptions::default());
        let r = convert_one(&mut mapper, &review());
        assert_eq!(r["Product Handle"], "42");
    }

    #[test]
    fn test_out_of_range_rating_fails_validation() {
        let mapper = ReviewMapper::new(ReviewOptions::default());
        let mut row = review();
        row.insert("rating", Cell::Number(10.0));
        let errors = mapper.validate(&row).unwrap_err();
        assert!(errors[0].contains("rating"));

        row.insert("rating", "four");
        assert!(mapper.validate(&row).is_err());

        row.insert("rating", "4");
        assert!(mapper.validate(&row).is_ok());
    }

    #[test]
    fn test_missing_rating_uses_clamped_default() {
        let mut mapper = ReviewMapper::new(ReviewOptions { default_rating: 9 });
        assert_eq!(convert_one(&mut mapper, &review())["Rating"], 5);

        let mut mapper = ReviewMapper::new(ReviewOptions { default_rating: 0 });
        assert_eq!(convert_one(&mut mapper, &review())["Rating"], 1);

        let mut mapper = ReviewMapper::new(ReviewOptions { default_rating: 3 });
        assert_eq!(convert_one(&mut mapper, &review())["Rating"], 3);
    }

    #[test]
    fn test_unreadable_date_uses_run_start() {
        let mut mapper = ReviewMapper::new(ReviewOptions::default());
        let mut row = review();
        row.insert("comment_date", "last tuesday");

        let mut ctx = RunContext::new();
        ctx.started = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let Conversion::One(r) = mapper.convert(&row, &mut ctx).unwrap() else {
            panic!("expected one record");
        };
        assert_eq!(r["Review Date"], "2025-03-04 05:06:07");
    }

    #[test]
    fn test_required_fields() {
        let mapper = ReviewMapper::new(ReviewOptions::default());
        let row = SourceRow::from_pairs([("comment_ID", "1")]);
        assert_eq!(mapper.validate(&row).unwrap_err().len(), 3);
    }
}
