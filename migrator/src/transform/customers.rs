//! Customer mapping from WooCommerce customers and Mailchimp subscribers.
//!
//! Both sources are read into one row stream, WooCommerce first. Every row
//! carries its origin in [`SOURCE_COLUMN`] and subscribers also carry the
//! list they came from in [`LIST_COLUMN`]. An email address is kept the
//! first time it is seen; later rows with the same address are skipped.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::clean::{clean_phone, is_truthy};
use super::countries::country_code;
use super::{amount, Conversion, RecordMapper, RunContext};
use crate::config::CustomerOptions;
use crate::error::{ConversionResult, LoadError, LoadResult};
use crate::models::{Cell, OutputRecord, SourceRow};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto};
use crate::validation::RowCheck;

/// Internal column naming the source of a row.
pub const SOURCE_COLUMN: &str = "_source";
/// Internal column naming the Mailchimp list of a subscriber row.
pub const LIST_COLUMN: &str = "_list_id";

const WOOCOMMERCE: &str = "woocommerce";
const MAILCHIMP: &str = "mailchimp";

// =============================================================================
// Mailchimp export
// =============================================================================

/// A named segment and the raw text of its member list.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub members: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ExportFile {
    Members,
    MergeFields,
    Segments,
}

/// Locate a known export file from its path components:
/// `.../lists/<list>/members/members.csv`, `.../lists/<list>/merge-fields.csv`
/// or `.../lists/<list>/segments.csv`.
fn classify(parts: &[&str]) -> Option<(String, ExportFile)> {
    let pos = parts.iter().position(|p| *p == "lists")?;
    let list = parts.get(pos + 1)?;
    let kind = match &parts[pos + 2..] {
        ["members", "members.csv"] => ExportFile::Members,
        ["merge-fields.csv"] => ExportFile::MergeFields,
        ["segments.csv"] => ExportFile::Segments,
        _ => return None,
    };
    Some((list.to_string(), kind))
}

/// Subscribers, merge-field names and segments of a Mailchimp export.
#[derive(Debug, Clone, Default)]
pub struct MailchimpExport {
    pub subscribers: Vec<SourceRow>,
    /// List id -> (merge tag -> field name).
    pub merge_fields: HashMap<String, HashMap<String, String>>,
    pub segments: HashMap<String, Vec<Segment>>,
}

impl MailchimpExport {
    /// Load an export from a folder or a `.zip` archive.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let is_zip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);

        let export = if is_zip {
            info!("Processing ZIP archive {}", path.display());
            Self::from_zip(path)?
        } else {
            info!("Reading Mailchimp data from {}", path.display());
            Self::from_folder(path)?
        };
        info!("Found {} subscribers", export.subscribers.len());
        Ok(export)
    }

    fn from_folder(root: &Path) -> LoadResult<Self> {
        let mut export = Self::default();
        let lists = root.join("lists");
        if !root.is_dir() {
            return Err(LoadError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        if !lists.is_dir() {
            warn!("No lists folder in {}", root.display());
            return Ok(export);
        }

        let mut folders: Vec<PathBuf> = fs::read_dir(&lists)
            .map_err(|e| LoadError::io(&lists, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        folders.sort();

        for folder in folders {
            let Some(list) = folder.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let files = [
                (folder.join("members").join("members.csv"), ExportFile::Members),
                (folder.join("merge-fields.csv"), ExportFile::MergeFields),
                (folder.join("segments.csv"), ExportFile::Segments),
            ];
            for (path, kind) in files {
                if path.is_file() {
                    let bytes = fs::read(&path).map_err(|e| LoadError::io(&path, e))?;
                    export.add_file(list, kind, &bytes)?;
                }
            }
        }
        Ok(export)
    }

    fn from_zip(path: &Path) -> LoadResult<Self> {
        let archive_error = |e: zip::result::ZipError| LoadError::Archive {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(archive_error)?;
        let mut export = Self::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(archive_error)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().replace('\\', "/");
            let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
            let Some((list, kind)) = classify(&parts) else {
                continue;
            };

            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| LoadError::io(path.join(&name), e))?;
            export.add_file(&list, kind, &bytes)?;
        }
        Ok(export)
    }

    fn add_file(&mut self, list: &str, kind: ExportFile, bytes: &[u8]) -> LoadResult<()> {
        let rows = match parse_bytes_auto(bytes) {
            Ok(parsed) => parsed.rows,
            Err(LoadError::EmptyFile) => return Ok(()),
            Err(e) => return Err(e),
        };
        debug!("List {}: {:?} with {} rows", list, kind, rows.len());

        match kind {
            ExportFile::Members => {
                self.subscribers.extend(rows.into_iter().map(|mut row| {
                    row.insert(LIST_COLUMN, list);
                    row
                }));
            }
            ExportFile::MergeFields => {
                let tags = self.merge_fields.entry(list.to_string()).or_default();
                for row in rows {
                    if let (Some(tag), Some(name)) = (row.text("Tag"), row.text("Name")) {
                        tags.insert(tag, name);
                    }
                }
            }
            ExportFile::Segments => {
                let segments = self.segments.entry(list.to_string()).or_default();
                segments.extend(rows.into_iter().filter_map(|row| {
                    Some(Segment {
                        name: row.text("Name")?,
                        members: row.text_or("Members", ""),
                    })
                }));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Address helpers
// =============================================================================

/// Decode an address cell holding a JSON object. Anything else is empty.
pub fn parse_address(cell: &Cell) -> Map<String, Value> {
    let Some(text) = cell.as_text() else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            debug!("Could not parse address: {}", e);
            Map::new()
        }
    }
}

fn field(address: &Map<String, Value>, key: &str) -> String {
    match address.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

// =============================================================================
// Mapper
// =============================================================================

/// Converts WooCommerce customers and Mailchimp subscribers into Shopify
/// customers.
#[derive(Debug, Clone, Default)]
pub struct CustomerMapper {
    options: CustomerOptions,
    merge_fields: HashMap<String, HashMap<String, String>>,
    segments: HashMap<String, Vec<Segment>>,
}

impl CustomerMapper {
    pub fn new(options: CustomerOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    fn is_subscriber(row: &SourceRow) -> bool {
        row.text(SOURCE_COLUMN).as_deref() == Some(MAILCHIMP)
    }

    fn email_column(row: &SourceRow) -> &'static str {
        if Self::is_subscriber(row) {
            "Email Address"
        } else {
            "Email"
        }
    }

    fn woo_record(row: &SourceRow, email: String) -> ConversionResult<OutputRecord> {
        let billing = parse_address(row.get("Billing Address"));
        let shipping = parse_address(row.get("Shipping Address"));
        let country = field(&billing, "country");
        let code = country_code(&country).unwrap_or_default();
        let state = field(&billing, "state");

        let mut record = OutputRecord::new();
        record.insert("Email".into(), json!(email));
        record.insert(
            "First Name".into(),
            json!(row.text("First Name").unwrap_or_else(|| field(&billing, "first_name"))),
        );
        record.insert(
            "Last Name".into(),
            json!(row.text("Last Name").unwrap_or_else(|| field(&billing, "last_name"))),
        );
        record.insert("Company".into(), json!(field(&billing, "company")));
        record.insert("Phone".into(), json!(clean_phone(&field(&billing, "phone"))));
        record.insert("Address1".into(), json!(field(&billing, "address_1")));
        record.insert("Address2".into(), json!(field(&billing, "address_2")));
        record.insert("City".into(), json!(field(&billing, "city")));
        record.insert("Province".into(), json!(state));
        record.insert("Province Code".into(), json!(state));
        record.insert("Country".into(), json!(country));
        record.insert("Country Code".into(), json!(code));
        record.insert("Zip".into(), json!(field(&billing, "postcode")));
        record.insert("Customer Type".into(), json!("regular"));
        record.insert(
            "Accepts Marketing".into(),
            json!(is_truthy(&row.text_or("Accepts Marketing", "no"))),
        );
        record.insert("Tags".into(), json!("Woocommerce Import"));
        record.insert("Shipping Address1".into(), json!(field(&shipping, "address_1")));
        record.insert("Shipping Address2".into(), json!(field(&shipping, "address_2")));
        record.insert("Shipping City".into(), json!(field(&shipping, "city")));
        record.insert("Shipping Province".into(), json!(field(&shipping, "state")));
        record.insert("Shipping Country".into(), json!(field(&shipping, "country")));
        record.insert("Shipping Zip".into(), json!(field(&shipping, "postcode")));
        record.insert(
            "Shipping Phone".into(),
            json!(clean_phone(&field(&shipping, "phone"))),
        );
        record.insert(
            "Total Spent".into(),
            json!(amount(row, "Total Spent")?.unwrap_or(0.0)),
        );
        record.insert(
            "Total Orders".into(),
            json!(row.number("Order Count").unwrap_or(0.0) as u64),
        );
        record.insert("Notes".into(), json!(row.text_or("Customer Note", "")));
        record.insert(
            "Tax Exempt".into(),
            json!(is_truthy(&row.text_or("Tax Exempt", "no"))),
        );
        Ok(record)
    }

    fn subscriber_record(&self, row: &SourceRow, email: String) -> OutputRecord {
        let list = row.text_or(LIST_COLUMN, "");
        let names = self.merge_fields.get(&list);

        let mut merge: HashMap<String, String> = HashMap::new();
        for (column, cell) in row.iter() {
            if !column.starts_with("MERGE") {
                continue;
            }
            let name = names
                .and_then(|n| n.get(column))
                .cloned()
                .unwrap_or_else(|| column.clone());
            merge.insert(name, cell.as_text().unwrap_or_default());
        }
        let merged = |key: &str| merge.get(key).cloned().unwrap_or_default();

        let raw_email = row.text_or("Email Address", "");
        let mut tags = vec!["MailChimp Import".to_string(), "Newsletter Subscriber".to_string()];
        if let Some(segments) = self.segments.get(&list) {
            tags.extend(
                segments
                    .iter()
                    .filter(|s| s.members.contains(&raw_email))
                    .map(|s| s.name.clone()),
            );
        }

        let mut record = OutputRecord::new();
        record.insert("Email".into(), json!(email));
        record.insert(
            "First Name".into(),
            json!(row.text("First Name").unwrap_or_else(|| merged("First Name"))),
        );
        record.insert(
            "Last Name".into(),
            json!(row.text("Last Name").unwrap_or_else(|| merged("Last Name"))),
        );
        record.insert("Company".into(), json!(merged("Company")));
        record.insert("Phone".into(), json!(clean_phone(&merged("Phone"))));
        record.insert("Address1".into(), json!(merged("Address")));
        record.insert("City".into(), json!(merged("City")));
        record.insert("Province".into(), json!(merged("State")));
        record.insert("Country".into(), json!(merged("Country")));
        record.insert("Zip".into(), json!(merged("Zip")));
        record.insert("Accepts Marketing".into(), json!(true));
        record.insert("Tags".into(), json!(tags.join(", ")));
        record.insert("Customer Type".into(), json!("newsletter_subscriber"));
        record.insert("Marketing Source".into(), json!("MailChimp"));
        record.insert("Subscription Status".into(), json!(row.text_or("Status", "")));
        record.insert("List Name".into(), json!(row.text_or("List Name", "")));
        record.insert("Signup Source".into(), json!(row.text_or("Source", "")));
        record.insert("Last Modified".into(), json!(row.text_or("Last Modified", "")));
        record.insert("Signup Location".into(), json!(row.text_or("IP Signup", "")));
        record
    }
}

impl RecordMapper for CustomerMapper {
    fn tool_name(&self) -> &'static str {
        "customers"
    }

    fn configuration(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or_default()
    }

    fn counters(&self) -> &'static [&'static str] {
        &["woocommerce_customers", "mailchimp_subscribers", "duplicates_skipped"]
    }

    fn read_rows(&mut self, input: Option<&Path>) -> LoadResult<Vec<SourceRow>> {
        let export = self.options.mailchimp_export.clone();
        if input.is_none() && export.is_none() {
            return Err(LoadError::MissingInput(
                "at least one of --woo-file or --mailchimp-folder is required".into(),
            ));
        }

        let mut rows = Vec::new();
        if let Some(path) = input {
            let parsed = parse_csv_file_auto(path)?;
            info!("Processing {} WooCommerce customers", parsed.rows.len());
            rows.extend(parsed.rows.into_iter().map(|mut row| {
                row.insert(SOURCE_COLUMN, WOOCOMMERCE);
                row
            }));
        }
        if let Some(path) = export {
            let export = MailchimpExport::load(&path)?;
            rows.extend(export.subscribers.into_iter().map(|mut row| {
                row.insert(SOURCE_COLUMN, MAILCHIMP);
                row
            }));
            self.merge_fields = export.merge_fields;
            self.segments = export.segments;
        }
        Ok(rows)
    }

    fn validate(&self, row: &SourceRow) -> Result<(), Vec<String>> {
        RowCheck::new(row).email(Self::email_column(row)).finish()
    }

    fn convert(&mut self, row: &SourceRow, ctx: &mut RunContext) -> ConversionResult<Conversion> {
        let email = row.text_or(Self::email_column(row), "").to_lowercase();
        if ctx.seen_keys.contains(&email) {
            debug!("Skipping duplicate customer {}", email);
            ctx.stats.bump("duplicates_skipped");
            return Ok(Conversion::Skip);
        }

        let (record, counter) = if Self::is_subscriber(row) {
            (self.subscriber_record(row, email.clone()), "mailchimp_subscribers")
        } else {
            (Self::woo_record(row, email.clone())?, "woocommerce_customers")
        };
        ctx.seen_keys.insert(email);
        ctx.stats.bump(counter);
        Ok(Conversion::One(record))
    }

    fn row_label(&self, row: &SourceRow) -> String {
        row.label(&["Email", "Email Address", "ID"])
    }
}
