//! Field cleaners.
//!
//! Pure string normalisation shared by the mappers. Every function is
//! deterministic and total: bad input yields an empty or `None` result,
//! never an error.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static NON_HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static NON_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d+]").expect("valid regex"));
static SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
static STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SHORTCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]+\]").expect("valid regex"));
static EMPTY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p>\s*</p>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static GROUPED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid regex"));
static NON_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9_-]").expect("valid regex"));

/// Default maximum discount code length.
pub const MAX_DISCOUNT_CODE_LENGTH: usize = 50;

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Handles and text
// =============================================================================

/// URL-safe slug: lowercase, runs of anything outside `[a-z0-9]` become a
/// single `-`, no leading or trailing `-`. Idempotent.
pub fn clean_handle(text: &str) -> String {
    NON_HANDLE
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Product descriptions: HTML reduced to plain text.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = html
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"");
    let text = SCRIPT.replace_all(&text, "");
    let text = STYLE.replace_all(&text, "");
    let text = text.replace("</p>", "</p>\n").replace("<br", "\n<br");
    let text = SHORTCODE.replace_all(&text, "");
    let text = TAG.replace_all(&text, "");

    collapse_whitespace(&text)
}

/// Review bodies: tags removed, whitespace collapsed.
pub fn strip_tags(text: &str) -> String {
    collapse_whitespace(&TAG.replace_all(text, ""))
}

/// Collection descriptions: shortcodes and empty paragraphs removed,
/// markup otherwise kept.
pub fn tidy_html(html: &str) -> String {
    let html = SHORTCODE.replace_all(html, "");
    let html = EMPTY_PARAGRAPH.replace_all(&html, "");
    collapse_whitespace(&html)
}

/// `yes`, `true` and `1` (any case) are true.
pub fn is_truthy(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "yes" | "true" | "1")
}

// =============================================================================
// Phones, prices, dates
// =============================================================================

/// Keep digits and `+`. A bare 10-digit number is assumed North American
/// and gets `+1`; numbers already starting with `+` are never re-prefixed.
pub fn clean_phone(raw: &str) -> String {
    let phone = NON_PHONE.replace_all(raw, "").to_string();
    if !phone.starts_with('+') && phone.len() == 10 {
        format!("+1{}", phone)
    } else {
        phone
    }
}

/// Amount from a money cell. Tolerates a currency symbol and `,`
/// thousands grouping (`$1,234.56`); anything else yields `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_start_matches(['$', '€', '£', '¥']).trim();
    let plain = if GROUPED_NUMBER.is_match(trimmed) {
        trimmed.replace(',', "")
    } else {
        trimmed.to_string()
    };
    plain.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Absolute URL with a host, e.g. an image source Shopify can fetch.
pub fn is_absolute_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|url| url.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false)
}

/// Money with two decimals.
pub fn format_price(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Normalise a date to `YYYY-MM-DD HH:MM:SS`. Unknown formats yield `None`.
pub fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.format(OUTPUT_DATE_FORMAT).to_string());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.format(OUTPUT_DATE_FORMAT).to_string());
        }
    }
    None
}

// =============================================================================
// Discount codes
// =============================================================================

/// A normalised discount code and whether it had to be cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedCode {
    pub code: String,
    pub truncated: bool,
}

/// Uppercase, keep `[A-Z0-9_-]`, cut at `max_len` characters.
pub fn discount_code(raw: &str, max_len: usize) -> CleanedCode {
    let cleaned = NON_CODE.replace_all(&raw.to_uppercase(), "").to_string();
    if cleaned.len() > max_len {
        CleanedCode {
            code: cleaned[..max_len].to_string(),
            truncated: true,
        }
    } else {
        CleanedCode {
            code: cleaned,
            truncated: false,
        }
    }
}

/// [`discount_code`] with the default length limit.
pub fn clean_discount_code(raw: &str) -> String {
    discount_code(raw, MAX_DISCOUNT_CODE_LENGTH).code
}
