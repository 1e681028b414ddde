//! Country name to ISO 3166-1 alpha-2 lookup.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static COUNTRY_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // North America
        ("UNITED STATES", "US"),
        ("UNITED STATES OF AMERICA", "US"),
        ("USA", "US"),
        ("U.S.A.", "US"),
        ("U.S.", "US"),
        ("CANADA", "CA"),
        ("MEXICO", "MX"),
        // Europe
        ("UNITED KINGDOM", "GB"),
        ("UK", "GB"),
        ("GREAT BRITAIN", "GB"),
        ("ENGLAND", "GB"),
        ("GERMANY", "DE"),
        ("FRANCE", "FR"),
        ("ITALY", "IT"),
        ("SPAIN", "ES"),
        ("NETHERLANDS", "NL"),
        ("BELGIUM", "BE"),
        ("SWITZERLAND", "CH"),
        ("SWEDEN", "SE"),
        ("NORWAY", "NO"),
        ("DENMARK", "DK"),
        ("FINLAND", "FI"),
        ("IRELAND", "IE"),
        // Asia Pacific
        ("AUSTRALIA", "AU"),
        ("NEW ZEALAND", "NZ"),
        ("JAPAN", "JP"),
        ("CHINA", "CN"),
        ("HONG KONG", "HK"),
        ("SINGAPORE", "SG"),
        ("SOUTH KOREA", "KR"),
        ("KOREA", "KR"),
        ("TAIWAN", "TW"),
    ])
});

/// Two-letter code for a country name or code.
///
/// Two-character input is taken as a code already and uppercased.
pub fn country_code(country: &str) -> Option<String> {
    let cleaned = country.trim().to_uppercase();
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.chars().count() == 2 {
        return Some(cleaned);
    }
    COUNTRY_CODES.get(cleaned.as_str()).map(|code| code.to_string())
}

/// The code when the country is recognised, otherwise the input unchanged.
pub fn normalize_country(country: &str) -> String {
    country_code(country).unwrap_or_else(|| country.trim().to_string())
}
