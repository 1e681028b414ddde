//! CSV reading and writing with encoding and delimiter auto-detection.
//!
//! Rows come out as [`SourceRow`]s and go back in as [`OutputRecord`]s.
//! No platform-specific logic here.

pub mod mapping;
pub mod slot;

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{LoadError, LoadResult, WriteError, WriteResult};
use crate::models::{Cell, OutputRecord, SourceRow};

pub use mapping::{load_mapping, load_records};
pub use slot::{parse_addon_prices, parse_slot, ParsedSlot};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub rows: Vec<SourceRow>,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
    /// Column headers, trimmed
    pub headers: Vec<String>,
}

// =============================================================================
// Detection
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with the given encoding. Unknown encodings fall back to
/// lossy UTF-8. A leading BOM is dropped.
///
/// Latin-1 is decoded as Windows-1252, which agrees with ISO-8859-1 on every
/// printable byte and only differs in the 0x80-0x9F control range.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the first line.
/// Ties and header lines without any separator resolve to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// Reading
// =============================================================================

/// Parse CSV text with an explicit delimiter.
///
/// Short rows are padded with absent cells, extra cells are ignored and
/// rows with no content at all are skipped.
pub fn parse_str(content: &str, delimiter: char) -> LoadResult<(Vec<String>, Vec<SourceRow>)> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::Parse {
            line: 1,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeaders);
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::Parse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 2),
            message: e.to_string(),
        })?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row = SourceRow::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = record.get(i).map(Cell::from_raw).unwrap_or_default();
            row.insert(header.clone(), cell);
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> LoadResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let (headers, rows) = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> LoadResult<ParseResult> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| LoadError::io(path, e))?;
    let result = parse_bytes_auto(&bytes)?;
    debug!(
        "Parsed {}: encoding {}, delimiter '{}', {} rows",
        path.display(),
        result.encoding,
        format_delimiter(result.delimiter),
        result.rows.len()
    );
    Ok(result)
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

// =============================================================================
// Writing
// =============================================================================

/// Columns of a set of records: union of keys in first-seen order.
pub fn collect_columns(records: &[OutputRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Write records as a comma-separated UTF-8 file.
pub fn write_csv(records: &[OutputRecord], path: &Path) -> WriteResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| WriteError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source: csv::Error| WriteError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let columns = collect_columns(records);
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(&columns).map_err(csv_err)?;

    for record in records {
        let line: Vec<String> = columns.iter().map(|c| cell_text(record.get(c))).collect();
        writer.write_record(&line).map_err(csv_err)?;
    }

    writer.flush().map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
