use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::ParserError;
use crate::model::Delimiter;

pub(crate) const UTF8_BOM: char = '\u{feff}';

pub(crate) fn strip_bom(content: &str) -> &str {
    content.strip_prefix(UTF8_BOM).unwrap_or(content)
}

pub(crate) fn detect_delimiter(
    parser: &'static str,
    content: &str,
) -> Result<Delimiter, ParserError> {
    let Some(line) = content.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return Err(ParserError::EmptyData { parser });
    };

    let semicolons = line.matches(';').count();
    let commas = line.matches(',').count();
    match (semicolons, commas) {
        (0, 0) => Err(ParserError::FormatMismatch {
            parser,
            reason: format!("expected a timestamp and a value column, found '{line}'"),
        }),
        (s, c) if s >= c => Ok(Delimiter::Semicolon),
        _ => Ok(Delimiter::Comma),
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    static DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
    ];
    static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

pub(crate) fn parse_value(
    parser: &'static str,
    value: &str,
    delimiter: Delimiter,
    line_index: usize,
) -> Result<f64, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParserError::DataRow {
            parser,
            line_index,
            message: "missing value".to_string(),
        });
    }

    let normalized = if delimiter.allows_decimal_comma() && trimmed.contains(',') {
        // `1.234,5` carries a thousands separator
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    match normalized.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        Ok(_) => Err(ParserError::DataRow {
            parser,
            line_index,
            message: format!("value '{trimmed}' is not a finite number"),
        }),
        Err(err) => Err(ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse value '{trimmed}': {err}"),
        }),
    }
}
