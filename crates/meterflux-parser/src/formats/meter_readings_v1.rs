use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::ParserError;
use crate::model::{format_timestamp, ParsedReadings, Reading};
use crate::registry::ReadingsParser;

use super::{detect_delimiter, parse_timestamp, parse_value, strip_bom};

/// Two-column `timestamp,value` exports as written by meter portals and
/// spreadsheet tools. Extra columns are ignored.
pub struct MeterReadingsV1Parser;

impl Default for MeterReadingsV1Parser {
    fn default() -> Self {
        Self
    }
}

impl MeterReadingsV1Parser {
    pub const FORMAT: &'static str = "meter_readings_v1";
    const NAME: &'static str = "METER_READINGS_V1";

    fn line_of(record: &StringRecord, fallback: usize) -> usize {
        record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(fallback)
    }

    fn is_blank(record: &StringRecord) -> bool {
        record.iter().all(|field| field.trim().is_empty())
    }
}

impl ReadingsParser for MeterReadingsV1Parser {
    fn format(&self) -> &'static str {
        Self::FORMAT
    }

    fn parse(&self, content: &str) -> Result<ParsedReadings, ParserError> {
        let content = strip_bom(content);
        let delimiter = detect_delimiter(Self::NAME, content)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(delimiter.as_byte())
            .from_reader(content.as_bytes());

        let mut header = None;
        let mut seen_first = false;
        let mut by_timestamp: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();

        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|source| ParserError::Csv {
                parser: Self::NAME,
                source,
            })?;
            if Self::is_blank(&record) {
                continue;
            }
            let line_index = Self::line_of(&record, index + 1);

            if record.len() < 2 {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected a timestamp and a value column, found {} field(s)",
                        record.len()
                    ),
                });
            }

            let raw_timestamp = record.get(0).unwrap_or_default();
            let timestamp = match parse_timestamp(raw_timestamp) {
                Some(ts) => ts,
                None if !seen_first => {
                    seen_first = true;
                    header = Some(record.iter().map(str::to_string).collect());
                    continue;
                }
                None => {
                    return Err(ParserError::DataRow {
                        parser: Self::NAME,
                        line_index,
                        message: format!("invalid timestamp '{raw_timestamp}'"),
                    });
                }
            };
            seen_first = true;

            let value = parse_value(
                Self::NAME,
                record.get(1).unwrap_or_default(),
                delimiter,
                line_index,
            )?;

            if let Some((_, previous_line)) = by_timestamp.insert(timestamp, (value, line_index)) {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "duplicate timestamp {} (first seen on line {previous_line})",
                        format_timestamp(timestamp)
                    ),
                });
            }
        }

        if by_timestamp.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let readings = by_timestamp
            .into_iter()
            .map(|(timestamp, (value, _))| Reading { timestamp, value })
            .collect();

        Ok(ParsedReadings {
            format: Self::FORMAT,
            delimiter,
            header,
            readings,
        })
    }
}
