use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Rendering used for every timestamp that leaves the parser.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }

    /// Semicolon exports come from locales that write `1,5` for one and a half.
    pub fn allows_decimal_comma(&self) -> bool {
        matches!(self, Delimiter::Semicolon)
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct ParsedReadings {
    pub format: &'static str,
    pub delimiter: Delimiter,
    pub header: Option<Vec<String>>,
    /// Sorted by timestamp, no two readings share one.
    pub readings: Vec<Reading>,
}

impl ParsedReadings {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDateTime> {
        self.readings.first().map(|r| r.timestamp)
    }

    pub fn last(&self) -> Option<NaiveDateTime> {
        self.readings.last().map(|r| r.timestamp)
    }
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
