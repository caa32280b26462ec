use crate::errors::ParserError;
use crate::formats::MeterReadingsV1Parser;
use crate::model::ParsedReadings;

pub trait ReadingsParser {
    /// Format tag carried by import requests that this parser understands.
    fn format(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedReadings, ParserError>;
}

pub fn supported_formats() -> &'static [&'static str] {
    &[MeterReadingsV1Parser::FORMAT]
}

pub fn parse_readings(format: &str, content: &str) -> Result<ParsedReadings, ParserError> {
    let readings_v1 = MeterReadingsV1Parser;
    let parsers: [&dyn ReadingsParser; 1] = [&readings_v1];
    parse_with_parsers(format, content, &parsers)
}

pub fn parse_with_parsers(
    format: &str,
    content: &str,
    parsers: &[&dyn ReadingsParser],
) -> Result<ParsedReadings, ParserError> {
    let parser = parsers
        .iter()
        .find(|parser| parser.format() == format)
        .ok_or_else(|| ParserError::UnsupportedFormat {
            format: format.to_string(),
        })?;
    parser.parse(content)
}
