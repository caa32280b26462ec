pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::ParserError;
pub use formats::MeterReadingsV1Parser;
pub use model::{format_timestamp, Delimiter, ParsedReadings, Reading, TIMESTAMP_FORMAT};
pub use registry::{parse_readings, parse_with_parsers, supported_formats, ReadingsParser};

#[cfg(test)]
mod tests;
