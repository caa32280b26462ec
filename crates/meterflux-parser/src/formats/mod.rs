mod common;
mod meter_readings_v1;

pub use meter_readings_v1::MeterReadingsV1Parser;

pub(crate) use common::{detect_delimiter, parse_timestamp, parse_value, strip_bom};
