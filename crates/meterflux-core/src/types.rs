use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, TransportError, ValidationError};

/// Command understood by the backend import adapter.
pub const IMPORT_COMMAND: &str = "importCSV";

/// The only CSV dialect the builder produces.
pub const IMPORT_FORMAT: &str = meterflux_parser::MeterReadingsV1Parser::FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityType {
    Gas,
    Water,
    Electricity,
    Pv,
}

impl UtilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityType::Gas => "gas",
            UtilityType::Water => "water",
            UtilityType::Electricity => "electricity",
            UtilityType::Pv => "pv",
        }
    }
}

impl fmt::Display for UtilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UtilityType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gas" => Ok(UtilityType::Gas),
            "water" => Ok(UtilityType::Water),
            "electricity" => Ok(UtilityType::Electricity),
            "pv" => Ok(UtilityType::Pv),
            other => Err(format!(
                "unknown utility type '{other}' (expected gas, water, electricity or pv)"
            )),
        }
    }
}

/// Meter or import identifier. Always matches `^[A-Za-z0-9_]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ImportName(String);

impl ImportName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidName {
                name: raw.to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(ValidationError::InvalidName {
                name: raw.to_string(),
                reason: format!(
                    "'{bad}' is not allowed; use only letters, digits and underscores"
                ),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ImportName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ImportName::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Payload of one `importCSV` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(rename = "type")]
    pub utility_type: UtilityType,
    pub meter_name: ImportName,
    /// `data:` URL of the raw file bytes.
    pub content: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawImportResponse {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    first: Option<Value>,
    #[serde(default)]
    last: Option<Value>,
}

/// Bounds may arrive as strings or as epoch numbers; both are kept as text.
fn bound_to_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Decodes an adapter reply into a summary or a backend rejection.
///
/// An `error` field wins over any summary fields sent alongside it. A reply
/// with neither is a transport-level fault.
pub fn decode_response(
    value: Value,
) -> Result<Result<ImportResult, BackendError>, TransportError> {
    let raw: RawImportResponse = serde_json::from_value(value)
        .map_err(|err| TransportError::MalformedResponse(err.to_string()))?;

    if let Some(error) = raw.error {
        let message = match error {
            Value::String(message) => message,
            other => other.to_string(),
        };
        return Ok(Err(BackendError::new(message)));
    }

    match raw.count {
        Some(count) => Ok(Ok(ImportResult {
            count,
            first: bound_to_string(raw.first),
            last: bound_to_string(raw.last),
        })),
        None => Err(TransportError::MalformedResponse(
            "reply carried neither a summary nor an error".to_string(),
        )),
    }
}

/// Wire form of an adapter reply.
pub fn encode_response(outcome: &Result<ImportResult, BackendError>) -> Value {
    match outcome {
        Ok(result) => serde_json::to_value(result)
            .unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() })),
        Err(err) => serde_json::json!({ "error": err.message }),
    }
}
