use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// `{adapter}.{instance}`, e.g. `meterflux.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdapterAddress {
    adapter: String,
    instance: u32,
}

impl AdapterAddress {
    pub fn new(adapter: impl Into<String>, instance: u32) -> Result<Self, String> {
        let adapter = adapter.into();
        if adapter.is_empty()
            || !adapter
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("invalid adapter name '{adapter}'"));
        }
        Ok(Self { adapter, instance })
    }

    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }
}

impl fmt::Display for AdapterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.adapter, self.instance)
    }
}

impl FromStr for AdapterAddress {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (adapter, instance) = trimmed
            .rsplit_once('.')
            .ok_or_else(|| format!("adapter address '{trimmed}' must look like name.instance"))?;
        let instance = instance
            .parse::<u32>()
            .map_err(|err| format!("adapter address '{trimmed}' has a bad instance: {err}"))?;
        AdapterAddress::new(adapter, instance)
    }
}

impl TryFrom<String> for AdapterAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AdapterAddress> for String {
    fn from(value: AdapterAddress) -> Self {
        value.to_string()
    }
}

/// Request/response channel to backend adapter instances.
///
/// One call sends exactly one message and resolves with exactly one reply.
/// Implementations own timeout policy and report it as
/// [`TransportError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        to: &AdapterAddress,
        command: &str,
        message: Value,
    ) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(
        &self,
        to: &AdapterAddress,
        command: &str,
        message: Value,
    ) -> Result<Value, TransportError> {
        (**self).send(to, command, message).await
    }
}
