use std::env;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::payload::DEFAULT_MAX_FILE_BYTES;
use crate::transport::AdapterAddress;

pub const ADAPTER_VAR: &str = "METERFLUX_ADAPTER";
pub const TIMEOUT_VAR: &str = "METERFLUX_TIMEOUT_SECS";
pub const MAX_FILE_BYTES_VAR: &str = "METERFLUX_MAX_FILE_BYTES";
pub const BIND_VAR: &str = "METERFLUX_BIND";

pub const DEFAULT_ADAPTER: &str = "meterflux.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub adapter: AdapterAddress,
    pub timeout: Duration,
    pub max_file_bytes: usize,
    /// Listen address of the HTTP upload API.
    pub bind: SocketAddr,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            adapter: DEFAULT_ADAPTER
                .parse()
                .expect("default adapter address is valid"),
            timeout: DEFAULT_TIMEOUT,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            bind: DEFAULT_BIND,
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ADAPTER_VAR) {
            config.adapter = raw.parse().map_err(|message| ConfigError::Invalid {
                var: ADAPTER_VAR,
                message,
            })?;
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    message: err.to_string(),
                })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    message: "timeout must be at least one second".to_string(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(MAX_FILE_BYTES_VAR) {
            config.max_file_bytes =
                raw.trim()
                    .parse::<usize>()
                    .map_err(|err| ConfigError::Invalid {
                        var: MAX_FILE_BYTES_VAR,
                        message: err.to_string(),
                    })?;
        }

        if let Some(raw) = lookup(BIND_VAR) {
            config.bind = raw.trim().parse().map_err(|err: AddrParseError| {
                ConfigError::Invalid {
                    var: BIND_VAR,
                    message: err.to_string(),
                }
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ImportConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.adapter.to_string(), DEFAULT_ADAPTER);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = ImportConfig::from_lookup(lookup(&[
            (ADAPTER_VAR, "energy-import.2"),
            (TIMEOUT_VAR, "5"),
            (MAX_FILE_BYTES_VAR, "2048"),
            (BIND_VAR, "0.0.0.0:9000"),
        ]))
        .expect("config");
        assert_eq!(config.adapter.adapter(), "energy-import");
        assert_eq!(config.adapter.instance(), 2);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_file_bytes, 2048);
        assert_eq!(config.bind.port(), 9000);
        assert!(config.bind.ip().is_unspecified());
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = ImportConfig::from_lookup(lookup(&[(ADAPTER_VAR, "no-instance")])).unwrap_err();
        assert!(err.to_string().starts_with(ADAPTER_VAR));

        let err = ImportConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains("at least one second"));

        let err = ImportConfig::from_lookup(lookup(&[(BIND_VAR, "localhost")])).unwrap_err();
        assert!(err.to_string().starts_with(BIND_VAR));
    }
}
