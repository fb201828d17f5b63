//! # Configuration Management
//!
//! Centralized configuration for the wire codec.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - `P2P_WIRE_*` environment overrides via `from_env()`
//!
//! ## Limits
//! - `max_payload_size` may be lowered from the 32 MiB default, never raised
//!   past it; a peer can otherwise make us buffer arbitrary amounts
//! - Timeouts are bounded so a stalled peer cannot hold a reader forever

use crate::core::network::Network;
use crate::error::{Result, WireError};
use crate::protocol::version::ProtocolVersion;
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

pub use crate::core::command::COMMAND_SIZE;
pub use crate::core::envelope::HEADER_SIZE;
pub use crate::protocol::message::{
    MAX_BLOCK_LOCATORS_PER_MSG, MAX_INV_PER_MSG, MAX_USER_AGENT_LEN,
};

/// Highest protocol version this crate speaks
pub const PROTOCOL_VERSION: u32 = ProtocolVersion::LATEST.get();

/// Max allowed payload size (32 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WireConfig {
    #[serde(default)]
    pub codec: CodecConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WireConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| WireError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| WireError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| WireError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `P2P_WIRE_*` environment variables.
    ///
    /// Unparseable values are reported rather than ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(network) = std::env::var("P2P_WIRE_NETWORK") {
            config.codec.network = parse_network(&network)?;
        }

        if let Some(version) = env_number::<u32>("P2P_WIRE_PROTOCOL_VERSION")? {
            config.codec.protocol_version = ProtocolVersion(version);
        }

        if let Some(size) = env_number::<usize>("P2P_WIRE_MAX_PAYLOAD_SIZE")? {
            config.codec.max_payload_size = size;
        }

        if let Some(ms) = env_number::<u64>("P2P_WIRE_READ_TIMEOUT_MS")? {
            config.codec.read_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = env_number::<u64>("P2P_WIRE_WRITE_TIMEOUT_MS")? {
            config.codec.write_timeout = Duration::from_millis(ms);
        }

        if let Ok(level) = std::env::var("P2P_WIRE_LOG_LEVEL") {
            config.logging.log_level = level
                .parse()
                .map_err(|_| WireError::ConfigError(format!("Invalid log level: {level}")))?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WireError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| WireError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.codec.validate();
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WireError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn parse_network(value: &str) -> Result<Network> {
    match value.to_ascii_lowercase().as_str() {
        "mainnet" => Ok(Network::Mainnet),
        "testnet3" | "testnet" => Ok(Network::Testnet3),
        "regtest" => Ok(Network::Regtest),
        "simnet" => Ok(Network::Simnet),
        other => {
            let hex = other.trim_start_matches("0x");
            u32::from_str_radix(hex, 16)
                .map(Network::from_magic)
                .map_err(|_| WireError::ConfigError(format!("Unknown network: {value}")))
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| WireError::ConfigError(format!("Invalid value for {key}: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Codec settings for one connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Network whose magic frames are accepted
    pub network: Network,

    /// Version we advertise and start the connection at
    pub protocol_version: ProtocolVersion,

    /// Largest payload accepted or produced
    pub max_payload_size: usize,

    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    #[serde(with = "duration_serde")]
    pub write_timeout: Duration,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            protocol_version: ProtocolVersion::LATEST,
            max_payload_size: MAX_PAYLOAD_SIZE,
            read_timeout: timeout::DEFAULT_TIMEOUT,
            write_timeout: timeout::DEFAULT_TIMEOUT,
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_payload_size < HEADER_SIZE {
            errors.push(format!(
                "Max payload size too small: {} bytes (minimum: {HEADER_SIZE})",
                self.max_payload_size
            ));
        } else if self.max_payload_size > MAX_PAYLOAD_SIZE {
            errors.push(format!(
                "Max payload size too large: {} bytes (maximum: {MAX_PAYLOAD_SIZE})",
                self.max_payload_size
            ));
        }

        if self.protocol_version < ProtocolVersion::MIN {
            errors.push(format!(
                "Protocol version {} is below the minimum {}",
                self.protocol_version,
                ProtocolVersion::MIN
            ));
        } else if self.protocol_version > ProtocolVersion::LATEST {
            errors.push(format!(
                "Protocol version {} is newer than the latest supported {}",
                self.protocol_version,
                ProtocolVersion::LATEST
            ));
        }

        for (name, value) in [
            ("Read timeout", self.read_timeout),
            ("Write timeout", self.write_timeout),
        ] {
            if value < timeout::MIN_TIMEOUT {
                errors.push(format!(
                    "{name} too short (minimum: {}ms)",
                    timeout::MIN_TIMEOUT.as_millis()
                ));
            } else if value > timeout::MAX_TIMEOUT {
                errors.push(format!(
                    "{name} too long (maximum: {}s)",
                    timeout::MAX_TIMEOUT.as_secs()
                ));
            }
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,

    /// Include the event target (module path) in each line
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("p2p-wire"),
            log_level: Level::INFO,
            json_format: false,
            show_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WireConfig::default().validate().is_empty());
    }

    #[test]
    fn network_names_and_magics() {
        assert_eq!(parse_network("Regtest").unwrap(), Network::Regtest);
        assert_eq!(parse_network("0xd9b4bef9").unwrap(), Network::Mainnet);
        assert_eq!(
            parse_network("deadbeef").unwrap(),
            Network::Custom(0xdead_beef)
        );
        assert!(parse_network("moonnet").is_err());
    }
}
