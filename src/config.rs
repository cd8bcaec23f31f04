//! Route-B credential and serial port configuration.
//!
//! Credentials are issued per meter by the utility and loaded from a JSON
//! file; nothing here is persisted back by the crate.

use crate::constants::MODEM_BAUDRATE;
use crate::error::WiSunError;
use serde::Deserialize;
use std::path::Path;

/// Configuration for the modem serial link and Route-B session.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteBConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0")
    pub port: String,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    /// Route-B authentication id (32 hex chars, issued by the utility)
    pub route_b_id: String,
    /// Route-B password (12 chars, issued by the utility)
    pub route_b_password: String,
}

fn default_baudrate() -> u32 {
    MODEM_BAUDRATE
}

impl RouteBConfig {
    /// Loads the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<RouteBConfig, WiSunError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WiSunError::ConfigError(format!("{}: {e}", path.as_ref().display())))?;
        let config: RouteBConfig =
            serde_json::from_str(&raw).map_err(|e| WiSunError::ConfigError(e.to_string()))?;
        if config.route_b_id.is_empty() || config.route_b_password.is_empty() {
            return Err(WiSunError::ConfigError(
                "route_b_id and route_b_password must be set".into(),
            ));
        }
        Ok(config)
    }
}
