//! # Wi-SUN Error Handling
//!
//! This module defines the WiSunError enum, which represents the different error
//! types that can occur in the wisun-rs crate.

use thiserror::Error;

/// Represents the different error types that can occur in the Wi-SUN crate.
#[derive(Debug, Error)]
pub enum WiSunError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Indicates that no line or notification arrived within the allotted budget.
    #[error("Timed out waiting for modem response")]
    Timeout,

    /// Indicates that the modem reported a command failure.
    #[error("Modem command failed: {0}")]
    ProtocolFail(String),

    /// Indicates a PANA authentication failure (EVENT 24). Internal retry
    /// signal only; never escalates past the driver's connect loop.
    #[error("Route-B authentication failed")]
    AuthFailure,

    /// Indicates an error when decoding an ECHONET Lite frame.
    #[error("Malformed ECHONET Lite frame: {0}")]
    MalformedFrame(String),

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string")]
    InvalidHexString,

    /// Indicates a configuration loading or validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<std::io::Error> for WiSunError {
    fn from(e: std::io::Error) -> Self {
        WiSunError::SerialPortError(e.to_string())
    }
}

impl From<hex::FromHexError> for WiSunError {
    fn from(_: hex::FromHexError) -> Self {
        WiSunError::InvalidHexString
    }
}
