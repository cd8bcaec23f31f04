//! # wisun-rs - A Rust Crate for Wi-SUN Route-B Smart Meter Communication
//!
//! The wisun-rs crate reads electricity usage from a low-voltage smart meter
//! over a Wi-SUN Route-B link, by driving a BP35-class modem through its
//! line-oriented SKSTACK command set and decoding ECHONET Lite property
//! frames.
//!
//! ## Features
//!
//! - Drive the modem from power-on to an authenticated point-to-point
//!   session with the meter (scan, channel registers, PANA join)
//! - Encode ECHONET Lite Get requests and decode response frames into typed
//!   property lists
//! - Poll instantaneous power and cumulative energy continuously, with
//!   automatic session re-establishment when the meter goes quiet
//! - Fetch the meter's coefficient and unit-scale calibration constants
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! To use the wisun-rs crate in your Rust project, add the following to your
//! Cargo.toml file:
//!
//! ```toml
//! [dependencies]
//! wisun-rs = "0.3"
//! ```
//!
//! Then, in your Rust code, you can import the necessary modules and types:
//!
//! ```rust
//! use wisun_rs::{
//!     connect_meter, init_logger, MeterPoller, ReadingSink,
//!     RouteBConfig, WiSunError,
//! };
//! ```

pub mod config;
pub mod constants;
pub mod echonet;
pub mod error;
pub mod logging;
pub mod modem;
pub mod poller;

pub use crate::config::RouteBConfig;
pub use crate::error::WiSunError;
pub use crate::logging::{init_logger, log_info};

// Core codec and modem types
pub use echonet::{encode_get_request, is_failure_esv, parse_frame, EchonetFrame, Property};
pub use modem::driver::{ModemHandle, PanDescriptor, SessionState};
pub use modem::line::{parse_line, ResponseLine};
pub use modem::serial::{open_port, SerialPort};

// Polling loop and its seams
pub use poller::{
    fetch_calibration, read_property, Calibration, Dispatch, FrameHandler, MeterPoller, Modem,
    ReadingSink,
};

/// Opens the configured serial port and brings the modem to a joined
/// Route-B session.
///
/// # Arguments
/// * `config` - Serial port path and Route-B credentials
///
/// # Returns
/// * `Ok(ModemHandle)` - Joined modem handle ready for polling
/// * `Err(WiSunError)` - Port, configuration, or session establishment failed
pub async fn connect_meter(
    config: &RouteBConfig,
) -> Result<ModemHandle<tokio_serial::SerialStream>, WiSunError> {
    let port = modem::serial::open_port(&config.port, config.baudrate)?;
    let mut handle = ModemHandle::new(
        port,
        config.route_b_id.clone(),
        config.route_b_password.clone(),
    );
    handle.initialize().await?;
    handle.connect().await?;
    Ok(handle)
}
