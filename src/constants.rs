//! Wi-SUN Route-B / ECHONET Lite Protocol Constants
//!
//! This module defines constants used by the SKSTACK modem driver and the
//! ECHONET Lite codec, based on the ECHONET Lite specification (Appendix,
//! low-voltage smart electric energy meter class) and the Route-B profile.

use std::time::Duration;

// ----------------------------------------------------------------------------
// ECHONET Lite frame layout
// ----------------------------------------------------------------------------

/// ECHONET Lite header byte 1 (EHD1, conventional format)
pub const ECHONET_EHD1: u8 = 0x10;

/// ECHONET Lite header byte 2 (EHD2, format 1)
pub const ECHONET_EHD2: u8 = 0x81;

/// Transaction id used for all outgoing requests. Constant: exactly one
/// request is outstanding at a time and correlation is done by EPC.
pub const ECHONET_TID: [u8; 2] = [0x00, 0x01];

/// Source ECHONET object: controller class, instance 1
pub const ECHONET_SEOJ_CONTROLLER: [u8; 3] = [0x05, 0xFF, 0x01];

/// Destination ECHONET object: low-voltage smart electric energy meter, instance 1
pub const ECHONET_DEOJ_SMART_METER: [u8; 3] = [0x02, 0x88, 0x01];

/// Fixed header length (EHD1 EHD2 TID SEOJ DEOJ ESV OPC)
pub const ECHONET_HEADER_LEN: usize = 12;

// Service (ESV) codes
pub const ESV_GET: u8 = 0x62;
pub const ESV_GET_RES: u8 = 0x72;
pub const ESV_GET_SNA: u8 = 0x52;

// Property (EPC) codes for the smart meter class
pub const EPC_COEFFICIENT: u8 = 0xD3;
pub const EPC_CUMULATIVE_UNIT: u8 = 0xE1;
pub const EPC_INSTANTANEOUS_WATT: u8 = 0xE7;
pub const EPC_CUMULATIVE_WATT_HOUR: u8 = 0xEA;

/// UDP port ECHONET Lite traffic is delivered on; ERXUDP lines from any
/// other source port are dropped.
pub const ECHONET_UDP_PORT: u16 = 0x0E1A;

// ----------------------------------------------------------------------------
// SKSTACK line protocol
// ----------------------------------------------------------------------------

/// Prefix of diagnostic lines the modem interleaves with responses
pub const DIAGNOSTIC_PREFIX: &str = "SK";

// Asynchronous event codes (hex text in EVENT lines)
pub const EVENT_SCAN_COMPLETE: &str = "22";
pub const EVENT_AUTH_FAILED: &str = "24";
pub const EVENT_AUTH_SUCCEEDED: &str = "25";

// Required PAN descriptor keys accumulated during a scan
pub const PAN_KEY_CHANNEL: &str = "Channel";
pub const PAN_KEY_PAN_ID: &str = "Pan ID";
pub const PAN_KEY_ADDR: &str = "Addr";

// ----------------------------------------------------------------------------
// Timing and retry policy
// ----------------------------------------------------------------------------

/// Initial active-scan duration register value
pub const SCAN_DURATION_INITIAL: u8 = 6;

/// Ceiling for the scan duration growth on empty scan rounds
pub const SCAN_DURATION_MAX: u8 = 9;

/// Delay before re-scanning after a PANA authentication failure
pub const AUTH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Budget for waiting on a single mandatory command response
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Total notification budget for one polling cycle
pub const CYCLE_BUDGET: Duration = Duration::from_secs(20);

/// Consecutive empty cycles tolerated before a forced reconnect
pub const EMPTY_CYCLE_LIMIT: u32 = 5;

/// Serial line rate of the BP35-class modem
pub const MODEM_BAUDRATE: u32 = 115_200;
