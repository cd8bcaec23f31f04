//! The echonet module contains the ECHONET Lite application-layer codec:
//! frame encoding/decoding and smart-meter property value interpretation.

pub mod frame;
pub mod properties;

pub use frame::{encode_get_request, is_failure_esv, parse_frame, EchonetFrame, Property};
pub use properties::{coefficient_from_edt, cumulative_raw, instantaneous_watt, unit_scale};
