//! Unit tests for the `echonet::frame` module: encoding Get requests,
//! decoding response frames, and service-code classification.

use proptest::prelude::*;
use wisun_rs::constants::{
    EPC_CUMULATIVE_WATT_HOUR, EPC_INSTANTANEOUS_WATT, ESV_GET, ESV_GET_RES, ESV_GET_SNA,
};
use wisun_rs::{encode_get_request, is_failure_esv, parse_frame, WiSunError};

/// Tests that a Get request carries the fixed header and one empty property.
#[test]
fn test_encode_get_request_fixed_layout() {
    let bytes = encode_get_request(EPC_INSTANTANEOUS_WATT);
    assert_eq!(bytes.len(), 14);
    assert_eq!(&bytes[0..2], &[0x10, 0x81]); // EHD
    assert_eq!(&bytes[2..4], &[0x00, 0x01]); // TID
    assert_eq!(&bytes[4..7], &[0x05, 0xFF, 0x01]); // SEOJ controller
    assert_eq!(&bytes[7..10], &[0x02, 0x88, 0x01]); // DEOJ smart meter
    assert_eq!(bytes[10], ESV_GET);
    assert_eq!(bytes[11], 0x01); // OPC
    assert_eq!(bytes[12], EPC_INSTANTANEOUS_WATT);
    assert_eq!(bytes[13], 0x00); // PDC
}

/// Tests that encoding is deterministic: the transaction id never changes.
#[test]
fn test_encode_get_request_is_deterministic() {
    assert_eq!(
        encode_get_request(EPC_CUMULATIVE_WATT_HOUR),
        encode_get_request(EPC_CUMULATIVE_WATT_HOUR)
    );
}

/// Tests that a frame with two properties decodes to both, in order.
#[test]
fn test_decode_two_property_frame() {
    let watt_payload = [0x02, 0x30];
    let cumulative_payload: Vec<u8> = (1u8..=11).collect();
    let mut frame = vec![0x10, 0x81, 0x00, 0x01, 0x02, 0x88, 0x01, 0x05, 0xFF, 0x01];
    frame.push(ESV_GET_RES);
    frame.push(0x02);
    frame.push(EPC_INSTANTANEOUS_WATT);
    frame.push(0x02);
    frame.extend_from_slice(&watt_payload);
    frame.push(EPC_CUMULATIVE_WATT_HOUR);
    frame.push(0x0B);
    frame.extend_from_slice(&cumulative_payload);

    let decoded = parse_frame(&frame).unwrap();
    assert_eq!(decoded.esv, ESV_GET_RES);
    assert_eq!(decoded.properties.len(), 2);
    assert_eq!(decoded.properties[0].epc, EPC_INSTANTANEOUS_WATT);
    assert_eq!(decoded.properties[0].edt, watt_payload);
    assert_eq!(decoded.properties[1].epc, EPC_CUMULATIVE_WATT_HOUR);
    assert_eq!(decoded.properties[1].edt, cumulative_payload);
}

/// Tests that failure service codes are exactly the 0x5_ range.
#[test]
fn test_failure_esv_classification() {
    assert!(is_failure_esv(ESV_GET_SNA));
    assert!(is_failure_esv(0x50));
    assert!(is_failure_esv(0x5F));
    assert!(!is_failure_esv(ESV_GET_RES));
    assert!(!is_failure_esv(ESV_GET));
    assert!(!is_failure_esv(0x60));
    assert!(!is_failure_esv(0x4F));
}

/// Tests that a property declaring more payload than remains is rejected
/// rather than sliced out of bounds.
#[test]
fn test_truncated_property_is_malformed() {
    let mut frame = vec![0x10, 0x81, 0x00, 0x01, 0x02, 0x88, 0x01, 0x05, 0xFF, 0x01];
    frame.push(ESV_GET_RES);
    frame.push(0x01);
    frame.push(EPC_CUMULATIVE_WATT_HOUR);
    frame.push(0x0B); // declares 11 bytes
    frame.extend_from_slice(&[0x00, 0x01, 0x02]); // only 3 remain

    let result = parse_frame(&frame);
    assert!(matches!(result, Err(WiSunError::MalformedFrame(_))));
}

/// Tests that a header shorter than 12 bytes is rejected.
#[test]
fn test_short_header_is_malformed() {
    let result = parse_frame(&[0x10, 0x81, 0x00]);
    assert!(matches!(result, Err(WiSunError::MalformedFrame(_))));
}

proptest! {
    /// Round-trip: decoding an encoded Get request yields the Get service
    /// code and the single requested property with an empty payload.
    #[test]
    fn prop_get_request_round_trip(epc in 0u8..=255) {
        let decoded = parse_frame(&encode_get_request(epc)).unwrap();
        prop_assert_eq!(decoded.esv, ESV_GET);
        prop_assert_eq!(decoded.properties.len(), 1);
        prop_assert_eq!(decoded.properties[0].epc, epc);
        prop_assert!(decoded.properties[0].edt.is_empty());
    }
}
