//! Smart-meter property value interpretation.
//!
//! Raw EDT payloads decoded by the frame codec are turned into typed values
//! here. Anything that does not match the expected payload shape degrades to
//! `None` so a bad notification never aborts the polling loop.

/// Decodes the instantaneous power property (EPC 0xE7, 2-byte big-endian watt).
pub fn instantaneous_watt(edt: &[u8]) -> Option<u32> {
    if edt.len() != 2 {
        return None;
    }
    Some(u32::from(u16::from_be_bytes([edt[0], edt[1]])))
}

/// Extracts the raw cumulative reading from the EPC 0xEA payload.
///
/// The 11-byte payload carries a timestamp in bytes 0..7 and the cumulative
/// counter as a big-endian integer in bytes 7..11. The counter is meaningless
/// without the coefficient and unit scale.
pub fn cumulative_raw(edt: &[u8]) -> Option<u32> {
    if edt.len() < 11 {
        return None;
    }
    Some(u32::from_be_bytes([edt[7], edt[8], edt[9], edt[10]]))
}

/// Decodes the coefficient property (EPC 0xD3, big-endian integer).
///
/// Meters that do not report the property use a coefficient of 1; callers
/// apply the same default when the read times out.
pub fn coefficient_from_edt(edt: &[u8]) -> u32 {
    if edt.is_empty() || edt.len() > 4 {
        return 1;
    }
    edt.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

/// Maps the cumulative-unit property code (EPC 0xE1) to a decimal scale
/// factor: 0..=4 scale down by powers of ten, 0xA..=0xD scale up, anything
/// else falls back to 1.
pub fn unit_scale(code: u8) -> f64 {
    match code {
        0x00 => 1.0,
        0x01 => 0.1,
        0x02 => 0.01,
        0x03 => 0.001,
        0x04 => 0.0001,
        0x0A => 10.0,
        0x0B => 100.0,
        0x0C => 1000.0,
        0x0D => 10000.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantaneous_watt_decodes_big_endian() {
        assert_eq!(instantaneous_watt(&[0x01, 0xF4]), Some(500));
        assert_eq!(instantaneous_watt(&[0x00, 0x00]), Some(0));
    }

    #[test]
    fn test_instantaneous_watt_rejects_wrong_length() {
        assert_eq!(instantaneous_watt(&[0x01]), None);
        assert_eq!(instantaneous_watt(&[0x01, 0x02, 0x03]), None);
    }

    #[test]
    fn test_cumulative_raw_reads_tail_bytes() {
        let mut edt = vec![0u8; 7];
        edt.extend_from_slice(&[0x00, 0x01, 0x86, 0xA0]);
        assert_eq!(cumulative_raw(&edt), Some(100_000));
    }

    #[test]
    fn test_cumulative_raw_rejects_short_payload() {
        assert_eq!(cumulative_raw(&[0u8; 10]), None);
    }

    #[test]
    fn test_coefficient_defaults_to_one() {
        assert_eq!(coefficient_from_edt(&[]), 1);
        assert_eq!(coefficient_from_edt(&[0, 0, 0, 0, 1]), 1);
    }

    #[test]
    fn test_coefficient_big_endian() {
        assert_eq!(coefficient_from_edt(&[0x00, 0x00, 0x00, 0x0A]), 10);
        assert_eq!(coefficient_from_edt(&[0x01]), 1);
    }

    #[test]
    fn test_unit_scale_boundaries() {
        assert_eq!(unit_scale(0x00), 1.0);
        assert_eq!(unit_scale(0x04), 0.0001);
        assert_eq!(unit_scale(0x0A), 10.0);
        assert_eq!(unit_scale(0x0D), 10000.0);
        assert_eq!(unit_scale(0x0E), 1.0);
        assert_eq!(unit_scale(0x05), 1.0);
    }
}
