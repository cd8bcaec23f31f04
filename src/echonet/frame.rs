//! # ECHONET Lite Frame Codec
//!
//! This module provides functionality to encode and decode ECHONET Lite
//! frames as exchanged with a low-voltage smart electric energy meter over
//! the Route-B link. It leverages the `nom` crate for reliable parsing of
//! the binary property list.
//!
//! A frame is a 12-byte fixed header (EHD1, EHD2, TID, SEOJ, DEOJ, ESV, OPC)
//! followed by OPC properties, each an (EPC, PDC, EDT) triple. Decoding never
//! reads past the end of the buffer: a property declaring more payload bytes
//! than remain yields `WiSunError::MalformedFrame`.

use crate::constants::{
    ECHONET_DEOJ_SMART_METER, ECHONET_EHD1, ECHONET_EHD2, ECHONET_HEADER_LEN,
    ECHONET_SEOJ_CONTROLLER, ECHONET_TID, ESV_GET,
};
use crate::error::WiSunError;
use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

/// Represents a decoded ECHONET Lite frame.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EchonetFrame {
    pub tid: [u8; 2],
    pub seoj: [u8; 3],
    pub deoj: [u8; 3],
    pub esv: u8,
    pub properties: Vec<Property>,
}

/// A single (EPC, EDT) property carried in a frame. The wire-level PDC is
/// implied by `edt.len()`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Property {
    pub epc: u8,
    pub edt: Vec<u8>,
}

/// Builds a Get request frame for a single property with an empty payload.
///
/// Deterministic: the transaction id is constant, so the same EPC always
/// yields identical bytes. Response correlation is done by EPC, which is
/// safe because exactly one request is outstanding at a time.
pub fn encode_get_request(epc: u8) -> Vec<u8> {
    // Header plus one empty (EPC, PDC) property.
    let mut buf = BytesMut::with_capacity(ECHONET_HEADER_LEN + 2);
    buf.put_u8(ECHONET_EHD1);
    buf.put_u8(ECHONET_EHD2);
    buf.put_slice(&ECHONET_TID);
    buf.put_slice(&ECHONET_SEOJ_CONTROLLER);
    buf.put_slice(&ECHONET_DEOJ_SMART_METER);
    buf.put_u8(ESV_GET);
    buf.put_u8(0x01); // OPC
    buf.put_u8(epc);
    buf.put_u8(0x00); // PDC: Get carries no payload
    buf.to_vec()
}

/// Parses an ECHONET Lite frame from a byte slice.
pub fn parse_frame(input: &[u8]) -> Result<EchonetFrame, WiSunError> {
    match parse_frame_bytes(input) {
        Ok((_, frame)) => Ok(frame),
        Err(e) => Err(WiSunError::MalformedFrame(format!("{e:?}"))),
    }
}

/// True iff the service code denotes a failure response (high nibble 0x5).
pub fn is_failure_esv(esv: u8) -> bool {
    esv >> 4 == 0x5
}

/// Uses the `nom` crate to parse the fixed header and the property list.
fn parse_frame_bytes(input: &[u8]) -> IResult<&[u8], EchonetFrame> {
    let (input, ehd1) = be_u8(input)?;
    let (input, ehd2) = be_u8(input)?;
    if ehd1 != ECHONET_EHD1 || ehd2 != ECHONET_EHD2 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    let (input, tid) = take(2usize)(input)?;
    let (input, seoj) = take(3usize)(input)?;
    let (input, deoj) = take(3usize)(input)?;
    let (input, esv) = be_u8(input)?;
    let (mut input, opc) = be_u8(input)?;

    let mut properties = Vec::with_capacity(opc as usize);
    for _ in 0..opc {
        let (i, epc) = be_u8(input)?;
        let (i, pdc) = be_u8(i)?;
        let (i, edt) = take(pdc as usize)(i)?;
        properties.push(Property {
            epc,
            edt: edt.to_vec(),
        });
        input = i;
    }

    Ok((
        input,
        EchonetFrame {
            tid: [tid[0], tid[1]],
            seoj: [seoj[0], seoj[1], seoj[2]],
            deoj: [deoj[0], deoj[1], deoj[2]],
            esv,
            properties,
        },
    ))
}
