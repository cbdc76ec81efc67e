#![cfg_attr(not(feature = "std"), no_std)]

//! Codecs for the GNSS byte-stream protocols that show up at the
//! NTRIP/receiver boundary: RTCM SC-104 v2 and v3 (including the MSM
//! family), U-blox UBX, and NMEA-0183. Bytes in, typed messages out, and
//! back again — no networking, no receiver command sequencing, no solution
//! computation. Collaborators own the I/O; this crate owns the wire format.
//!
//! Each protocol gets its own module with a byte-at-a-time stream parser
//! and a stateless (or, for RTCM v2, lightly stateful) encoder.
//! [`autodetect::AutodetectParser`] fans an unidentified stream out across
//! all of them and picks the one that first validates a frame.

#[cfg(feature = "alloc")]
extern crate alloc;
extern crate core;
#[cfg(feature = "serde")]
extern crate serde;

pub mod autodetect;
pub mod bitreader;
pub mod bitwriter;
pub mod coords;
pub mod crc24q;
pub mod error;
pub mod fletcher8;
pub mod geodesy;
pub mod gpstime;
pub mod nmea;
pub mod rtcm2;
pub mod rtcm3;
pub mod ubx;

pub use autodetect::{parse_auto, AutodetectParser, Message};
pub use crc24q::crc24q;
pub use error::{EncodeError, GeodesyError, ParserError};
pub use fletcher8::fletcher8;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use rtcm2::{Rtcm2Encoder, Rtcm2Message, Rtcm2Parser};
use rtcm3::{Rtcm3Message, Rtcm3Parser};
use ubx::{UbxMessage, UbxParser};

/// Decodes every RTCM v2 message in `bytes`.
///
/// Malformed words are silently skipped; RTCM v2 gives no way to tell a
/// corrupt word from a false preamble match, so there is nothing to
/// surface as an error (see [`rtcm2::Rtcm2Parser`]).
pub fn parse_rtcm_v2(bytes: &[u8]) -> Vec<Rtcm2Message> {
    let mut parser = Rtcm2Parser::new();
    bytes.iter().filter_map(|&b| parser.feed_byte(b)).collect()
}

/// Decodes every RTCM v3 message in `bytes`, plus any checksum errors
/// encountered along the way. `max_packet_length` bounds payload length
/// before resynchronisation kicks in; `None` uses the parser's default.
pub fn parse_rtcm_v3(
    bytes: &[u8],
    max_packet_length: Option<usize>,
) -> Vec<Result<Rtcm3Message, ParserError>> {
    let mut parser = match max_packet_length {
        Some(len) => Rtcm3Parser::with_max_packet_length(len),
        None => Rtcm3Parser::new(),
    };
    let mut out = Vec::new();
    for &b in bytes {
        match parser.feed_byte(b) {
            Ok(Some(message)) => out.push(Ok(message)),
            Ok(None) => {}
            Err(e) => out.push(Err(e)),
        }
    }
    out
}

/// Decodes every UBX message in `bytes`.
pub fn parse_ubx(bytes: &[u8]) -> Vec<UbxMessage> {
    let mut parser = UbxParser::new();
    bytes.iter().filter_map(|&b| parser.feed_byte(b)).collect()
}

/// Encodes a single RTCM v2 message. `gps_tow` is the current GPS time of
/// week in seconds, used to derive the modified Z-count; pass `None` to
/// fall back to the message's own `modified_z_count`.
pub fn encode_rtcm_v2(
    message: &Rtcm2Message,
    gps_tow: Option<f64>,
) -> Result<Vec<u8>, EncodeError> {
    Rtcm2Encoder::new().encode(message, gps_tow)
}

/// Encodes a single RTCM v3 message into its complete on-wire frame.
pub fn encode_rtcm_v3(message: &Rtcm3Message) -> Result<Vec<u8>, EncodeError> {
    rtcm3::encode(message)
}

/// Encodes a single UBX message into its complete on-wire frame.
pub fn encode_ubx(message: &UbxMessage) -> Result<Vec<u8>, EncodeError> {
    ubx::encode(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::EcefCoordinate;
    use crate::rtcm2::Rtcm2Header;
    use crate::ubx::CfgRate;

    #[cfg(feature = "alloc")]
    use alloc::vec;

    #[test]
    fn encode_then_parse_rtcm_v2_round_trips() {
        let message = Rtcm2Message::ReferenceStationParameters {
            header: Rtcm2Header {
                message_type: 3,
                station_id: 7,
                modified_z_count: 0,
                sequence_number: 0,
                frame_word_count: 0,
                station_health: 0,
            },
            position: EcefCoordinate::new(100.0, 200.0, 300.0),
        };
        let wire = encode_rtcm_v2(&message, Some(0.0)).unwrap();
        let decoded = parse_rtcm_v2(&wire);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn encode_then_parse_ubx_round_trips() {
        let message = UbxMessage::CfgRate(CfgRate {
            measure_rate_ms: 1000,
            nav_rate: 1,
            time_ref: 1,
        });
        let wire = encode_ubx(&message).unwrap();
        let decoded = parse_ubx(&wire);
        assert_eq!(decoded, vec![message]);
    }

    #[test]
    fn parse_rtcm_v3_surfaces_checksum_errors() {
        let message = Rtcm3Message::StationaryAntenna {
            message_type: 1005,
            antenna: rtcm3::StationaryAntenna {
                station_id: 1,
                system: 0,
                is_reference_station: false,
                single_receiver: true,
                position: EcefCoordinate::new(0.0, 0.0, 0.0),
                antenna_height: None,
            },
        };
        let mut wire = encode_rtcm_v3(&message).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let results = parse_rtcm_v3(&wire, None);
        assert!(results.iter().any(|r| matches!(r, Err(ParserError::ChecksumError { .. }))));
    }
}
