//! Assembles a complete RTCM v3 wire frame: preamble, 10-bit length, the
//! message body, and a CRC-24Q trailer. Unlike the v2 encoder this one is
//! stateless; there is no rolling parity or sequence number to thread
//! between calls.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::crc24q::crc24q;
use crate::error::EncodeError;

use super::messages::{encode as encode_body, Rtcm3Message};

const PREAMBLE: u8 = 0xD3;
const MAX_PAYLOAD_LEN: usize = 1023; // 10-bit length field

/// Encodes `message` into its complete on-wire byte representation,
/// including the 3-byte header and 3-byte CRC-24Q trailer.
pub fn encode(message: &Rtcm3Message) -> Result<Vec<u8>, EncodeError> {
    let payload = encode_body(message);
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::ValueOutOfRange {
            field: "payload_length",
            reason: "RTCM v3 payload exceeds the 10-bit length field's range",
        });
    }

    let length = payload.len();
    let mut frame = Vec::with_capacity(3 + length + 3);
    frame.push(PREAMBLE);
    frame.push((length >> 8) as u8 & 0x03);
    frame.push(length as u8);
    frame.extend_from_slice(&payload);

    let crc = crc24q(&frame);
    frame.push((crc >> 16) as u8);
    frame.push((crc >> 8) as u8);
    frame.push(crc as u8);

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::EcefCoordinate;
    use crate::rtcm3::messages::StationaryAntenna;
    use crate::rtcm3::parser::Rtcm3Parser;

    #[cfg(feature = "alloc")]
    use alloc::vec;

    #[test]
    fn encoded_frame_has_a_zero_crc_over_its_whole_length() {
        let message = Rtcm3Message::StationaryAntenna {
            message_type: 1005,
            antenna: StationaryAntenna {
                station_id: 2003,
                system: 0,
                is_reference_station: false,
                single_receiver: true,
                position: EcefCoordinate::new(4_075_580.0, 931_854.0, 4_801_568.0),
                antenna_height: None,
            },
        };
        let wire = encode(&message).unwrap();
        assert_eq!(crc24q(&wire), 0);
    }

    #[test]
    fn encoded_frame_round_trips_through_the_parser() {
        let message = Rtcm3Message::StationaryAntenna {
            message_type: 1006,
            antenna: StationaryAntenna {
                station_id: 42,
                system: 0,
                is_reference_station: true,
                single_receiver: false,
                position: EcefCoordinate::new(4_075_580.1, 931_854.2, 4_801_568.3),
                antenna_height: Some(1.2340),
            },
        };
        let wire = encode(&message).unwrap();

        let mut parser = Rtcm3Parser::new();
        let mut decoded = None;
        for &b in &wire {
            if let Ok(Some(msg)) = parser.feed_byte(b) {
                decoded = Some(msg);
            }
        }

        match decoded.expect("parser should recover the frame just encoded") {
            Rtcm3Message::StationaryAntenna { antenna, .. } => {
                assert!((antenna.position.x - 4_075_580.1).abs() < 1e-3);
                assert_eq!(antenna.antenna_height, Some(1.234));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_a_payload_too_long_for_the_length_field() {
        let message = Rtcm3Message::Unknown {
            message_type: 4095,
            body: vec![0u8; MAX_PAYLOAD_LEN],
        };
        assert!(matches!(
            encode(&message),
            Err(EncodeError::ValueOutOfRange { .. })
        ));
    }
}
