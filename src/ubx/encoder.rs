//! Assembles a complete UBX wire frame: sync bytes, class/subclass, a
//! little-endian length, the payload, and the Fletcher-8 checksum.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::error::EncodeError;
use crate::fletcher8::fletcher8;

use super::messages::{encode as encode_payload, UbxMessage};

const SYNC1: u8 = 0xB5;
const SYNC2: u8 = 0x62;
const MAX_PAYLOAD_LEN: usize = 8192;

/// Encodes `message` into its complete on-wire byte representation.
pub fn encode(message: &UbxMessage) -> Result<Vec<u8>, EncodeError> {
    let (class, id) = message.class_id();
    let payload = encode_payload(message)?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::ValueOutOfRange {
            field: "payload_length",
            reason: "UBX payload exceeds the 8192-byte maximum",
        });
    }

    let length = payload.len() as u16;
    let mut covered = Vec::with_capacity(4 + payload.len());
    covered.push(class);
    covered.push(id);
    covered.extend_from_slice(&length.to_le_bytes());
    covered.extend_from_slice(&payload);

    let [a, b] = fletcher8(&covered);

    let mut frame = Vec::with_capacity(2 + covered.len() + 2);
    frame.push(SYNC1);
    frame.push(SYNC2);
    frame.extend_from_slice(&covered);
    frame.push(a);
    frame.push(b);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubx::messages::CfgRate;
    use crate::ubx::parser::UbxParser;

    #[cfg(feature = "alloc")]
    use alloc::vec;

    #[test]
    fn matches_the_documented_cfg_rate_example() {
        let message = UbxMessage::CfgRate(CfgRate {
            measure_rate_ms: 1000,
            nav_rate: 1,
            time_ref: 1,
        });
        let wire = encode(&message).unwrap();
        assert_eq!(
            wire,
            vec![0xB5, 0x62, 0x06, 0x08, 0x06, 0x00, 0xE8, 0x03, 0x01, 0x00, 0x01, 0x00, 0x01, 0x22]
        );
    }

    #[test]
    fn encoded_frame_round_trips_through_the_parser() {
        let message = UbxMessage::CfgRate(CfgRate {
            measure_rate_ms: 200,
            nav_rate: 1,
            time_ref: 0,
        });
        let wire = encode(&message).unwrap();

        let mut parser = UbxParser::new();
        let mut decoded = None;
        for &b in &wire {
            if let Some(msg) = parser.feed_byte(b) {
                decoded = Some(msg);
            }
        }
        assert_eq!(decoded, Some(message));
    }

    #[test]
    fn rejects_a_payload_over_the_maximum_length() {
        let message = UbxMessage::Unknown {
            class: 0xFF,
            id: 0xFF,
            payload: vec![0u8; MAX_PAYLOAD_LEN + 1],
        };
        assert!(matches!(encode(&message), Err(EncodeError::ValueOutOfRange { .. })));
    }
}
