//! RTCM SC-104 v2 message bodies.
//!
//! Only message types 1 (full GPS corrections) and 3 (reference station
//! ECEF position) are decoded into typed bodies; every other type is kept
//! as an opaque [`Rtcm2Message::Unknown`] payload.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::bitreader::BitReader;
use crate::coords::EcefCoordinate;
use crate::error::ParserError;

/// The fixed 48-bit RTCM v2 word pair every message starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rtcm2Header {
    pub message_type: u8,
    pub station_id: u16,
    pub modified_z_count: u16,
    pub sequence_number: u8,
    pub frame_word_count: u8,
    pub station_health: u8,
}

/// A single satellite's correction record from a type-1 message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionData {
    pub svid: u8,
    /// Pseudo-range correction, metres.
    pub prc: f64,
    /// Pseudo-range-rate correction, metres/second.
    pub prrc: f64,
    pub iode: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rtcm2Message {
    FullCorrections {
        header: Rtcm2Header,
        corrections: Vec<CorrectionData>,
    },
    ReferenceStationParameters {
        header: Rtcm2Header,
        position: EcefCoordinate,
    },
    Unknown {
        header: Rtcm2Header,
        body: Vec<u8>,
    },
}

impl Rtcm2Message {
    pub fn header(&self) -> &Rtcm2Header {
        match self {
            Rtcm2Message::FullCorrections { header, .. } => header,
            Rtcm2Message::ReferenceStationParameters { header, .. } => header,
            Rtcm2Message::Unknown { header, .. } => header,
        }
    }
}

/// Decodes a complete RTCM v2 frame (header and body words, parity already
/// stripped) into a typed message.
pub fn decode(packet: &[u8]) -> Result<Rtcm2Message, ParserError> {
    if packet.len() < 6 {
        return Err(ParserError::DecodeError {
            packet: "rtcm2",
            reason: "frame shorter than the 6-byte header",
        });
    }

    let mut r = BitReader::new(&packet[..6]);
    let _preamble = r.read_u(8)?;
    let message_type = r.read_u(6)? as u8;
    let station_id = r.read_u(10)? as u16;
    let modified_z_count = r.read_u(13)? as u16;
    let sequence_number = r.read_u(3)? as u8;
    let frame_word_count = r.read_u(5)? as u8;
    let station_health = r.read_u(3)? as u8;

    let header = Rtcm2Header {
        message_type,
        station_id,
        modified_z_count,
        sequence_number,
        frame_word_count,
        station_health,
    };

    let body = &packet[6..];
    match message_type {
        1 => Ok(Rtcm2Message::FullCorrections {
            header,
            corrections: decode_full_corrections(body)?,
        }),
        3 => Ok(Rtcm2Message::ReferenceStationParameters {
            header,
            position: decode_reference_station_parameters(body)?,
        }),
        _ => Ok(Rtcm2Message::Unknown {
            header,
            body: body.to_vec(),
        }),
    }
}

fn decode_full_corrections(body: &[u8]) -> Result<Vec<CorrectionData>, ParserError> {
    let num_corrections = body.len() / 5;
    let mut corrections = Vec::with_capacity(num_corrections);
    let mut r = BitReader::new(body);

    for _ in 0..num_corrections {
        let scale_factor = r.read_u(1)? as u32;
        r.skip(2)?;
        let svid = r.read_u(5)? as u8;
        let scaled_prc = r.read_be_i(2)?;
        let scaled_prrc = r.read_be_i(1)?;
        let iode = r.read_be_u(1)? as u8;

        let multiplier = 16f64.powi(scale_factor as i32);
        corrections.push(CorrectionData {
            svid,
            prc: scaled_prc as f64 * multiplier,
            prrc: scaled_prrc as f64 * multiplier,
            iode,
        });
    }

    for _ in 0..(body.len() % 5) {
        let fill = r.read_be_u(1)?;
        if fill != 0xAA {
            return Err(ParserError::DecodeError {
                packet: "rtcm2 type 1",
                reason: "trailing padding byte was not 0xaa",
            });
        }
    }

    Ok(corrections)
}

fn decode_reference_station_parameters(body: &[u8]) -> Result<EcefCoordinate, ParserError> {
    if body.len() < 12 {
        return Err(ParserError::DecodeError {
            packet: "rtcm2 type 3",
            reason: "body shorter than three 32-bit ECEF fields",
        });
    }
    let mut r = BitReader::new(&body[..12]);
    let x = r.read_be_i(4)? as f64 / 100.0;
    let y = r.read_be_i(4)? as f64 / 100.0;
    let z = r.read_be_i(4)? as f64 / 100.0;
    Ok(EcefCoordinate::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(message_type: u8, station_id: u16, word_count: u8) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        // preamble(8) message_type(6) station_id(10)
        let word1: u32 = (0x66u32 << 16) | ((message_type as u32 & 0x3F) << 10) | (station_id as u32 & 0x3FF);
        bytes[0] = (word1 >> 16) as u8;
        bytes[1] = (word1 >> 8) as u8;
        bytes[2] = word1 as u8;
        // modified_z_count(13) seq(3) word_count(5) health(3)
        let word2: u32 = (0u32 << 11) | (0u32 << 8) | ((word_count as u32 & 0x1F) << 3) | 0u32;
        bytes[3] = (word2 >> 16) as u8;
        bytes[4] = (word2 >> 8) as u8;
        bytes[5] = word2 as u8;
        bytes
    }

    #[test]
    fn decodes_reference_station_position() {
        let header = header_bytes(3, 42, 4);
        let mut packet = header.to_vec();
        // x=123400cm y=-500cm z=0cm
        packet.extend_from_slice(&(12_340_000i32).to_be_bytes());
        packet.extend_from_slice(&(-50_000i32).to_be_bytes());
        packet.extend_from_slice(&(0i32).to_be_bytes());

        let msg = decode(&packet).unwrap();
        match msg {
            Rtcm2Message::ReferenceStationParameters { header, position } => {
                assert_eq!(header.message_type, 3);
                assert_eq!(header.station_id, 42);
                assert!((position.x - 123_400.0).abs() < 1e-9);
                assert!((position.y - (-500.0)).abs() < 1e-9);
                assert_eq!(position.z, 0.0);
            }
            _ => panic!("expected ReferenceStationParameters"),
        }
    }

    #[test]
    fn decodes_full_corrections_with_padding() {
        let header = header_bytes(1, 7, 3);
        let mut packet = header.to_vec();
        // one record: scale=0 reserved=0 svid=5 prc=100 prrc=-2 iode=9
        packet.push(0b000_00101); // scale(1)=0 reserved(2)=0 svid(5)=5
        packet.extend_from_slice(&100i16.to_be_bytes());
        packet.push((-2i8) as u8);
        packet.push(9);
        packet.push(0xAA);
        packet.push(0xAA);
        packet.push(0xAA);

        let msg = decode(&packet).unwrap();
        match msg {
            Rtcm2Message::FullCorrections { corrections, .. } => {
                assert_eq!(corrections.len(), 1);
                assert_eq!(corrections[0].svid, 5);
                assert!((corrections[0].prc - 100.0).abs() < 1e-9);
                assert!((corrections[0].prrc - (-2.0)).abs() < 1e-9);
                assert_eq!(corrections[0].iode, 9);
            }
            _ => panic!("expected FullCorrections"),
        }
    }

    #[test]
    fn rejects_bad_padding() {
        let header = header_bytes(1, 7, 2);
        let mut packet = header.to_vec();
        packet.extend_from_slice(&[0x00, 0x00]);
        assert!(matches!(
            decode(&packet),
            Err(ParserError::DecodeError { .. })
        ));
    }
}
