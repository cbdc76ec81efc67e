//! RTCM v2 encoder: builds the 24-bit data words for a message body, adds
//! the header, then runs the stateful parity algorithm from section 3.3 of
//! the SC-104 transmission-characteristics note to turn each 24-bit word
//! into a 30-bit parity-protected, 6-bit-reversed wire word.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::error::EncodeError;
use crate::rtcm2::messages::{CorrectionData, Rtcm2Message};

const PREAMBLE: u8 = 0x66;

/// One parity-check mask per output bit, paired with the index (0 or 1) of
/// the *previous* word's parity bit it folds in. Distinct from the
/// decoder's 32-bit [`super::parser`] masks: these operate on a bare 24-bit
/// data word that has not yet been combined with the previous word's tail.
const PARITY_FORMULA: [(usize, u32); 6] = [
    (0, 0xEC7CD2),
    (1, 0x763E69),
    (0, 0xBB1F34),
    (1, 0x5D8F9A),
    (1, 0xAEC7CD),
    (0, 0x2DEA27),
];

fn count_bits(mut v: u32) -> u32 {
    let mut c = 0;
    while v != 0 {
        c += v & 1;
        v >>= 1;
    }
    c
}

/// Stateful RTCM v2 encoder. Parity and the frame sequence number both
/// carry over between calls to [`Rtcm2Encoder::encode`], matching the
/// reference encoder's behaviour of threading one continuous bitstream
/// across however many messages share a connection.
pub struct Rtcm2Encoder {
    sequence_number: u8,
    previous_parities: (bool, bool),
}

impl Default for Rtcm2Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Rtcm2Encoder {
    pub fn new() -> Self {
        Rtcm2Encoder {
            sequence_number: 0,
            previous_parities: (false, false),
        }
    }

    /// Encodes `message` into its on-wire byte representation.
    ///
    /// `time_of_week` is the current GPS time of week in seconds, used to
    /// derive the header's modified Z-count; pass `None` to fall back to the
    /// message's own `modified_z_count` (useful when re-transmitting a
    /// decoded message verbatim).
    pub fn encode(
        &mut self,
        message: &Rtcm2Message,
        time_of_week: Option<f64>,
    ) -> Result<Vec<u8>, EncodeError> {
        let mut data_bits = encode_body(message)?;

        let mod_z_count = match time_of_week {
            Some(tow) => modified_z_count(tow),
            None => message.header().modified_z_count,
        };

        let num_data_words = data_bits.len().div_ceil(24) as u8;
        let header = encode_header(message, mod_z_count, self.sequence_number, num_data_words);
        self.sequence_number = (self.sequence_number + 1) % 8;

        let mut bits: Vec<bool> = header.into_iter().chain(data_bits.drain(..)).collect();
        while bits.len() % 24 != 0 {
            bits.extend(byte_bits(0b1010_1010));
        }

        Ok(self.apply_parity(&bits))
    }

    /// Applies the stateful parity/inversion/bit-reversal algorithm to a
    /// sequence of 24-bit-aligned data words, producing the final wire
    /// bytes (five 6-bit symbols per word, each prefixed with `0b01`).
    fn apply_parity(&mut self, bits: &[bool]) -> Vec<u8> {
        let mut out_bits: Vec<bool> = Vec::with_capacity(bits.len() / 24 * 30);

        for word_bits in bits.chunks(24) {
            let mut word = bits_to_u32(word_bits);

            let mut parities = [false; 6];
            for (i, (prev_idx, mask)) in PARITY_FORMULA.iter().enumerate() {
                let prev = if *prev_idx == 0 {
                    self.previous_parities.0
                } else {
                    self.previous_parities.1
                };
                let set_bits = count_bits(word & mask) + prev as u32;
                parities[i] = set_bits & 1 != 0;
            }

            if self.previous_parities.1 {
                word ^= 0xFF_FFFF;
            }
            self.previous_parities = (parities[4], parities[5]);

            let mut word_bits_out: Vec<bool> = u32_to_bits(word, 24);
            word_bits_out.extend_from_slice(&parities);

            for chunk in word_bits_out.chunks(6) {
                out_bits.push(false);
                out_bits.push(true);
                for bit in chunk.iter().rev() {
                    out_bits.push(*bit);
                }
            }
        }

        bits_to_bytes(&out_bits)
    }
}

fn modified_z_count(time_of_week: f64) -> u16 {
    let time_within_hour = time_of_week - 3600.0 * (time_of_week / 3600.0).trunc();
    (time_within_hour / 0.6).round() as u16
}

fn encode_header(message: &Rtcm2Message, mod_z_count: u16, sequence_number: u8, num_data_words: u8) -> Vec<bool> {
    let header = message.header();
    let mut bits = Vec::with_capacity(48);
    bits.extend(u32_to_bits(PREAMBLE as u32, 8));
    bits.extend(u32_to_bits(header.message_type as u32, 6));
    bits.extend(u32_to_bits(header.station_id as u32, 10));
    bits.extend(u32_to_bits(mod_z_count as u32, 13));
    bits.extend(u32_to_bits(sequence_number as u32, 3));
    bits.extend(u32_to_bits(num_data_words as u32, 5));
    bits.extend(u32_to_bits(0, 3)); // station health: assume UDRE scale factor 1.0
    bits
}

fn encode_body(message: &Rtcm2Message) -> Result<Vec<bool>, EncodeError> {
    match message {
        Rtcm2Message::FullCorrections { corrections, .. } => encode_full_corrections(corrections),
        Rtcm2Message::ReferenceStationParameters { position, .. } => {
            let mut bits = Vec::with_capacity(96);
            for component in [position.x, position.y, position.z] {
                let cm = (component * 100.0).round();
                if !(i32::MIN as f64..=i32::MAX as f64).contains(&cm) {
                    return Err(EncodeError::ValueOutOfRange {
                        field: "ecef_component",
                        reason: "exceeds the 32-bit signed centimetre range",
                    });
                }
                bits.extend(i32_to_bits(cm as i32, 32));
            }
            Ok(bits)
        }
        Rtcm2Message::Unknown { body, .. } => Ok(body.iter().flat_map(|b| byte_bits(*b)).collect()),
    }
}

fn encode_full_corrections(corrections: &[CorrectionData]) -> Result<Vec<bool>, EncodeError> {
    let mut bits = Vec::with_capacity(corrections.len() * 40);
    for c in corrections {
        if c.svid > 32 {
            return Err(EncodeError::ValueOutOfRange {
                field: "svid",
                reason: "RTCM v2 SVID must not exceed 32",
            });
        }

        let (scale_factor, scaled_prc, scaled_prrc) = scale_correction(c.prc, c.prrc)?;

        bits.push(scale_factor != 0);
        bits.extend(u32_to_bits(0, 2));
        bits.extend(u32_to_bits((c.svid & 0x1F) as u32, 5));
        bits.extend(i32_to_bits(scaled_prc as i32, 16));
        bits.extend(i32_to_bits(scaled_prrc as i32, 8));
        bits.extend(u32_to_bits(c.iode as u32, 8));
    }
    Ok(bits)
}

/// Finds the smallest power-of-16 scale factor (0 or 1) that brings both
/// `prc` and `prrc` into signed 16-bit/8-bit range once divided by it.
fn scale_correction(prc: f64, prrc: f64) -> Result<(u8, i32, i32), EncodeError> {
    for scale_factor in 0u8..=1 {
        let multiplier = 16f64.powi(scale_factor as i32);
        let scaled_prc = (prc / multiplier).round();
        let scaled_prrc = (prrc / multiplier).round();
        if (-32768.0..=32767.0).contains(&scaled_prc) && (-128.0..=127.0).contains(&scaled_prrc) {
            return Ok((scale_factor, scaled_prc as i32, scaled_prrc as i32));
        }
    }
    Err(EncodeError::ValueOutOfRange {
        field: "prc/prrc",
        reason: "correction magnitude too large to represent with a scale factor of 0 or 1",
    })
}

fn byte_bits(byte: u8) -> [bool; 8] {
    let mut out = [false; 8];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = (byte >> (7 - i)) & 1 != 0;
    }
    out
}

fn u32_to_bits(value: u32, n: u32) -> Vec<bool> {
    (0..n).map(|i| (value >> (n - 1 - i)) & 1 != 0).collect()
}

fn i32_to_bits(value: i32, n: u32) -> Vec<bool> {
    u32_to_bits(value as u32 & mask(n), n)
}

fn mask(n: u32) -> u32 {
    if n >= 32 {
        u32::MAX
    } else {
        (1u32 << n) - 1
    }
}

fn bits_to_u32(bits: &[bool]) -> u32 {
    bits.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32)
}

fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    debug_assert_eq!(bits.len() % 8, 0);
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::EcefCoordinate;
    use crate::rtcm2::messages::Rtcm2Header;

    #[cfg(feature = "alloc")]
    use alloc::vec;

    fn header(message_type: u8) -> Rtcm2Header {
        Rtcm2Header {
            message_type,
            station_id: 42,
            modified_z_count: 0,
            sequence_number: 0,
            frame_word_count: 0,
            station_health: 0,
        }
    }

    #[test]
    fn modified_z_count_wraps_within_the_hour() {
        assert_eq!(modified_z_count(0.0), 0);
        assert_eq!(modified_z_count(0.6), 1);
        assert_eq!(modified_z_count(3600.0), 0);
    }

    #[test]
    fn encoded_frame_round_trips_through_the_parser() {
        let message = Rtcm2Message::ReferenceStationParameters {
            header: header(3),
            position: EcefCoordinate::new(1_234.0, -500.0, 10.0),
        };

        let mut encoder = Rtcm2Encoder::new();
        let wire = encoder.encode(&message, Some(0.0)).unwrap();

        let mut parser = crate::rtcm2::parser::Rtcm2Parser::new();
        let mut decoded = None;
        for byte in wire {
            if let Some(msg) = parser.feed_byte(byte) {
                decoded = Some(msg);
            }
        }

        match decoded.expect("parser should recover the frame just encoded") {
            Rtcm2Message::ReferenceStationParameters { position, .. } => {
                assert!((position.x - 1_234.0).abs() < 1e-6);
                assert!((position.y - (-500.0)).abs() < 1e-6);
                assert!((position.z - 10.0).abs() < 1e-6);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn rejects_svid_above_32() {
        let message = Rtcm2Message::FullCorrections {
            header: header(1),
            corrections: vec![CorrectionData {
                svid: 33,
                prc: 1.0,
                prrc: 0.0,
                iode: 0,
            }],
        };
        let mut encoder = Rtcm2Encoder::new();
        assert!(matches!(
            encoder.encode(&message, Some(0.0)),
            Err(EncodeError::ValueOutOfRange { .. })
        ));
    }
}
