//! UBX byte-framed stream parser.
//!
//! Frame: `0xB5 0x62`, class, subclass, a little-endian 16-bit length, the
//! payload, and a two-byte Fletcher-8 checksum over class+subclass+length+
//! payload. Unlike RTCM v3's CRC-24Q, a checksum mismatch here is not
//! distinguished from noise: the state machine just resets and starts
//! hunting for the next sync sequence, matching the framing section this
//! module is built from.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::fletcher8::fletcher8;

use super::messages::{decode, UbxMessage};

const SYNC1: u8 = 0xB5;
const SYNC2: u8 = 0x62;
const MAX_PAYLOAD_LEN: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Sync1,
    Sync2,
    Class,
    Id,
    Length1,
    Length2,
    Payload,
    Checksum1,
    Checksum2,
}

/// Stateful byte-at-a-time UBX framer.
pub struct UbxParser {
    state: State,
    class: u8,
    id: u8,
    length: usize,
    payload: Vec<u8>,
    checksum_a: u8,
}

impl Default for UbxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UbxParser {
    pub fn new() -> Self {
        UbxParser {
            state: State::Sync1,
            class: 0,
            id: 0,
            length: 0,
            payload: Vec::new(),
            checksum_a: 0,
        }
    }

    fn reset(&mut self) {
        self.state = State::Sync1;
        self.payload.clear();
        self.length = 0;
    }

    /// Feeds one raw wire byte in. Returns `Some(message)` once a full,
    /// checksum-valid frame has been decoded.
    pub fn feed_byte(&mut self, byte: u8) -> Option<UbxMessage> {
        match self.state {
            State::Sync1 => {
                if byte == SYNC1 {
                    self.state = State::Sync2;
                }
                None
            }
            State::Sync2 => {
                self.state = if byte == SYNC2 { State::Class } else { State::Sync1 };
                None
            }
            State::Class => {
                self.class = byte;
                self.state = State::Id;
                None
            }
            State::Id => {
                self.id = byte;
                self.state = State::Length1;
                None
            }
            State::Length1 => {
                self.length = byte as usize;
                self.state = State::Length2;
                None
            }
            State::Length2 => {
                self.length |= (byte as usize) << 8;
                if self.length > MAX_PAYLOAD_LEN {
                    log::warn!("UBX length {} exceeds the {} byte maximum, resetting", self.length, MAX_PAYLOAD_LEN);
                    self.reset();
                    return None;
                }
                self.payload = Vec::with_capacity(self.length);
                self.state = if self.length == 0 { State::Checksum1 } else { State::Payload };
                None
            }
            State::Payload => {
                self.payload.push(byte);
                if self.payload.len() == self.length {
                    self.state = State::Checksum1;
                }
                None
            }
            State::Checksum1 => {
                self.checksum_a = byte;
                self.state = State::Checksum2;
                None
            }
            State::Checksum2 => {
                let covered = self.covered_bytes();
                let [a, b] = fletcher8(&covered);
                let result = if self.checksum_a == a && byte == b {
                    decode(self.class, self.id, &self.payload).ok()
                } else {
                    log::debug!(
                        "UBX checksum mismatch for class {:#04x} id {:#04x}, resetting",
                        self.class,
                        self.id
                    );
                    None
                };
                self.reset();
                result
            }
        }
    }

    fn covered_bytes(&self) -> Vec<u8> {
        let mut covered = Vec::with_capacity(4 + self.payload.len());
        covered.push(self.class);
        covered.push(self.id);
        covered.push(self.length as u8);
        covered.push((self.length >> 8) as u8);
        covered.extend_from_slice(&self.payload);
        covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "alloc")]
    use alloc::vec;

    fn frame(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
        let mut covered = vec![class, id, payload.len() as u8, (payload.len() >> 8) as u8];
        covered.extend_from_slice(payload);
        let [a, b] = fletcher8(&covered);
        let mut wire = vec![SYNC1, SYNC2];
        wire.extend_from_slice(&covered);
        wire.push(a);
        wire.push(b);
        wire
    }

    #[test]
    fn decodes_cfg_rate_frame() {
        let wire = frame(0x06, 0x08, &[0xE8, 0x03, 0x01, 0x00, 0x01, 0x00]);
        assert_eq!(
            wire,
            vec![0xB5, 0x62, 0x06, 0x08, 0x06, 0x00, 0xE8, 0x03, 0x01, 0x00, 0x01, 0x00, 0x01, 0x22]
        );

        let mut p = UbxParser::new();
        let mut decoded = None;
        for &b in &wire {
            if let Some(msg) = p.feed_byte(b) {
                decoded = Some(msg);
            }
        }
        assert!(decoded.is_some());
    }

    #[test]
    fn ignores_noise_before_the_sync_sequence() {
        let mut p = UbxParser::new();
        for b in [0x00, 0xFF, 0xB5] {
            assert_eq!(p.feed_byte(b), None);
        }
        assert_eq!(p.state, State::Sync2);
    }

    #[test]
    fn a_bad_checksum_silently_resets() {
        let mut wire = frame(0x06, 0x08, &[0xE8, 0x03, 0x01, 0x00, 0x01, 0x00]);
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let mut p = UbxParser::new();
        let mut decoded = None;
        for &b in &wire {
            if let Some(msg) = p.feed_byte(b) {
                decoded = Some(msg);
            }
        }
        assert!(decoded.is_none());
        assert_eq!(p.state, State::Sync1);
    }

    #[test]
    fn a_length_beyond_the_maximum_payload_resets() {
        let mut p = UbxParser::new();
        p.feed_byte(SYNC1);
        p.feed_byte(SYNC2);
        p.feed_byte(0x06);
        p.feed_byte(0x08);
        p.feed_byte(0xFF); // length1
        p.feed_byte(0xFF); // length2 -> 0xFFFF > 8192
        assert_eq!(p.state, State::Sync1);
    }
}
