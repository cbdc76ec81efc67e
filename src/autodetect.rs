//! Fans a single byte stream out to every protocol subparser and resolves
//! which one owns the stream once any of them validates a frame.
//!
//! RTCM v2, RTCM v3 and UBX each claim exclusive ownership on their first
//! validated packet; NMEA-0183 has its own `$...*CC` framing and never
//! claims exclusivity, so it keeps receiving every byte regardless of which
//! of the other three wins. Recovery after a misframed packet is each
//! subparser's own concern (RTCM v3 resynchronises on checksum mismatch
//! internally); the orchestrator only has to notice which subparser first
//! produces a packet and silence the rest.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::nmea::{NmeaParser, NmeaSentence};
use crate::rtcm2::{Rtcm2Message, Rtcm2Parser};
use crate::rtcm3::{Rtcm3Message, Rtcm3Parser};
use crate::ubx::{UbxMessage, UbxParser};

/// A decoded message from any of the four protocols this crate recognises.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Rtcm2(Rtcm2Message),
    Rtcm3(Rtcm3Message),
    Ubx(UbxMessage),
    Nmea(NmeaSentence),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Rtcm2,
    Rtcm3,
    Ubx,
}

/// Byte-at-a-time multi-format parser. Feed it raw wire bytes from a
/// stream of unknown protocol; once one subparser validates a frame, it
/// becomes the exclusive owner of the stream (NMEA excepted, see the
/// module doc).
pub struct AutodetectParser {
    rtcm2: Rtcm2Parser,
    rtcm3: Rtcm3Parser,
    ubx: UbxParser,
    nmea: NmeaParser,
    chosen: Option<Owner>,
}

impl Default for AutodetectParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AutodetectParser {
    pub fn new() -> Self {
        AutodetectParser {
            rtcm2: Rtcm2Parser::new(),
            rtcm3: Rtcm3Parser::new(),
            ubx: UbxParser::new(),
            nmea: NmeaParser::new(),
            chosen: None,
        }
    }

    /// Which protocol has claimed exclusive ownership of the stream, if any.
    pub fn chosen(&self) -> Option<&'static str> {
        match self.chosen {
            Some(Owner::Rtcm2) => Some("rtcm2"),
            Some(Owner::Rtcm3) => Some("rtcm3"),
            Some(Owner::Ubx) => Some("ubx"),
            None => None,
        }
    }

    /// Feeds one raw wire byte in. Returns every message the byte completed
    /// framing for; this is almost always 0 or 1 messages, but an NMEA
    /// sentence can complete in the same byte that also completes an
    /// exclusive-owner packet.
    pub fn feed_byte(&mut self, byte: u8) -> Vec<Message> {
        let mut out = Vec::new();

        if let Some(sentence) = self.nmea.feed_byte(byte) {
            out.push(Message::Nmea(sentence));
        }

        match self.chosen {
            Some(Owner::Rtcm2) => {
                if let Some(m) = self.rtcm2.feed_byte(byte) {
                    out.push(Message::Rtcm2(m));
                }
            }
            Some(Owner::Rtcm3) => {
                if let Ok(Some(m)) = self.rtcm3.feed_byte(byte) {
                    out.push(Message::Rtcm3(m));
                }
            }
            Some(Owner::Ubx) => {
                if let Some(m) = self.ubx.feed_byte(byte) {
                    out.push(Message::Ubx(m));
                }
            }
            None => {
                let rtcm2_result = self.rtcm2.feed_byte(byte);
                let rtcm3_result = self.rtcm3.feed_byte(byte);
                let ubx_result = self.ubx.feed_byte(byte);

                if let Some(m) = rtcm2_result {
                    self.claim(Owner::Rtcm2);
                    out.push(Message::Rtcm2(m));
                } else if let Ok(Some(m)) = rtcm3_result {
                    self.claim(Owner::Rtcm3);
                    out.push(Message::Rtcm3(m));
                } else if let Some(m) = ubx_result {
                    self.claim(Owner::Ubx);
                    out.push(Message::Ubx(m));
                }
            }
        }

        out
    }

    /// Records `owner` as the exclusive owner and drops the framing state
    /// the other two byte-framed subparsers had accumulated; their partial
    /// frames were misattributed bytes from `owner`'s stream, not theirs.
    fn claim(&mut self, owner: Owner) {
        self.chosen = Some(owner);
        if owner != Owner::Rtcm2 {
            self.rtcm2 = Rtcm2Parser::new();
        }
        if owner != Owner::Rtcm3 {
            self.rtcm3 = Rtcm3Parser::new();
        }
        if owner != Owner::Ubx {
            self.ubx = UbxParser::new();
        }
    }
}

/// Decodes every message in `bytes` using an [`AutodetectParser`], in
/// input-byte order.
pub fn parse_auto(bytes: &[u8]) -> Vec<Message> {
    let mut parser = AutodetectParser::new();
    let mut messages = Vec::new();
    for &b in bytes {
        messages.extend(parser.feed_byte(b));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubx::CfgRate;

    #[cfg(feature = "alloc")]
    use alloc::vec;

    #[test]
    fn selects_ubx_and_ignores_subsequent_noise() {
        let message = UbxMessage::CfgRate(CfgRate {
            measure_rate_ms: 1000,
            nav_rate: 1,
            time_ref: 1,
        });
        let wire = crate::ubx::encode(&message).unwrap();

        let mut parser = AutodetectParser::new();
        let mut decoded = Vec::new();
        for &b in &wire {
            decoded.extend(parser.feed_byte(b));
        }

        assert_eq!(decoded, vec![Message::Ubx(message)]);
        assert_eq!(parser.chosen(), Some("ubx"));
    }

    #[test]
    fn nmea_sentences_surface_without_ever_claiming_the_stream() {
        let mut parser = AutodetectParser::new();
        let line = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\n";
        let mut decoded = Vec::new();
        for &b in line {
            decoded.extend(parser.feed_byte(b));
        }

        assert_eq!(decoded.len(), 1);
        assert!(matches!(decoded[0], Message::Nmea(_)));
        assert_eq!(parser.chosen(), None);
    }

    #[test]
    fn bytes_preceding_the_first_valid_frame_are_silently_dropped() {
        let mut parser = AutodetectParser::new();
        for b in [0x00u8, 0x01, 0x02, 0x03] {
            assert!(parser.feed_byte(b).is_empty());
        }
        assert_eq!(parser.chosen(), None);
    }
}
