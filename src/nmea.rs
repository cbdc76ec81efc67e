//! NMEA-0183 sentence framing and GGA formatting.
//!
//! NMEA plays a supplementary role at the wire boundary: it is consumed
//! opportunistically by [`crate::autodetect`] but never claims exclusive
//! ownership of a stream, and the only sentence this crate formats is the
//! GGA fix report the NTRIP GGA handshake sends back to a caster.

#[cfg(feature = "alloc")]
use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use crate::coords::GpsCoordinate;
use crate::error::ParserError;

/// Maximum NMEA-0183 sentence length, including the leading `$` and
/// trailing checksum but excluding the line terminator.
const MAX_SENTENCE_LENGTH: usize = 82;

/// A parsed NMEA-0183 sentence: talker ID, sentence type, and comma-split
/// fields, plus the raw line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmeaSentence {
    pub talker: String,
    pub sentence_type: String,
    pub fields: Vec<String>,
    pub raw: String,
}

/// Computes the XOR checksum over the bytes between `$` and `*`.
pub fn checksum(sentence_body: &[u8]) -> u8 {
    sentence_body.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Parses a single `$...*CC` line (without the trailing `\r\n`) into a
/// [`NmeaSentence`], validating the checksum.
pub fn parse_sentence(line: &str) -> Result<NmeaSentence, ParserError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line.strip_prefix('$').ok_or(ParserError::DecodeError {
        packet: "nmea sentence",
        reason: "missing leading '$'",
    })?;

    let (fields_part, checksum_part) = body.split_once('*').ok_or(ParserError::DecodeError {
        packet: "nmea sentence",
        reason: "missing '*' checksum separator",
    })?;

    let expected = u8::from_str_radix(checksum_part, 16).map_err(|_| ParserError::DecodeError {
        packet: "nmea sentence",
        reason: "checksum field is not valid hex",
    })?;
    let actual = checksum(fields_part.as_bytes());
    if actual != expected {
        return Err(ParserError::ChecksumError {
            packet: line.as_bytes().to_vec(),
            parity: vec![expected],
        });
    }

    if fields_part.len() < 5 {
        return Err(ParserError::DecodeError {
            packet: "nmea sentence",
            reason: "sentence identifier shorter than talker+type",
        });
    }
    let talker = fields_part[..2].to_string();
    let sentence_type = fields_part[2..5].to_string();
    let fields = fields_part[5..]
        .split(',')
        .skip(1)
        .map(str::to_string)
        .collect();

    Ok(NmeaSentence {
        talker,
        sentence_type,
        fields,
        raw: line.to_string(),
    })
}

/// Stateful line-delimited NMEA-0183 framer.
///
/// Sentences longer than [`MAX_SENTENCE_LENGTH`] without a terminator are
/// dropped and the buffer resets, matching the reference parser's
/// over-length guard.
#[derive(Debug, Default)]
pub struct NmeaParser {
    buffer: Vec<u8>,
}

impl NmeaParser {
    pub fn new() -> Self {
        NmeaParser { buffer: Vec::new() }
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Feeds one raw byte in. Returns `Some(sentence)` once a `\n`
    /// terminates a line that parses and checksums correctly; malformed
    /// lines are silently dropped rather than surfaced as an error, since
    /// NMEA coexists with other framers on a shared stream and a corrupt
    /// line is not distinguishable from a different protocol's bytes.
    pub fn feed_byte(&mut self, byte: u8) -> Option<NmeaSentence> {
        if byte == b'\n' {
            let line = String::from_utf8_lossy(&self.buffer).into_owned();
            self.reset();
            return parse_sentence(&line).ok();
        }

        self.buffer.push(byte);
        if self.buffer.len() > MAX_SENTENCE_LENGTH {
            self.reset();
        }
        None
    }
}

/// Formats `coord` as an NMEA GGA sentence (with trailing `\r\n`), matching
/// the format the NTRIP GGA handshake sends back to a caster.
pub fn format_gga(
    coord: &GpsCoordinate,
    hour: u32,
    minute: u32,
    second: u32,
    centisecond: u32,
) -> String {
    let alt = coord.amsl.unwrap_or(0.0);

    let (lat_field, lat_sign) = format_latitude(coord.lat);
    let (lon_field, lon_sign) = format_longitude(coord.lon);

    let fields = format!(
        "GPGGA,{hour:02}{minute:02}{second:02}.{centisecond:02},{lat_field},{lat_sign},{lon_field},{lon_sign},1,10,1,{alt:.2},M,,,0.0,0000",
    );
    let crc = checksum(fields.as_bytes());
    format!("${fields}*{crc:02X}\r\n")
}

fn format_latitude(lat: f64) -> (String, char) {
    let sign = if lat < 0.0 { 'S' } else { 'N' };
    let lat = lat.abs();
    let deg = lat.trunc() as u32;
    let min_frac = (lat.fract()) * 60.0;
    (format!("{deg:02}{min_frac:07.4}"), sign)
}

fn format_longitude(lon: f64) -> (String, char) {
    let sign = if lon < 0.0 { 'W' } else { 'E' };
    let lon = lon.abs();
    let deg = lon.trunc() as u32;
    let min_frac = (lon.fract()) * 60.0;
    (format!("{deg:03}{min_frac:07.4}"), sign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GpsCoordinate;

    #[test]
    fn parses_a_well_formed_gga_sentence() {
        let line = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
        let sentence = parse_sentence(line).unwrap();
        assert_eq!(sentence.talker, "GP");
        assert_eq!(sentence.sentence_type, "GGA");
        assert_eq!(sentence.fields[0], "123519");
    }

    #[test]
    fn rejects_a_bad_checksum() {
        let line = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00";
        assert!(matches!(parse_sentence(line), Err(ParserError::ChecksumError { .. })));
    }

    #[test]
    fn formats_lyon_as_a_gga_sentence_with_expected_dms_fields() {
        let lyon = GpsCoordinate::new(45.764, 4.8357).with_amsl(Some(173.0));
        let sentence = format_gga(&lyon, 12, 0, 0, 0);
        assert!(sentence.starts_with("$GPGGA,120000.00,4545.8400,N,00450.1420,E,1,10,1,173.00,M,,,0.0,0000*"));
        assert!(sentence.ends_with("\r\n"));
    }

    #[test]
    fn framer_recovers_a_sentence_split_across_feed_byte_calls() {
        let mut p = NmeaParser::new();
        let line = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\n";
        let mut result = None;
        for &b in line {
            if let Some(s) = p.feed_byte(b) {
                result = Some(s);
            }
        }
        assert!(result.is_some());
    }

    #[test]
    fn an_overlong_line_resets_the_buffer() {
        let mut p = NmeaParser::new();
        for _ in 0..100 {
            assert_eq!(p.feed_byte(b'A'), None);
        }
        assert!(p.buffer.is_empty());
    }
}
