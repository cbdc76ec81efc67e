//! Error types shared by every codec in this crate.
//!
//! Parsers and encoders use distinct error enums because they fail in
//! different ways: a parser resynchronises and keeps going, an encoder
//! fails the whole call. Both follow the hand-written `Display` style used
//! throughout this crate rather than pulling in an error-derive crate.

use core::fmt;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Error raised while decoding a fully-framed packet body.
///
/// Framing desynchronisation is not represented here: parsers resynchronise
/// silently per the framing rules of each codec and never surface a
/// `FramingError` value to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    /// CRC-24Q (RTCM v3) or parity (RTCM v2) mismatch on an otherwise
    /// complete frame. `packet` names the bytes that failed to validate;
    /// `parity` is the parity/CRC field as received on the wire.
    ChecksumError {
        packet: Vec<u8>,
        parity: Vec<u8>,
    },
    /// A frame's body violated a structural expectation once bits were
    /// pulled off of it (wrong padding, a mask/length mismatch, a string
    /// that overruns its declared body, and so on).
    DecodeError { packet: &'static str, reason: &'static str },
    /// The bit reader was asked to read past the end of its buffer.
    BitReaderExhausted { requested_bits: u32, remaining_bits: u32 },
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::ChecksumError { packet, parity } => write!(
                f,
                "checksum mismatch over {} byte packet, parity field {:02x?}",
                packet.len(),
                parity
            ),
            ParserError::DecodeError { packet, reason } => {
                write!(f, "failed to decode {packet}: {reason}")
            },
            ParserError::BitReaderExhausted {
                requested_bits,
                remaining_bits,
            } => write!(
                f,
                "bit reader exhausted: requested {requested_bits} bits, {remaining_bits} remained"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParserError {}

/// Error raised while encoding a typed message into its on-wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A caller-supplied field was out of the range the wire format allows.
    ValueOutOfRange { field: &'static str, reason: &'static str },
    /// An RTCM v2 message could not be encoded because neither an explicit
    /// GPS time of week nor the message's own `modified_z_count` was given.
    MissingGpsTime,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::ValueOutOfRange { field, reason } => {
                write!(f, "field {field} out of range: {reason}")
            },
            EncodeError::MissingGpsTime => f.write_str(
                "cannot encode RTCM v2 message without a GPS time of week or modified_z_count",
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Error raised by the geodesy module's conversions and transform
/// constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeodesyError {
    /// `gps_to_ecef` was called on a [`crate::coords::GpsCoordinate`] without
    /// an `amsl` altitude.
    MissingAltitude,
    /// A flat-earth transform was constructed with an axis convention other
    /// than `neu`, `nwu`, `ned` or `nwd`.
    UnknownAxisConvention,
}

impl fmt::Display for GeodesyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeodesyError::MissingAltitude => {
                f.write_str("GPS coordinate needs an altitude above mean sea level")
            },
            GeodesyError::UnknownAxisConvention => {
                f.write_str("unknown flat-earth axis convention, expected neu/nwu/ned/nwd")
            },
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GeodesyError {}
