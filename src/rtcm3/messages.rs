//! RTCM SC-104 v3 message bodies: the typed registry the stream framer in
//! [`super::parser`] decodes payloads into.

#[cfg(feature = "alloc")]
use alloc::{format, string::String, vec, vec::Vec};

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::coords::EcefCoordinate;
use crate::error::ParserError;
use crate::geodesy::GPS_PI;

const PSEUDORANGE_RESOLUTION: f64 = 2e-2;
const PSEUDORANGE_DIFF_RESOLUTION: f64 = 5e-4;
const INVALID_PSEUDORANGE_MARKER: u32 = 0x80000;
const GLONASS_INVALID_RANGEINCR_MARKER: u32 = 0x2000;
const CARRIER_NOISE_RATIO_UNITS: f64 = 0.25;
const CARRIER_NOISE_RATIO_HIRES_UNITS: f64 = 0.0625;
const ANTENNA_POSITION_RESOLUTION: f64 = 1e-4;
const RANGE_UNIT_MSM: f64 = 299_792.458; // speed of light, km/s

/// A GPS L1 signal observation, present on every satellite in a 1001-1004
/// message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsL1Signal {
    pub code: bool,
    pub pseudorange: f64,
    pub pseudorange_diff: f64,
    pub pseudorange_valid: bool,
    pub lock_time: i8,
    /// Present on the "extended" variants (1002, 1004).
    pub ambiguity: Option<u8>,
    /// Present on the "extended" variants (1002, 1004).
    pub cnr: Option<f64>,
}

/// A GPS L2 signal observation, present on the "has L2" variants (1003,
/// 1004).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsL2Signal {
    pub code: u8,
    pub pseudorange: f64,
    pub pseudorange_diff: f64,
    pub pseudorange_valid: bool,
    pub lock_time: i8,
    /// Present on the "extended" variants (1002, 1004).
    pub cnr: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsSatelliteObservation {
    pub svid: u8,
    pub l1: GpsL1Signal,
    pub l2: Option<GpsL2Signal>,
}

fn transform_pseudorange(raw: u32) -> f64 {
    if raw == INVALID_PSEUDORANGE_MARKER {
        0.0
    } else {
        raw as f64 * PSEUDORANGE_RESOLUTION
    }
}

/// The invalid-pseudorange-diff marker is defined as a *positive* constant
/// that a signed 20-bit field (range -524288..=524287) can never reach, so
/// this always reports `valid = true`; kept anyway to document the
/// reference decoder's literal comparison.
fn transform_pseudorange_diff(raw: i64) -> (f64, bool) {
    if raw == INVALID_PSEUDORANGE_MARKER as i64 {
        (0.0, false)
    } else {
        (raw as f64 * PSEUDORANGE_DIFF_RESOLUTION, true)
    }
}

fn decode_gps_l1(r: &mut BitReader, is_extended: bool) -> Result<GpsL1Signal, ParserError> {
    let code = r.read_bool()?;
    let pseudorange = transform_pseudorange(r.read_u(24)? as u32);
    let (pseudorange_diff, pseudorange_valid) = transform_pseudorange_diff(r.read_i(20)?);
    let lock_time = r.read_i(7)? as i8;
    let (ambiguity, cnr) = if is_extended {
        let ambiguity = r.read_u(8)? as u8;
        let cnr = r.read_u(8)? as f64 * CARRIER_NOISE_RATIO_UNITS;
        (Some(ambiguity), Some(cnr))
    } else {
        (None, None)
    };
    Ok(GpsL1Signal {
        code,
        pseudorange,
        pseudorange_diff,
        pseudorange_valid,
        lock_time,
        ambiguity,
        cnr,
    })
}

fn decode_gps_l2(r: &mut BitReader, is_extended: bool) -> Result<GpsL2Signal, ParserError> {
    let code = r.read_u(2)? as u8;
    // This field is a signed 14-bit offset from the L1 pseudorange, not an
    // unsigned magnitude like the L1/GLONASS-L1 full pseudoranges: the
    // invalid-pseudorange marker (defined for the unsigned fields) cannot
    // occur here, so it is scaled directly rather than through
    // `transform_pseudorange`.
    let pseudorange = r.read_i(14)? as f64 * PSEUDORANGE_RESOLUTION;
    let (pseudorange_diff, pseudorange_valid) = transform_pseudorange_diff(r.read_i(20)?);
    let lock_time = r.read_i(7)? as i8;
    let cnr = if is_extended {
        Some(r.read_u(8)? as f64 * CARRIER_NOISE_RATIO_UNITS)
    } else {
        None
    };
    Ok(GpsL2Signal {
        code,
        pseudorange,
        pseudorange_diff,
        pseudorange_valid,
        lock_time,
        cnr,
    })
}

fn encode_gps_l1(w: &mut BitWriter, s: &GpsL1Signal, is_extended: bool) {
    w.write_bool(s.code);
    w.write_u((s.pseudorange / PSEUDORANGE_RESOLUTION).round() as u64, 24);
    w.write_i((s.pseudorange_diff / PSEUDORANGE_DIFF_RESOLUTION).round() as i64, 20);
    w.write_i(s.lock_time as i64, 7);
    if is_extended {
        w.write_u(s.ambiguity.unwrap_or(0) as u64, 8);
        w.write_u((s.cnr.unwrap_or(0.0) / CARRIER_NOISE_RATIO_UNITS).round() as u64, 8);
    }
}

fn encode_gps_l2(w: &mut BitWriter, s: &GpsL2Signal, is_extended: bool) {
    w.write_u(s.code as u64, 2);
    w.write_i((s.pseudorange / PSEUDORANGE_RESOLUTION).round() as i64, 14);
    w.write_i((s.pseudorange_diff / PSEUDORANGE_DIFF_RESOLUTION).round() as i64, 20);
    w.write_i(s.lock_time as i64, 7);
    if is_extended {
        w.write_u((s.cnr.unwrap_or(0.0) / CARRIER_NOISE_RATIO_UNITS).round() as u64, 8);
    }
}

/// A GLONASS L1 signal observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlonassL1Signal {
    pub code: bool,
    pub freq: u8,
    pub pseudorange: f64,
    pub pseudorange_diff: f64,
    pub pseudorange_valid: bool,
    pub lock_time: i8,
    pub ambiguity: Option<u8>,
    pub cnr: Option<f64>,
}

/// A GLONASS L2 signal observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlonassL2Signal {
    pub code: u8,
    pub freq: u8,
    pub pseudorange: f64,
    pub pseudorange_diff: f64,
    pub pseudorange_valid: bool,
    pub lock_time: i8,
    pub ambiguity: Option<u8>,
    pub cnr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlonassSatelliteObservation {
    pub svid: u8,
    pub l1: GlonassL1Signal,
    pub l2: Option<GlonassL2Signal>,
}

fn transform_rangeincr(raw: u32) -> f64 {
    if raw == GLONASS_INVALID_RANGEINCR_MARKER {
        0.0
    } else {
        raw as f64 * PSEUDORANGE_RESOLUTION
    }
}

fn decode_glonass_l1(
    r: &mut BitReader,
    is_extended: bool,
    has_l2: bool,
) -> Result<GlonassL1Signal, ParserError> {
    let code = r.read_bool()?;
    let freq = r.read_u(5)? as u8;
    let pseudorange = transform_pseudorange(r.read_u(25)? as u32);
    let (pseudorange_diff, pseudorange_valid) = transform_pseudorange_diff(r.read_i(20)?);
    let lock_time = r.read_i(7)? as i8;
    let (ambiguity, cnr) = if is_extended || has_l2 {
        let ambiguity = r.read_u(7)? as u8;
        let cnr = r.read_u(8)? as f64 * CARRIER_NOISE_RATIO_UNITS;
        (Some(ambiguity), Some(cnr))
    } else {
        (None, None)
    };
    Ok(GlonassL1Signal {
        code,
        freq,
        pseudorange,
        pseudorange_diff,
        pseudorange_valid,
        lock_time,
        ambiguity,
        cnr,
    })
}

fn decode_glonass_l2(r: &mut BitReader, is_extended: bool) -> Result<GlonassL2Signal, ParserError> {
    let code = r.read_u(if is_extended { 2 } else { 1 })? as u8;
    let freq = if is_extended { 0 } else { r.read_u(5)? as u8 };
    let pseudorange = transform_rangeincr(r.read_u(14)? as u32);
    let (pseudorange_diff, pseudorange_valid) = transform_pseudorange_diff(r.read_i(20)?);
    let lock_time = r.read_i(7)? as i8;
    let ambiguity = if !is_extended {
        Some(r.read_u(7)? as u8)
    } else {
        None
    };
    // The GLONASS CNR presence here follows the reference decoder's choice
    // (always present once an L2 block exists) rather than the GPS analog's
    // extended-only gating.
    let cnr = r.read_u(8)? as f64 * CARRIER_NOISE_RATIO_UNITS;
    Ok(GlonassL2Signal {
        code,
        freq,
        pseudorange,
        pseudorange_diff,
        pseudorange_valid,
        lock_time,
        ambiguity,
        cnr,
    })
}

fn encode_glonass_l1(w: &mut BitWriter, s: &GlonassL1Signal, is_extended: bool, has_l2: bool) {
    w.write_bool(s.code);
    w.write_u(s.freq as u64, 5);
    w.write_u((s.pseudorange / PSEUDORANGE_RESOLUTION).round() as u64, 25);
    w.write_i((s.pseudorange_diff / PSEUDORANGE_DIFF_RESOLUTION).round() as i64, 20);
    w.write_i(s.lock_time as i64, 7);
    if is_extended || has_l2 {
        w.write_u(s.ambiguity.unwrap_or(0) as u64, 7);
        w.write_u((s.cnr.unwrap_or(0.0) / CARRIER_NOISE_RATIO_UNITS).round() as u64, 8);
    }
}

fn encode_glonass_l2(w: &mut BitWriter, s: &GlonassL2Signal, is_extended: bool) {
    w.write_u(s.code as u64, if is_extended { 2 } else { 1 });
    if !is_extended {
        w.write_u(s.freq as u64, 5);
    }
    w.write_u((s.pseudorange / PSEUDORANGE_RESOLUTION).round() as u64, 14);
    w.write_i((s.pseudorange_diff / PSEUDORANGE_DIFF_RESOLUTION).round() as i64, 20);
    w.write_i(s.lock_time as i64, 7);
    if !is_extended {
        w.write_u(s.ambiguity.unwrap_or(0) as u64, 7);
    }
    w.write_u((s.cnr / CARRIER_NOISE_RATIO_UNITS).round() as u64, 8);
}

/// ECEF position of a stationary reference antenna (1005/1006).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationaryAntenna {
    pub station_id: u16,
    pub system: u8,
    pub is_reference_station: bool,
    pub single_receiver: bool,
    pub position: EcefCoordinate,
    /// Present only on 1006.
    pub antenna_height: Option<f64>,
}

/// A length-prefixed ASCII string: a single length byte followed by that
/// many bytes, used by the antenna descriptor message family.
fn read_string(r: &mut BitReader) -> Result<String, ParserError> {
    let len = r.read_u(8)?;
    let mut s = String::with_capacity(len as usize);
    for _ in 0..len {
        s.push(r.read_u(8)? as u8 as char);
    }
    Ok(s)
}

fn write_string(w: &mut BitWriter, s: &str) {
    w.write_u(s.len() as u64, 8);
    for b in s.bytes() {
        w.write_u(b as u64, 8);
    }
}

/// Antenna/receiver descriptor (1007/1008/1033).
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaDescriptor {
    pub station_id: u16,
    pub descriptor: String,
    pub setup_id: u8,
    pub serial: Option<String>,
    pub receiver: Option<String>,
    pub firmware: Option<String>,
}

/// Raw (on-wire-scaled) fields of a GPS broadcast ephemeris (1019).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsEphemerisRaw {
    pub svid: u8,
    pub week: u16,
    pub acc: u8,
    pub l2code: u8,
    pub i_dot: i16,
    pub iode: u8,
    pub toc: u16,
    pub af2: i8,
    pub af1: i16,
    pub af0: i32,
    pub iodc: u16,
    pub crs: i16,
    pub delta_n: i16,
    pub m0: i32,
    pub cuc: i16,
    pub eccentricity: u32,
    pub cus: i16,
    pub sqrt_a: u32,
    pub toe: u16,
    pub cic: i16,
    pub omega0: i32,
    pub cis: i16,
    pub i0: i32,
    pub crc: i16,
    pub omega: i32,
    pub omega_dot: i32,
    pub tgd: i8,
    pub health: u8,
    pub l2p: u8,
    pub fit: u8,
}

/// GPS ephemeris scaled to SI units (radians, seconds, metres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsEphemeris {
    pub svid: u8,
    pub week: u16,
    pub iodc: u16,
    pub iode: u8,
    pub cuc: f64,
    pub cus: f64,
    pub cic: f64,
    pub cis: f64,
    pub crc: f64,
    pub crs: f64,
    pub tgd: f64,
    pub af0: f64,
    pub af1: f64,
    pub af2: f64,
    pub toe: f64,
    pub toc: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub eccentricity: f64,
    pub sqrt_a: f64,
    pub omega0: f64,
    pub i0: f64,
    pub omega: f64,
    pub omega_dot: f64,
    pub i_dot: f64,
}

impl GpsEphemerisRaw {
    /// Scales the raw on-wire integer fields to SI units, using the
    /// GPS-specific value of π (not `core::f64::consts::PI`) per the
    /// broadcast ICD.
    pub fn to_si(&self) -> GpsEphemeris {
        GpsEphemeris {
            svid: self.svid,
            week: self.week,
            iodc: self.iodc,
            iode: self.iode,
            cuc: self.cuc as f64 / 2f64.powi(29),
            cus: self.cus as f64 / 2f64.powi(29),
            cic: self.cic as f64 / 2f64.powi(29),
            cis: self.cis as f64 / 2f64.powi(29),
            crc: self.crc as f64 / 2f64.powi(5),
            crs: self.crs as f64 / 2f64.powi(5),
            tgd: self.tgd as f64 / 2f64.powi(31),
            af0: self.af0 as f64 / 2f64.powi(31),
            af1: self.af1 as f64 / 2f64.powi(43),
            af2: self.af2 as f64 / 2f64.powi(55),
            toe: self.toe as f64 * 2f64.powi(4),
            toc: self.toc as f64 * 2f64.powi(4),
            delta_n: self.delta_n as f64 * GPS_PI / 2f64.powi(43),
            m0: self.m0 as f64 * GPS_PI / 2f64.powi(31),
            eccentricity: self.eccentricity as f64 / 2f64.powi(33),
            sqrt_a: self.sqrt_a as f64 / 2f64.powi(19),
            omega0: self.omega0 as f64 * GPS_PI / 2f64.powi(31),
            i0: self.i0 as f64 * GPS_PI / 2f64.powi(31),
            omega: self.omega as f64 * GPS_PI / 2f64.powi(31),
            omega_dot: self.omega_dot as f64 * GPS_PI / 2f64.powi(43),
            i_dot: self.i_dot as f64 * GPS_PI / 2f64.powi(43),
        }
    }
}

/// One satellite's range data in an MSM packet, plus the decoded
/// per-signal cells attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MsmSatellite {
    pub id: String,
    pub svid: u8,
    /// Rough range, metres.
    pub range: f64,
    /// Present only on the high-resolution variants (last digit 6 or 7).
    pub extended_info: Option<u8>,
    pub fine_range: u16,
    /// Present only on the high-resolution variants (last digit 6 or 7).
    pub range_rate: Option<i16>,
    pub cells: Vec<MsmCell>,
    /// Maximum CNR over this satellite's cells, or `None` with no cells.
    pub cnr: Option<f64>,
}

/// One satellite/signal cell in an MSM packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsmCell {
    pub signal_id: u8,
    pub pseudorange: i32,
    pub phase_range: i32,
    pub lock_time: u16,
    pub half_cycle_ambiguity: bool,
    pub cnr: f64,
    /// Present only on last-digit-5/7 ("carries phase-range-rate") variants.
    pub phase_range_rate: Option<i16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MsmPacket {
    pub message_type: u16,
    pub station_id: u16,
    pub tow: f64,
    pub sync: bool,
    pub iod: u8,
    pub time_s: u8,
    pub clk_str: u8,
    pub clk_ext: u8,
    pub smoothed: bool,
    pub smoothing_interval: u8,
    pub satellites: Vec<MsmSatellite>,
}

fn msm_satellite_id_prefix(message_type: u16) -> char {
    if message_type < 1080 {
        'G'
    } else if message_type < 1090 {
        'R'
    } else if message_type < 1100 {
        'E'
    } else if message_type < 1120 {
        'Q'
    } else {
        'C'
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rtcm3Message {
    GpsRtk {
        message_type: u16,
        station_id: u16,
        tow: f64,
        sync: bool,
        smoothed: bool,
        smoothing_interval: u8,
        satellites: Vec<GpsSatelliteObservation>,
    },
    GlonassRtk {
        message_type: u16,
        station_id: u16,
        tod: f64,
        sync: bool,
        smoothed: bool,
        smoothing_interval: u8,
        satellites: Vec<GlonassSatelliteObservation>,
    },
    StationaryAntenna {
        message_type: u16,
        antenna: StationaryAntenna,
    },
    AntennaDescriptor {
        message_type: u16,
        descriptor: AntennaDescriptor,
    },
    GpsEphemeris {
        ephemeris: GpsEphemerisRaw,
    },
    Msm(MsmPacket),
    Unknown {
        message_type: u16,
        body: Vec<u8>,
    },
}

impl Rtcm3Message {
    pub fn message_type(&self) -> u16 {
        match self {
            Rtcm3Message::GpsRtk { message_type, .. } => *message_type,
            Rtcm3Message::GlonassRtk { message_type, .. } => *message_type,
            Rtcm3Message::StationaryAntenna { message_type, .. } => *message_type,
            Rtcm3Message::AntennaDescriptor { message_type, .. } => *message_type,
            Rtcm3Message::GpsEphemeris { .. } => 1019,
            Rtcm3Message::Msm(msm) => msm.message_type,
            Rtcm3Message::Unknown { message_type, .. } => *message_type,
        }
    }
}

/// Decodes a complete RTCM v3 payload (parity already stripped) into a
/// typed message.
pub fn decode(payload: &[u8]) -> Result<Rtcm3Message, ParserError> {
    let mut r = BitReader::new(payload);
    let message_type = r.read_u(12)? as u16;

    match message_type {
        1001..=1004 => decode_gps_rtk(message_type, &mut r),
        1005 | 1006 => decode_stationary_antenna(message_type, &mut r),
        1007 | 1008 => decode_antenna_descriptor(message_type, &mut r, false),
        1033 => decode_antenna_descriptor(message_type, &mut r, true),
        1009..=1012 => decode_glonass_rtk(message_type, &mut r),
        1019 => decode_gps_ephemeris(&mut r),
        1074 | 1077 | 1084 | 1087 | 1094 | 1097 | 1114 | 1117 | 1124 | 1127 => {
            decode_msm(message_type, &mut r)
        }
        _ => {
            log::trace!("RTCM v3 message type {message_type} has no registered decoder, carrying raw body");
            Ok(Rtcm3Message::Unknown {
                message_type,
                body: payload[2..].to_vec(),
            })
        }
    }
}

fn decode_gps_rtk(message_type: u16, r: &mut BitReader) -> Result<Rtcm3Message, ParserError> {
    let has_l2 = matches!(message_type, 1003 | 1004);
    let is_extended = matches!(message_type, 1002 | 1004);

    let station_id = r.read_u(12)? as u16;
    let tow = r.read_u(30)? as f64 * 0.001;
    let sync = r.read_bool()?;
    let satellite_count = r.read_u(5)?;
    let smoothed = r.read_bool()?;
    let smoothing_interval = r.read_u(3)? as u8;

    let mut satellites = Vec::with_capacity(satellite_count as usize);
    for _ in 0..satellite_count {
        let svid = r.read_u(6)? as u8;
        let l1 = decode_gps_l1(r, is_extended)?;
        let l2 = if has_l2 {
            Some(decode_gps_l2(r, is_extended)?)
        } else {
            None
        };
        satellites.push(GpsSatelliteObservation { svid, l1, l2 });
    }

    Ok(Rtcm3Message::GpsRtk {
        message_type,
        station_id,
        tow,
        sync,
        smoothed,
        smoothing_interval,
        satellites,
    })
}

fn decode_glonass_rtk(message_type: u16, r: &mut BitReader) -> Result<Rtcm3Message, ParserError> {
    let has_l2 = matches!(message_type, 1011 | 1012);
    let is_extended = matches!(message_type, 1010 | 1012);

    let station_id = r.read_u(12)? as u16;
    let tod = r.read_u(27)? as f64 * 0.001;
    let sync = r.read_bool()?;
    let satellite_count = r.read_u(5)?;
    let smoothed = r.read_bool()?;
    let smoothing_interval = r.read_u(3)? as u8;

    let mut satellites = Vec::with_capacity(satellite_count as usize);
    for _ in 0..satellite_count {
        let svid = r.read_u(6)? as u8;
        let l1 = decode_glonass_l1(r, is_extended, has_l2)?;
        let l2 = if has_l2 {
            Some(decode_glonass_l2(r, is_extended)?)
        } else {
            None
        };
        satellites.push(GlonassSatelliteObservation { svid, l1, l2 });
    }

    Ok(Rtcm3Message::GlonassRtk {
        message_type,
        station_id,
        tod,
        sync,
        smoothed,
        smoothing_interval,
        satellites,
    })
}

fn decode_stationary_antenna(message_type: u16, r: &mut BitReader) -> Result<Rtcm3Message, ParserError> {
    let station_id = r.read_u(12)? as u16;
    r.skip(6)?;
    let system = r.read_u(3)? as u8;
    let is_reference_station = r.read_bool()?;
    let ref_x = r.read_i(38)?;
    let single_receiver = r.read_bool()?;
    r.skip(1)?;
    let ref_y = r.read_i(38)?;
    r.skip(2)?;
    let ref_z = r.read_i(38)?;

    let antenna_height = if message_type == 1006 {
        Some(r.read_u(16)? as f64 * ANTENNA_POSITION_RESOLUTION)
    } else {
        None
    };

    let position = EcefCoordinate::new(
        ref_x as f64 * ANTENNA_POSITION_RESOLUTION,
        ref_y as f64 * ANTENNA_POSITION_RESOLUTION,
        ref_z as f64 * ANTENNA_POSITION_RESOLUTION,
    );

    Ok(Rtcm3Message::StationaryAntenna {
        message_type,
        antenna: StationaryAntenna {
            station_id,
            system,
            is_reference_station,
            single_receiver,
            position,
            antenna_height,
        },
    })
}

fn decode_antenna_descriptor(
    message_type: u16,
    r: &mut BitReader,
    extended: bool,
) -> Result<Rtcm3Message, ParserError> {
    let station_id = r.read_u(12)? as u16;
    let descriptor = read_string(r)?;
    let setup_id = r.read_u(8)? as u8;

    let (serial, receiver, firmware) = if extended {
        (Some(read_string(r)?), Some(read_string(r)?), Some(read_string(r)?))
    } else if message_type == 1008 {
        (Some(read_string(r)?), None, None)
    } else {
        (None, None, None)
    };

    Ok(Rtcm3Message::AntennaDescriptor {
        message_type,
        descriptor: AntennaDescriptor {
            station_id,
            descriptor,
            setup_id,
            serial,
            receiver,
            firmware,
        },
    })
}

fn decode_gps_ephemeris(r: &mut BitReader) -> Result<Rtcm3Message, ParserError> {
    let ephemeris = GpsEphemerisRaw {
        svid: r.read_u(6)? as u8,
        week: r.read_u(10)? as u16,
        acc: r.read_u(4)? as u8,
        l2code: r.read_u(2)? as u8,
        i_dot: r.read_i(14)? as i16,
        iode: r.read_u(8)? as u8,
        toc: r.read_u(16)? as u16,
        af2: r.read_i(8)? as i8,
        af1: r.read_i(16)? as i16,
        af0: r.read_i(22)? as i32,
        iodc: r.read_u(10)? as u16,
        crs: r.read_i(16)? as i16,
        delta_n: r.read_i(16)? as i16,
        m0: r.read_i(32)? as i32,
        cuc: r.read_i(16)? as i16,
        eccentricity: r.read_u(32)? as u32,
        cus: r.read_i(16)? as i16,
        sqrt_a: r.read_u(32)? as u32,
        toe: r.read_u(16)? as u16,
        cic: r.read_i(16)? as i16,
        omega0: r.read_i(32)? as i32,
        cis: r.read_i(16)? as i16,
        i0: r.read_i(32)? as i32,
        crc: r.read_i(16)? as i16,
        omega: r.read_i(32)? as i32,
        omega_dot: r.read_i(24)? as i32,
        tgd: r.read_i(8)? as i8,
        health: r.read_u(6)? as u8,
        l2p: r.read_u(1)? as u8,
        fit: r.read_u(1)? as u8,
    };
    Ok(Rtcm3Message::GpsEphemeris { ephemeris })
}

fn decode_msm(message_type: u16, r: &mut BitReader) -> Result<Rtcm3Message, ParserError> {
    let is_high_resolution = message_type % 10 == 6 || message_type % 10 == 7;
    let has_rate = message_type % 10 == 5 || message_type % 10 == 7;

    let station_id = r.read_u(12)? as u16;
    let tow = r.read_u(30)? as f64 * 0.001;
    let sync = r.read_bool()?;
    let iod = r.read_u(3)? as u8;
    let time_s = r.read_u(7)? as u8;
    let clk_str = r.read_u(2)? as u8;
    let clk_ext = r.read_u(2)? as u8;
    let smoothed = r.read_bool()?;
    let smoothing_interval = r.read_u(3)? as u8;

    let satellite_mask = r.read_bitmap(64)?;
    let satellite_ids: Vec<u8> = satellite_mask
        .iter()
        .enumerate()
        .filter(|(_, &bit)| bit)
        .map(|(i, _)| (i + 1) as u8)
        .collect();
    let num_satellites = satellite_ids.len();

    let signal_mask = r.read_bitmap(32)?;
    let signal_ids: Vec<u8> = signal_mask
        .iter()
        .enumerate()
        .filter(|(_, &bit)| bit)
        .map(|(i, _)| (i + 1) as u8)
        .collect();
    let num_signals = signal_ids.len();

    let cell_mask = r.read_bitmap((num_satellites * num_signals) as u32)?;
    if cell_mask.len() != num_satellites * num_signals {
        return Err(ParserError::DecodeError {
            packet: "rtcm3 msm",
            reason: "cell mask length did not match satellite*signal count",
        });
    }

    let prefix = msm_satellite_id_prefix(message_type);

    let mut ranges = Vec::with_capacity(num_satellites);
    for _ in 0..num_satellites {
        ranges.push(r.read_u(8)? as f64 * RANGE_UNIT_MSM);
    }
    let extended_infos: Vec<Option<u8>> = if is_high_resolution {
        let mut v = Vec::with_capacity(num_satellites);
        for _ in 0..num_satellites {
            v.push(Some(r.read_u(4)? as u8));
        }
        v
    } else {
        vec![None; num_satellites]
    };
    let mut fine_ranges = Vec::with_capacity(num_satellites);
    for _ in 0..num_satellites {
        fine_ranges.push(r.read_u(10)? as u16);
    }
    let range_rates: Vec<Option<i16>> = if is_high_resolution {
        let mut v = Vec::with_capacity(num_satellites);
        for _ in 0..num_satellites {
            v.push(Some(r.read_i(14)? as i16));
        }
        v
    } else {
        vec![None; num_satellites]
    };

    let mut satellites: Vec<MsmSatellite> = satellite_ids
        .iter()
        .enumerate()
        .map(|(i, &svid)| MsmSatellite {
            id: format!("{prefix}{svid:02}"),
            svid,
            range: ranges[i],
            extended_info: extended_infos[i],
            fine_range: fine_ranges[i],
            range_rate: range_rates[i],
            cells: Vec::new(),
            cnr: None,
        })
        .collect();

    // cells_to_signals[(satellite_index, signal_id)] in cell-mask order.
    let mut cell_positions: Vec<(usize, u8)> = Vec::new();
    let mut mask_iter = cell_mask.iter();
    for sat_idx in 0..num_satellites {
        for &signal_id in &signal_ids {
            if *mask_iter.next().unwrap() {
                cell_positions.push((sat_idx, signal_id));
            }
        }
    }
    let num_cells = cell_positions.len();

    let pseudorange_width = if is_high_resolution { 20 } else { 15 };
    let phase_range_width = if is_high_resolution { 24 } else { 22 };
    let lock_time_width = if is_high_resolution { 10 } else { 4 };

    let mut pseudoranges = Vec::with_capacity(num_cells);
    for _ in 0..num_cells {
        pseudoranges.push(r.read_i(pseudorange_width)? as i32);
    }
    let mut phase_ranges = Vec::with_capacity(num_cells);
    for _ in 0..num_cells {
        phase_ranges.push(r.read_i(phase_range_width)? as i32);
    }
    let mut lock_times = Vec::with_capacity(num_cells);
    for _ in 0..num_cells {
        lock_times.push(r.read_u(lock_time_width)? as u16);
    }
    let mut half_cycles = Vec::with_capacity(num_cells);
    for _ in 0..num_cells {
        half_cycles.push(r.read_bool()?);
    }
    let mut cnrs = Vec::with_capacity(num_cells);
    for _ in 0..num_cells {
        cnrs.push(if is_high_resolution {
            r.read_u(10)? as f64 * CARRIER_NOISE_RATIO_HIRES_UNITS
        } else {
            r.read_u(6)? as f64
        });
    }
    let mut phase_range_rates: Vec<Option<i16>> = vec![None; num_cells];
    if has_rate {
        for rate in phase_range_rates.iter_mut().take(num_cells) {
            *rate = Some(r.read_i(15)? as i16);
        }
    }

    for (cell_idx, (sat_idx, signal_id)) in cell_positions.into_iter().enumerate() {
        let cell = MsmCell {
            signal_id,
            pseudorange: pseudoranges[cell_idx],
            phase_range: phase_ranges[cell_idx],
            lock_time: lock_times[cell_idx],
            half_cycle_ambiguity: half_cycles[cell_idx],
            cnr: cnrs[cell_idx],
            phase_range_rate: phase_range_rates[cell_idx],
        };
        satellites[sat_idx].cells.push(cell);
    }

    for satellite in &mut satellites {
        satellite.cnr = satellite
            .cells
            .iter()
            .map(|c| c.cnr)
            .fold(None, |acc, cnr| Some(acc.map_or(cnr, |m: f64| m.max(cnr))));
    }

    Ok(Rtcm3Message::Msm(MsmPacket {
        message_type,
        station_id,
        tow,
        sync,
        iod,
        time_s,
        clk_str,
        clk_ext,
        smoothed,
        smoothing_interval,
        satellites,
    }))
}

/// Encodes a typed message body (everything after the 3-byte RTCM v3
/// header, before the CRC) back to bytes.
pub fn encode(message: &Rtcm3Message) -> Vec<u8> {
    let mut w = BitWriter::new();
    match message {
        Rtcm3Message::GpsRtk {
            message_type,
            station_id,
            tow,
            sync,
            smoothed,
            smoothing_interval,
            satellites,
        } => {
            let has_l2 = matches!(message_type, 1003 | 1004);
            let is_extended = matches!(message_type, 1002 | 1004);
            w.write_u(*message_type as u64, 12);
            w.write_u(*station_id as u64, 12);
            w.write_u((*tow / 0.001).round() as u64, 30);
            w.write_bool(*sync);
            w.write_u(satellites.len() as u64, 5);
            w.write_bool(*smoothed);
            w.write_u(*smoothing_interval as u64, 3);
            for sat in satellites {
                w.write_u(sat.svid as u64, 6);
                encode_gps_l1(&mut w, &sat.l1, is_extended);
                if has_l2 {
                    encode_gps_l2(&mut w, sat.l2.as_ref().expect("has_l2 implies l2 set"), is_extended);
                }
            }
        }
        Rtcm3Message::GlonassRtk {
            message_type,
            station_id,
            tod,
            sync,
            smoothed,
            smoothing_interval,
            satellites,
        } => {
            let has_l2 = matches!(message_type, 1011 | 1012);
            let is_extended = matches!(message_type, 1010 | 1012);
            w.write_u(*message_type as u64, 12);
            w.write_u(*station_id as u64, 12);
            w.write_u((*tod / 0.001).round() as u64, 27);
            w.write_bool(*sync);
            w.write_u(satellites.len() as u64, 5);
            w.write_bool(*smoothed);
            w.write_u(*smoothing_interval as u64, 3);
            for sat in satellites {
                w.write_u(sat.svid as u64, 6);
                encode_glonass_l1(&mut w, &sat.l1, is_extended, has_l2);
                if has_l2 {
                    encode_glonass_l2(&mut w, sat.l2.as_ref().expect("has_l2 implies l2 set"), is_extended);
                }
            }
        }
        Rtcm3Message::StationaryAntenna { message_type, antenna } => {
            w.write_u(*message_type as u64, 12);
            w.write_u(antenna.station_id as u64, 12);
            w.write_u(0, 6);
            w.write_u(antenna.system as u64, 3);
            w.write_bool(antenna.is_reference_station);
            w.write_i((antenna.position.x / ANTENNA_POSITION_RESOLUTION).round() as i64, 38);
            w.write_bool(antenna.single_receiver);
            w.write_u(0, 1);
            w.write_i((antenna.position.y / ANTENNA_POSITION_RESOLUTION).round() as i64, 38);
            w.write_u(0, 2);
            w.write_i((antenna.position.z / ANTENNA_POSITION_RESOLUTION).round() as i64, 38);
            if *message_type == 1006 {
                let height = antenna.antenna_height.unwrap_or(0.0);
                w.write_u((height / ANTENNA_POSITION_RESOLUTION).round() as u64, 16);
            }
        }
        Rtcm3Message::AntennaDescriptor { message_type, descriptor } => {
            w.write_u(*message_type as u64, 12);
            w.write_u(descriptor.station_id as u64, 12);
            write_string(&mut w, &descriptor.descriptor);
            w.write_u(descriptor.setup_id as u64, 8);
            if *message_type == 1033 {
                write_string(&mut w, descriptor.serial.as_deref().unwrap_or(""));
                write_string(&mut w, descriptor.receiver.as_deref().unwrap_or(""));
                write_string(&mut w, descriptor.firmware.as_deref().unwrap_or(""));
            } else if *message_type == 1008 {
                write_string(&mut w, descriptor.serial.as_deref().unwrap_or(""));
            }
        }
        Rtcm3Message::GpsEphemeris { ephemeris } => {
            w.write_u(1019, 12);
            w.write_u(ephemeris.svid as u64, 6);
            w.write_u(ephemeris.week as u64, 10);
            w.write_u(ephemeris.acc as u64, 4);
            w.write_u(ephemeris.l2code as u64, 2);
            w.write_i(ephemeris.i_dot as i64, 14);
            w.write_u(ephemeris.iode as u64, 8);
            w.write_u(ephemeris.toc as u64, 16);
            w.write_i(ephemeris.af2 as i64, 8);
            w.write_i(ephemeris.af1 as i64, 16);
            w.write_i(ephemeris.af0 as i64, 22);
            w.write_u(ephemeris.iodc as u64, 10);
            w.write_i(ephemeris.crs as i64, 16);
            w.write_i(ephemeris.delta_n as i64, 16);
            w.write_i(ephemeris.m0 as i64, 32);
            w.write_i(ephemeris.cuc as i64, 16);
            w.write_u(ephemeris.eccentricity as u64, 32);
            w.write_i(ephemeris.cus as i64, 16);
            w.write_u(ephemeris.sqrt_a as u64, 32);
            w.write_u(ephemeris.toe as u64, 16);
            w.write_i(ephemeris.cic as i64, 16);
            w.write_i(ephemeris.omega0 as i64, 32);
            w.write_i(ephemeris.cis as i64, 16);
            w.write_i(ephemeris.i0 as i64, 32);
            w.write_i(ephemeris.crc as i64, 16);
            w.write_i(ephemeris.omega as i64, 32);
            w.write_i(ephemeris.omega_dot as i64, 24);
            w.write_i(ephemeris.tgd as i64, 8);
            w.write_u(ephemeris.health as u64, 6);
            w.write_u(ephemeris.l2p as u64, 1);
            w.write_u(ephemeris.fit as u64, 1);
        }
        Rtcm3Message::Msm(msm) => encode_msm(&mut w, msm),
        Rtcm3Message::Unknown { message_type, body } => {
            w.write_u(*message_type as u64, 12);
            return {
                let mut out = w.into_bytes();
                out.extend_from_slice(body);
                out
            };
        }
    }
    w.into_bytes()
}

fn encode_msm(w: &mut BitWriter, msm: &MsmPacket) {
    let is_high_resolution = msm.message_type % 10 == 6 || msm.message_type % 10 == 7;
    let has_rate = msm.message_type % 10 == 5 || msm.message_type % 10 == 7;

    w.write_u(msm.message_type as u64, 12);
    w.write_u(msm.station_id as u64, 12);
    w.write_u((msm.tow / 0.001).round() as u64, 30);
    w.write_bool(msm.sync);
    w.write_u(msm.iod as u64, 3);
    w.write_u(msm.time_s as u64, 7);
    w.write_u(msm.clk_str as u64, 2);
    w.write_u(msm.clk_ext as u64, 2);
    w.write_bool(msm.smoothed);
    w.write_u(msm.smoothing_interval as u64, 3);

    let mut satellite_mask = vec![false; 64];
    for sat in &msm.satellites {
        satellite_mask[(sat.svid - 1) as usize] = true;
    }
    w.write_bitmap(&satellite_mask);

    let mut signal_ids: Vec<u8> = msm
        .satellites
        .iter()
        .flat_map(|s| s.cells.iter().map(|c| c.signal_id))
        .collect();
    signal_ids.sort_unstable();
    signal_ids.dedup();
    let mut signal_mask = vec![false; 32];
    for &id in &signal_ids {
        signal_mask[(id - 1) as usize] = true;
    }
    w.write_bitmap(&signal_mask);

    let mut cell_mask = Vec::with_capacity(msm.satellites.len() * signal_ids.len());
    for sat in &msm.satellites {
        for &signal_id in &signal_ids {
            cell_mask.push(sat.cells.iter().any(|c| c.signal_id == signal_id));
        }
    }
    w.write_bitmap(&cell_mask);

    for sat in &msm.satellites {
        w.write_u((sat.range / RANGE_UNIT_MSM).round() as u64, 8);
    }
    if is_high_resolution {
        for sat in &msm.satellites {
            w.write_u(sat.extended_info.unwrap_or(0) as u64, 4);
        }
    }
    for sat in &msm.satellites {
        w.write_u(sat.fine_range as u64, 10);
    }
    if is_high_resolution {
        for sat in &msm.satellites {
            w.write_i(sat.range_rate.unwrap_or(0) as i64, 14);
        }
    }

    let pseudorange_width = if is_high_resolution { 20 } else { 15 };
    let phase_range_width = if is_high_resolution { 24 } else { 22 };
    let lock_time_width = if is_high_resolution { 10 } else { 4 };

    let cells: Vec<&MsmCell> = msm.satellites.iter().flat_map(|s| s.cells.iter()).collect();
    for cell in &cells {
        w.write_i(cell.pseudorange as i64, pseudorange_width);
    }
    for cell in &cells {
        w.write_i(cell.phase_range as i64, phase_range_width);
    }
    for cell in &cells {
        w.write_u(cell.lock_time as u64, lock_time_width);
    }
    for cell in &cells {
        w.write_bool(cell.half_cycle_ambiguity);
    }
    for cell in &cells {
        if is_high_resolution {
            w.write_u((cell.cnr / CARRIER_NOISE_RATIO_HIRES_UNITS).round() as u64, 10);
        } else {
            w.write_u(cell.cnr.round() as u64, 6);
        }
    }
    if has_rate {
        for cell in &cells {
            w.write_i(cell.phase_range_rate.unwrap_or(0) as i64, 15);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stationary_antenna_at_earth_radius() {
        let mut w = BitWriter::new();
        w.write_u(1005, 12);
        w.write_u(0, 12); // station_id
        w.write_u(0, 6); // reserved
        w.write_u(0, 3); // system
        w.write_bool(false); // is_reference_station
        w.write_i((6_378_137.0 / ANTENNA_POSITION_RESOLUTION).round() as i64, 38);
        w.write_bool(false); // single_receiver
        w.write_u(0, 1);
        w.write_i(0, 38);
        w.write_u(0, 2);
        w.write_i(0, 38);
        let payload = w.into_bytes();

        match decode(&payload).unwrap() {
            Rtcm3Message::StationaryAntenna { antenna, .. } => {
                assert!((antenna.position.x - 6_378_137.0).abs() < 1e-4);
                assert_eq!(antenna.antenna_height, None);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn gps_ephemeris_round_trips_and_scales_to_si() {
        let raw = GpsEphemerisRaw {
            svid: 5,
            week: 2190,
            acc: 0,
            l2code: 1,
            i_dot: -10,
            iode: 3,
            toc: 100,
            af2: 0,
            af1: -5,
            af0: 1000,
            iodc: 3,
            crs: 20,
            delta_n: 15,
            m0: 123_456,
            cuc: -3,
            eccentricity: 5_000_000,
            cus: 4,
            sqrt_a: 2_650_000_000 / 4,
            toe: 100,
            cic: -2,
            omega0: -500_000,
            cis: 2,
            i0: 600_000,
            crc: 30,
            omega: 700_000,
            omega_dot: -800,
            tgd: -1,
            health: 0,
            l2p: 0,
            fit: 0,
        };
        let message = Rtcm3Message::GpsEphemeris { ephemeris: raw };
        let bytes = encode(&message);
        let decoded = decode(&bytes).unwrap();
        match decoded {
            Rtcm3Message::GpsEphemeris { ephemeris } => {
                assert_eq!(ephemeris, raw);
                let si = ephemeris.to_si();
                assert!((si.sqrt_a - raw.sqrt_a as f64 / 2f64.powi(19)).abs() < 1e-9);
                assert!((si.omega0 - raw.omega0 as f64 * GPS_PI / 2f64.powi(31)).abs() < 1e-9);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn gps_rtk_round_trips_basic_and_extended() {
        let sat = GpsSatelliteObservation {
            svid: 12,
            l1: GpsL1Signal {
                code: false,
                pseudorange: 21_000_000.0,
                pseudorange_diff: 0.25,
                pseudorange_valid: true,
                lock_time: 100,
                ambiguity: Some(3),
                cnr: Some(40.0),
            },
            l2: Some(GpsL2Signal {
                code: 1,
                pseudorange: 21_000_010.0,
                pseudorange_diff: -0.1,
                pseudorange_valid: true,
                lock_time: 90,
                cnr: Some(35.0),
            }),
        };
        let message = Rtcm3Message::GpsRtk {
            message_type: 1004,
            station_id: 7,
            tow: 123_456.789,
            sync: false,
            smoothed: false,
            smoothing_interval: 0,
            satellites: vec![sat],
        };

        let bytes = encode(&message);
        let decoded = decode(&bytes).unwrap();
        match decoded {
            Rtcm3Message::GpsRtk { satellites, .. } => {
                assert_eq!(satellites.len(), 1);
                assert_eq!(satellites[0].svid, 12);
                assert!((satellites[0].l1.pseudorange - 21_000_000.0).abs() < PSEUDORANGE_RESOLUTION);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn gps_l2_pseudorange_decodes_as_a_signed_offset() {
        let mut w = BitWriter::new();
        encode_gps_l2(
            &mut w,
            &GpsL2Signal {
                code: 0,
                pseudorange: -5.0 * PSEUDORANGE_RESOLUTION,
                pseudorange_diff: 0.0,
                pseudorange_valid: true,
                lock_time: 0,
                cnr: None,
            },
            false,
        );
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = decode_gps_l2(&mut r, false).unwrap();
        assert!((decoded.pseudorange - (-5.0 * PSEUDORANGE_RESOLUTION)).abs() < 1e-9);
    }

    #[test]
    fn msm_cell_count_matches_mask_popcount() {
        let sat1 = MsmSatellite {
            id: "G05".into(),
            svid: 5,
            range: 20_000_000.0,
            extended_info: None,
            fine_range: 512,
            range_rate: None,
            cells: vec![MsmCell {
                signal_id: 2,
                pseudorange: 100,
                phase_range: 200,
                lock_time: 5,
                half_cycle_ambiguity: false,
                cnr: 40.0,
                phase_range_rate: None,
            }],
            cnr: Some(40.0),
        };
        let msm = MsmPacket {
            message_type: 1074,
            station_id: 1,
            tow: 1.0,
            sync: false,
            iod: 0,
            time_s: 0,
            clk_str: 0,
            clk_ext: 0,
            smoothed: false,
            smoothing_interval: 0,
            satellites: vec![sat1],
        };
        let message = Rtcm3Message::Msm(msm);
        let bytes = encode(&message);
        match decode(&bytes).unwrap() {
            Rtcm3Message::Msm(decoded) => {
                assert_eq!(decoded.satellites.len(), 1);
                assert_eq!(decoded.satellites[0].cells.len(), 1);
                assert_eq!(decoded.satellites[0].cnr, Some(40.0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn antenna_descriptor_reads_length_prefixed_strings() {
        let descriptor = AntennaDescriptor {
            station_id: 3,
            descriptor: "TRM59800.00".into(),
            setup_id: 0,
            serial: Some("12345".into()),
            receiver: None,
            firmware: None,
        };
        let message = Rtcm3Message::AntennaDescriptor {
            message_type: 1008,
            descriptor,
        };
        let bytes = encode(&message);
        match decode(&bytes).unwrap() {
            Rtcm3Message::AntennaDescriptor { descriptor, .. } => {
                assert_eq!(descriptor.descriptor, "TRM59800.00");
                assert_eq!(descriptor.serial.as_deref(), Some("12345"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_preserves_raw_body() {
        let bytes = {
            let mut w = BitWriter::new();
            w.write_u(4094, 12);
            let mut out = w.into_bytes();
            out.extend_from_slice(&[0xDE, 0xAD]);
            out
        };
        match decode(&bytes).unwrap() {
            Rtcm3Message::Unknown { message_type, body } => {
                assert_eq!(message_type, 4094);
                assert_eq!(body, vec![0xDE, 0xAD]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
