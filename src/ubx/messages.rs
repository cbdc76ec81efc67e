//! UBX message bodies: the `(class, subclass)` → named constructor table for
//! the receiver-configuration and navigation subset this crate targets.
//!
//! UBX payloads are little-endian and byte-aligned throughout, unlike the
//! bit-packed RTCM bodies, so decoding here is a flat little-endian cursor
//! rather than [`crate::bitreader::BitReader`].

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

use crate::error::{EncodeError, ParserError};

/// A little-endian byte cursor over a UBX payload.
struct LeCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> LeCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        LeCursor { buf, pos: 0 }
    }

    fn require(&self, n: usize) -> Result<(), ParserError> {
        if self.pos + n > self.buf.len() {
            Err(ParserError::DecodeError {
                packet: "ubx payload",
                reason: "payload shorter than the message's fixed length",
            })
        } else {
            Ok(())
        }
    }

    fn u8(&mut self) -> Result<u8, ParserError> {
        self.require(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn i8(&mut self) -> Result<i8, ParserError> {
        Ok(self.u8()? as i8)
    }

    fn u16(&mut self) -> Result<u16, ParserError> {
        self.require(2)?;
        let v = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn u32(&mut self) -> Result<u32, ParserError> {
        self.require(4)?;
        let bytes = [
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ];
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    fn i32(&mut self) -> Result<i32, ParserError> {
        Ok(self.u32()? as i32)
    }

    fn f64(&mut self) -> Result<f64, ParserError> {
        self.require(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(f64::from_le_bytes(bytes))
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], ParserError> {
        self.require(n)?;
        let v = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(v)
    }

    /// Reads a NUL-padded ASCII string of exactly `n` bytes, trimming
    /// trailing NULs.
    fn fixed_str(&mut self, n: usize) -> Result<String, ParserError> {
        let raw = self.bytes(n)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

fn push_le_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_le_i16(buf: &mut Vec<u8>, v: i16) {
    push_le_u16(buf, v as u16);
}

fn push_le_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_le_i32(buf: &mut Vec<u8>, v: i32) {
    push_le_u32(buf, v as u32);
}

fn push_le_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_fixed_str(buf: &mut Vec<u8>, s: &str, n: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(n);
    buf.extend_from_slice(&bytes[..take]);
    buf.resize(buf.len() + (n - take), 0);
}

/// CFG-PRT (UART variant): port configuration, class 0x06 id 0x00.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfgPrtUart {
    pub port_id: u8,
    pub tx_ready: u16,
    pub mode: u32,
    pub baud_rate: u32,
    pub in_proto_mask: u16,
    pub out_proto_mask: u16,
    pub flags: u16,
}

/// CFG-MSG: per-message send rate on the current port, class 0x06 id 0x01.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfgMsg {
    pub msg_class: u8,
    pub msg_id: u8,
    pub rate: u8,
}

/// CFG-RATE: measurement/navigation rate settings, class 0x06 id 0x08.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfgRate {
    pub measure_rate_ms: u16,
    pub nav_rate: u16,
    pub time_ref: u16,
}

/// CFG-NAV5: navigation engine settings, class 0x06 id 0x24.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfgNav5 {
    pub mask: u16,
    pub dyn_model: u8,
    pub fix_mode: u8,
    pub fixed_alt: f64,
    pub fixed_alt_var: f64,
    pub min_elev_degrees: i8,
    pub pdop: f32,
    pub tdop: f32,
    pub pacc: u16,
    pub tacc: u16,
    pub static_hold_thresh: f32,
    pub dgps_time_out: u8,
    pub cno_thresh_num_svs: u8,
    pub cno_thresh: u8,
    pub static_hold_max_dist: u16,
    pub utc_standard: u8,
}

/// CFG-TMODE3: receiver time-mode / survey-in configuration for base
/// stations, class 0x06 id 0x71. Grounded on the public u-blox interface
/// description, since the receiver-configuration teacher crate this module
/// is based on does not itself define this packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfgTmode3 {
    pub version: u8,
    pub mode: u8,
    pub lla: bool,
    pub ecef_x_or_lat: i32,
    pub ecef_y_or_lon: i32,
    pub ecef_z_or_alt: i32,
    pub ecef_x_or_lat_hp: i8,
    pub ecef_y_or_lon_hp: i8,
    pub ecef_z_or_alt_hp: i8,
    pub fixed_pos_acc: u32,
    pub sv_in_min_dur: u32,
    pub sv_in_acc_limit: u32,
}

/// MON-HW: receiver hardware status, class 0x0A id 0x09.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonHw {
    pub noise_per_ms: u16,
    pub agc_cnt: u16,
    pub antenna_status: u8,
    pub antenna_power: u8,
    pub flags: u8,
    pub jam_ind: u8,
}

/// MON-VER: receiver/software version, class 0x0A id 0x04.
#[derive(Debug, Clone, PartialEq)]
pub struct MonVer {
    pub software_version: String,
    pub hardware_version: String,
    pub extensions: Vec<String>,
}

/// NAV-PVT: navigation position/velocity/time solution, class 0x01 id
/// 0x07.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavPvt {
    pub itow_ms: u32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    pub valid: u8,
    pub fix_type: u8,
    pub flags: u8,
    pub num_satellites: u8,
    pub lon_degrees: f64,
    pub lat_degrees: f64,
    pub height_m: f64,
    pub height_msl_m: f64,
    pub vel_north_m_s: f64,
    pub vel_east_m_s: f64,
    pub vel_down_m_s: f64,
    pub ground_speed_m_s: f64,
    pub heading_degrees: f64,
    pub pdop: f64,
}

/// NAV-SVIN: survey-in status, class 0x01 id 0x3B. Grounded on the public
/// u-blox interface description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavSvin {
    pub itow_ms: u32,
    pub dur_s: u32,
    pub mean_x_cm: i32,
    pub mean_y_cm: i32,
    pub mean_z_cm: i32,
    pub mean_accuracy_mm: u32,
    pub observations: u32,
    pub valid: bool,
    pub active: bool,
}

/// NAV-VELNED: velocity solution in local NED, class 0x01 id 0x12.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavVelNed {
    pub itow_ms: u32,
    pub vel_north_m_s: f64,
    pub vel_east_m_s: f64,
    pub vel_down_m_s: f64,
    pub speed_3d_m_s: f64,
    pub ground_speed_m_s: f64,
    pub heading_degrees: f64,
    pub speed_accuracy_m_s: f64,
    pub course_accuracy_degrees: f64,
}

/// NAV-TIMEUTC: UTC time solution, class 0x01 id 0x21.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavTimeUtc {
    pub itow_ms: u32,
    pub time_accuracy_ns: u32,
    pub nanos: i32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    pub valid: u8,
}

/// RXM-RAWX: multi-GNSS raw measurement data, class 0x02 id 0x15.
#[derive(Debug, Clone, PartialEq)]
pub struct RxmRawx {
    pub rcv_tow_s: f64,
    pub week: u16,
    pub leap_s: i8,
    pub rec_stat: u8,
    pub measurements: Vec<RxmRawxMeasurement>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxmRawxMeasurement {
    pub pseudorange_m: f64,
    pub carrier_phase_cycles: f64,
    pub doppler_hz: f32,
    pub gnss_id: u8,
    pub sv_id: u8,
    pub freq_id: u8,
    pub lock_time_ms: u16,
    pub cno_db_hz: u8,
    pub trk_stat: u8,
}

/// RXM-SFRBX: broadcast navigation data subframe, class 0x02 id 0x13.
#[derive(Debug, Clone, PartialEq)]
pub struct RxmSfrbx {
    pub gnss_id: u8,
    pub sv_id: u8,
    pub freq_id: u8,
    pub version: u8,
    pub words: Vec<u32>,
}

/// Legacy RXM-RAW: raw measurement data, class 0x02 id 0x10. Superseded by
/// [`RxmRawx`] on modern receivers but still present on the wire for older
/// firmware.
#[derive(Debug, Clone, PartialEq)]
pub struct RxmRaw {
    pub rcv_tow_ms: f64,
    pub week: u16,
    pub num_sv: u8,
    pub measurements: Vec<RxmRawMeasurement>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxmRawMeasurement {
    pub carrier_phase_cycles: f64,
    pub pseudorange_m: f64,
    pub doppler_hz: f32,
    pub sv_id: u8,
    pub mes_qi: i8,
    pub cno_db_hz: i8,
    pub lli: u8,
}

/// Legacy RXM-SFRB: subframe buffer, class 0x02 id 0x11.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxmSfrb {
    pub chn: u8,
    pub sv_id: u8,
    pub dwrd: [u32; 10],
}

#[derive(Debug, Clone, PartialEq)]
pub enum UbxMessage {
    CfgPrtUart(CfgPrtUart),
    CfgMsg(CfgMsg),
    CfgRate(CfgRate),
    CfgNav5(CfgNav5),
    CfgTmode3(CfgTmode3),
    MonHw(MonHw),
    MonVer(MonVer),
    NavPvt(NavPvt),
    NavSvin(NavSvin),
    NavVelNed(NavVelNed),
    NavTimeUtc(NavTimeUtc),
    RxmRawx(RxmRawx),
    RxmSfrbx(RxmSfrbx),
    RxmRaw(RxmRaw),
    RxmSfrb(RxmSfrb),
    Unknown { class: u8, id: u8, payload: Vec<u8> },
}

impl UbxMessage {
    pub fn class_id(&self) -> (u8, u8) {
        match self {
            UbxMessage::CfgPrtUart(_) => (0x06, 0x00),
            UbxMessage::CfgMsg(_) => (0x06, 0x01),
            UbxMessage::CfgRate(_) => (0x06, 0x08),
            UbxMessage::CfgNav5(_) => (0x06, 0x24),
            UbxMessage::CfgTmode3(_) => (0x06, 0x71),
            UbxMessage::MonHw(_) => (0x0A, 0x09),
            UbxMessage::MonVer(_) => (0x0A, 0x04),
            UbxMessage::NavPvt(_) => (0x01, 0x07),
            UbxMessage::NavSvin(_) => (0x01, 0x3B),
            UbxMessage::NavVelNed(_) => (0x01, 0x12),
            UbxMessage::NavTimeUtc(_) => (0x01, 0x21),
            UbxMessage::RxmRawx(_) => (0x02, 0x15),
            UbxMessage::RxmSfrbx(_) => (0x02, 0x13),
            UbxMessage::RxmRaw(_) => (0x02, 0x10),
            UbxMessage::RxmSfrb(_) => (0x02, 0x11),
            UbxMessage::Unknown { class, id, .. } => (*class, *id),
        }
    }
}

/// Decodes a UBX payload given its class and subclass IDs.
pub fn decode(class: u8, id: u8, payload: &[u8]) -> Result<UbxMessage, ParserError> {
    match (class, id) {
        (0x06, 0x00) => decode_cfg_prt_uart(payload),
        (0x06, 0x01) => decode_cfg_msg(payload),
        (0x06, 0x08) => decode_cfg_rate(payload),
        (0x06, 0x24) => decode_cfg_nav5(payload),
        (0x06, 0x71) => decode_cfg_tmode3(payload),
        (0x0A, 0x09) => decode_mon_hw(payload),
        (0x0A, 0x04) => decode_mon_ver(payload),
        (0x01, 0x07) => decode_nav_pvt(payload),
        (0x01, 0x3B) => decode_nav_svin(payload),
        (0x01, 0x12) => decode_nav_velned(payload),
        (0x01, 0x21) => decode_nav_timeutc(payload),
        (0x02, 0x15) => decode_rxm_rawx(payload),
        (0x02, 0x13) => decode_rxm_sfrbx(payload),
        (0x02, 0x10) => decode_rxm_raw(payload),
        (0x02, 0x11) => decode_rxm_sfrb(payload),
        _ => {
            log::trace!("UBX class {class:#04x} id {id:#04x} has no registered decoder, carrying raw payload");
            Ok(UbxMessage::Unknown {
                class,
                id,
                payload: payload.to_vec(),
            })
        }
    }
}

fn decode_cfg_prt_uart(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let port_id = c.u8()?;
    c.u8()?; // reserved0
    let tx_ready = c.u16()?;
    let mode = c.u32()?;
    let baud_rate = c.u32()?;
    let in_proto_mask = c.u16()?;
    let out_proto_mask = c.u16()?;
    let flags = c.u16()?;
    Ok(UbxMessage::CfgPrtUart(CfgPrtUart {
        port_id,
        tx_ready,
        mode,
        baud_rate,
        in_proto_mask,
        out_proto_mask,
        flags,
    }))
}

fn decode_cfg_msg(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let msg_class = c.u8()?;
    let msg_id = c.u8()?;
    let rate = c.u8()?;
    Ok(UbxMessage::CfgMsg(CfgMsg {
        msg_class,
        msg_id,
        rate,
    }))
}

fn decode_cfg_rate(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let measure_rate_ms = c.u16()?;
    let nav_rate = c.u16()?;
    let time_ref = c.u16()?;
    Ok(UbxMessage::CfgRate(CfgRate {
        measure_rate_ms,
        nav_rate,
        time_ref,
    }))
}

fn decode_cfg_nav5(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let mask = c.u16()?;
    let dyn_model = c.u8()?;
    let fix_mode = c.u8()?;
    let fixed_alt = c.i32()? as f64 * 0.01;
    let fixed_alt_var = c.u32()? as f64 * 0.0001;
    let min_elev_degrees = c.i8()?;
    c.u8()?; // dr_limit
    let pdop = c.u16()? as f32 * 0.1;
    let tdop = c.u16()? as f32 * 0.1;
    let pacc = c.u16()?;
    let tacc = c.u16()?;
    let static_hold_thresh = c.u8()? as f32 * 0.01;
    let dgps_time_out = c.u8()?;
    let cno_thresh_num_svs = c.u8()?;
    let cno_thresh = c.u8()?;
    c.bytes(2)?; // reserved1
    let static_hold_max_dist = c.u16()?;
    let utc_standard = c.u8()?;
    c.bytes(5)?; // reserved2
    Ok(UbxMessage::CfgNav5(CfgNav5 {
        mask,
        dyn_model,
        fix_mode,
        fixed_alt,
        fixed_alt_var,
        min_elev_degrees,
        pdop,
        tdop,
        pacc,
        tacc,
        static_hold_thresh,
        dgps_time_out,
        cno_thresh_num_svs,
        cno_thresh,
        static_hold_max_dist,
        utc_standard,
    }))
}

fn decode_cfg_tmode3(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let version = c.u8()?;
    c.u8()?; // reserved0
    let raw_mode = c.u16()?;
    let mode = (raw_mode & 0xFF) as u8;
    let lla = raw_mode & 0x100 != 0;
    let ecef_x_or_lat = c.i32()?;
    let ecef_y_or_lon = c.i32()?;
    let ecef_z_or_alt = c.i32()?;
    let ecef_x_or_lat_hp = c.i8()?;
    let ecef_y_or_lon_hp = c.i8()?;
    let ecef_z_or_alt_hp = c.i8()?;
    c.u8()?; // reserved1
    let fixed_pos_acc = c.u32()?;
    let sv_in_min_dur = c.u32()?;
    let sv_in_acc_limit = c.u32()?;
    Ok(UbxMessage::CfgTmode3(CfgTmode3 {
        version,
        mode,
        lla,
        ecef_x_or_lat,
        ecef_y_or_lon,
        ecef_z_or_alt,
        ecef_x_or_lat_hp,
        ecef_y_or_lon_hp,
        ecef_z_or_alt_hp,
        fixed_pos_acc,
        sv_in_min_dur,
        sv_in_acc_limit,
    }))
}

fn decode_mon_hw(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    c.bytes(16)?; // pin_sel, pin_bank, pin_dir, pin_val (4 x u32)
    let noise_per_ms = c.u16()?;
    let agc_cnt = c.u16()?;
    let antenna_status = c.u8()?;
    let antenna_power = c.u8()?;
    let flags = c.u8()?;
    c.u8()?; // reserved1
    c.u32()?; // used_mask
    c.bytes(17)?; // vp
    let jam_ind = c.u8()?;
    Ok(UbxMessage::MonHw(MonHw {
        noise_per_ms,
        agc_cnt,
        antenna_status,
        antenna_power,
        flags,
        jam_ind,
    }))
}

fn decode_mon_ver(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let software_version = c.fixed_str(30)?;
    let hardware_version = c.fixed_str(10)?;
    let mut extensions = Vec::new();
    while c.pos + 30 <= payload.len() {
        extensions.push(c.fixed_str(30)?);
    }
    Ok(UbxMessage::MonVer(MonVer {
        software_version,
        hardware_version,
        extensions,
    }))
}

fn decode_nav_pvt(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let itow_ms = c.u32()?;
    let year = c.u16()?;
    let month = c.u8()?;
    let day = c.u8()?;
    let hour = c.u8()?;
    let min = c.u8()?;
    let sec = c.u8()?;
    let valid = c.u8()?;
    c.u32()?; // time_accuracy
    c.i32()?; // nanosecond
    let fix_type = c.u8()?;
    let flags = c.u8()?;
    c.u8()?; // flags2
    let num_satellites = c.u8()?;
    let lon_degrees = c.i32()? as f64 * 1e-7;
    let lat_degrees = c.i32()? as f64 * 1e-7;
    let height_m = c.i32()? as f64 * 1e-3;
    let height_msl_m = c.i32()? as f64 * 1e-3;
    c.u32()?; // horiz_accuracy
    c.u32()?; // vert_accuracy
    let vel_north_m_s = c.i32()? as f64 * 1e-3;
    let vel_east_m_s = c.i32()? as f64 * 1e-3;
    let vel_down_m_s = c.i32()? as f64 * 1e-3;
    let ground_speed_m_s = c.u32()? as f64 * 1e-3;
    let heading_degrees = c.i32()? as f64 * 1e-5;
    c.u32()?; // speed_accuracy_estimate
    c.u32()?; // heading_accuracy_estimate
    let pdop = c.u16()? as f64 * 0.01;
    Ok(UbxMessage::NavPvt(NavPvt {
        itow_ms,
        year,
        month,
        day,
        hour,
        min,
        sec,
        valid,
        fix_type,
        flags,
        num_satellites,
        lon_degrees,
        lat_degrees,
        height_m,
        height_msl_m,
        vel_north_m_s,
        vel_east_m_s,
        vel_down_m_s,
        ground_speed_m_s,
        heading_degrees,
        pdop,
    }))
}

fn decode_nav_svin(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let itow_ms = c.u32()?;
    let dur_s = c.u32()?;
    let mean_x_cm = c.i32()?;
    let mean_y_cm = c.i32()?;
    let mean_z_cm = c.i32()?;
    c.bytes(3)?; // mean x/y/z HP, 1 byte each
    c.u8()?; // reserved1
    let mean_accuracy_mm = c.u32()?;
    let observations = c.u32()?;
    let valid = c.u8()? != 0;
    let active = c.u8()? != 0;
    Ok(UbxMessage::NavSvin(NavSvin {
        itow_ms,
        dur_s,
        mean_x_cm,
        mean_y_cm,
        mean_z_cm,
        mean_accuracy_mm,
        observations,
        valid,
        active,
    }))
}

fn decode_nav_velned(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let itow_ms = c.u32()?;
    let vel_north_m_s = c.i32()? as f64 * 1e-2;
    let vel_east_m_s = c.i32()? as f64 * 1e-2;
    let vel_down_m_s = c.i32()? as f64 * 1e-2;
    let speed_3d_m_s = c.u32()? as f64 * 1e-2;
    let ground_speed_m_s = c.u32()? as f64 * 1e-2;
    let heading_degrees = c.i32()? as f64 * 1e-5;
    let speed_accuracy_m_s = c.u32()? as f64 * 1e-2;
    let course_accuracy_degrees = c.u32()? as f64 * 1e-5;
    Ok(UbxMessage::NavVelNed(NavVelNed {
        itow_ms,
        vel_north_m_s,
        vel_east_m_s,
        vel_down_m_s,
        speed_3d_m_s,
        ground_speed_m_s,
        heading_degrees,
        speed_accuracy_m_s,
        course_accuracy_degrees,
    }))
}

fn decode_nav_timeutc(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let itow_ms = c.u32()?;
    let time_accuracy_ns = c.u32()?;
    let nanos = c.i32()?;
    let year = c.u16()?;
    let month = c.u8()?;
    let day = c.u8()?;
    let hour = c.u8()?;
    let min = c.u8()?;
    let sec = c.u8()?;
    let valid = c.u8()?;
    Ok(UbxMessage::NavTimeUtc(NavTimeUtc {
        itow_ms,
        time_accuracy_ns,
        nanos,
        year,
        month,
        day,
        hour,
        min,
        sec,
        valid,
    }))
}

fn decode_rxm_rawx(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let rcv_tow_s = c.f64()?;
    let week = c.u16()?;
    let leap_s = c.i8()?;
    let num_meas = c.u8()?;
    let rec_stat = c.u8()?;
    c.bytes(3)?; // reserved1

    let mut measurements = Vec::with_capacity(num_meas as usize);
    for _ in 0..num_meas {
        let pseudorange_m = c.f64()?;
        let carrier_phase_cycles = c.f64()?;
        let doppler_hz = f32::from_bits(c.u32()?);
        let gnss_id = c.u8()?;
        let sv_id = c.u8()?;
        c.u8()?; // reserved2
        let freq_id = c.u8()?;
        let lock_time_ms = c.u16()?;
        let cno_db_hz = c.u8()?;
        c.u8()?; // pr_stdev
        c.u8()?; // cp_stdev
        c.u8()?; // do_stdev
        let trk_stat = c.u8()?;
        c.u8()?; // reserved3
        measurements.push(RxmRawxMeasurement {
            pseudorange_m,
            carrier_phase_cycles,
            doppler_hz,
            gnss_id,
            sv_id,
            freq_id,
            lock_time_ms,
            cno_db_hz,
            trk_stat,
        });
    }

    Ok(UbxMessage::RxmRawx(RxmRawx {
        rcv_tow_s,
        week,
        leap_s,
        rec_stat,
        measurements,
    }))
}

fn decode_rxm_sfrbx(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let gnss_id = c.u8()?;
    let sv_id = c.u8()?;
    c.u8()?; // reserved1
    let freq_id = c.u8()?;
    let num_words = c.u8()?;
    c.u8()?; // reserved2
    let version = c.u8()?;
    c.u8()?; // reserved3

    let mut words = Vec::with_capacity(num_words as usize);
    for _ in 0..num_words {
        words.push(c.u32()?);
    }

    Ok(UbxMessage::RxmSfrbx(RxmSfrbx {
        gnss_id,
        sv_id,
        freq_id,
        version,
        words,
    }))
}

fn decode_rxm_raw(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let rcv_tow_ms = c.f64()?;
    let week = c.u16()?;
    let num_sv = c.u8()?;
    c.u8()?; // reserved1

    let mut measurements = Vec::with_capacity(num_sv as usize);
    for _ in 0..num_sv {
        let carrier_phase_cycles = c.f64()?;
        let pseudorange_m = c.f64()?;
        let doppler_hz = f32::from_bits(c.u32()?);
        let sv_id = c.u8()?;
        let mes_qi = c.i8()?;
        let cno_db_hz = c.i8()?;
        let lli = c.u8()?;
        measurements.push(RxmRawMeasurement {
            carrier_phase_cycles,
            pseudorange_m,
            doppler_hz,
            sv_id,
            mes_qi,
            cno_db_hz,
            lli,
        });
    }

    Ok(UbxMessage::RxmRaw(RxmRaw {
        rcv_tow_ms,
        week,
        num_sv,
        measurements,
    }))
}

fn decode_rxm_sfrb(payload: &[u8]) -> Result<UbxMessage, ParserError> {
    let mut c = LeCursor::new(payload);
    let chn = c.u8()?;
    let sv_id = c.u8()?;
    let mut dwrd = [0u32; 10];
    for slot in &mut dwrd {
        *slot = c.u32()?;
    }
    Ok(UbxMessage::RxmSfrb(RxmSfrb { chn, sv_id, dwrd }))
}

/// Encodes a typed message's payload bytes (class/subclass/length/checksum
/// are added by [`super::encoder`]).
pub fn encode(message: &UbxMessage) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    match message {
        UbxMessage::CfgPrtUart(m) => {
            buf.push(m.port_id);
            buf.push(0);
            push_le_u16(&mut buf, m.tx_ready);
            push_le_u32(&mut buf, m.mode);
            push_le_u32(&mut buf, m.baud_rate);
            push_le_u16(&mut buf, m.in_proto_mask);
            push_le_u16(&mut buf, m.out_proto_mask);
            push_le_u16(&mut buf, m.flags);
            push_le_u16(&mut buf, 0); // reserved5
        }
        UbxMessage::CfgMsg(m) => {
            buf.push(m.msg_class);
            buf.push(m.msg_id);
            buf.push(m.rate);
        }
        UbxMessage::CfgRate(m) => {
            push_le_u16(&mut buf, m.measure_rate_ms);
            push_le_u16(&mut buf, m.nav_rate);
            push_le_u16(&mut buf, m.time_ref);
        }
        UbxMessage::CfgNav5(m) => {
            push_le_u16(&mut buf, m.mask);
            buf.push(m.dyn_model);
            buf.push(m.fix_mode);
            push_le_i32(&mut buf, (m.fixed_alt / 0.01).round() as i32);
            push_le_u32(&mut buf, (m.fixed_alt_var / 0.0001).round() as u32);
            buf.push(m.min_elev_degrees as u8);
            buf.push(0); // dr_limit
            push_le_u16(&mut buf, (m.pdop / 0.1).round() as u16);
            push_le_u16(&mut buf, (m.tdop / 0.1).round() as u16);
            push_le_u16(&mut buf, m.pacc);
            push_le_u16(&mut buf, m.tacc);
            buf.push((m.static_hold_thresh / 0.01).round() as u8);
            buf.push(m.dgps_time_out);
            buf.push(m.cno_thresh_num_svs);
            buf.push(m.cno_thresh);
            buf.extend_from_slice(&[0, 0]); // reserved1
            push_le_u16(&mut buf, m.static_hold_max_dist);
            buf.push(m.utc_standard);
            buf.extend_from_slice(&[0; 5]); // reserved2
        }
        UbxMessage::CfgTmode3(m) => {
            buf.push(m.version);
            buf.push(0); // reserved0
            let mode = m.mode as u16 | if m.lla { 0x100 } else { 0 };
            push_le_u16(&mut buf, mode);
            push_le_i32(&mut buf, m.ecef_x_or_lat);
            push_le_i32(&mut buf, m.ecef_y_or_lon);
            push_le_i32(&mut buf, m.ecef_z_or_alt);
            buf.push(m.ecef_x_or_lat_hp as u8);
            buf.push(m.ecef_y_or_lon_hp as u8);
            buf.push(m.ecef_z_or_alt_hp as u8);
            buf.push(0); // reserved1
            push_le_u32(&mut buf, m.fixed_pos_acc);
            push_le_u32(&mut buf, m.sv_in_min_dur);
            push_le_u32(&mut buf, m.sv_in_acc_limit);
        }
        UbxMessage::NavTimeUtc(m) => {
            push_le_u32(&mut buf, m.itow_ms);
            push_le_u32(&mut buf, m.time_accuracy_ns);
            push_le_i32(&mut buf, m.nanos);
            push_le_u16(&mut buf, m.year);
            buf.push(m.month);
            buf.push(m.day);
            buf.push(m.hour);
            buf.push(m.min);
            buf.push(m.sec);
            buf.push(m.valid);
        }
        UbxMessage::NavVelNed(m) => {
            push_le_u32(&mut buf, m.itow_ms);
            push_le_i32(&mut buf, (m.vel_north_m_s / 1e-2).round() as i32);
            push_le_i32(&mut buf, (m.vel_east_m_s / 1e-2).round() as i32);
            push_le_i32(&mut buf, (m.vel_down_m_s / 1e-2).round() as i32);
            push_le_u32(&mut buf, (m.speed_3d_m_s / 1e-2).round() as u32);
            push_le_u32(&mut buf, (m.ground_speed_m_s / 1e-2).round() as u32);
            push_le_i32(&mut buf, (m.heading_degrees / 1e-5).round() as i32);
            push_le_u32(&mut buf, (m.speed_accuracy_m_s / 1e-2).round() as u32);
            push_le_u32(&mut buf, (m.course_accuracy_degrees / 1e-5).round() as u32);
        }
        UbxMessage::NavSvin(m) => {
            push_le_u32(&mut buf, m.itow_ms);
            push_le_u32(&mut buf, m.dur_s);
            push_le_i32(&mut buf, m.mean_x_cm);
            push_le_i32(&mut buf, m.mean_y_cm);
            push_le_i32(&mut buf, m.mean_z_cm);
            buf.extend_from_slice(&[0, 0, 0]);
            buf.push(0);
            push_le_u32(&mut buf, m.mean_accuracy_mm);
            push_le_u32(&mut buf, m.observations);
            buf.push(m.valid as u8);
            buf.push(m.active as u8);
        }
        UbxMessage::NavPvt(m) => {
            push_le_u32(&mut buf, m.itow_ms);
            push_le_u16(&mut buf, m.year);
            buf.push(m.month);
            buf.push(m.day);
            buf.push(m.hour);
            buf.push(m.min);
            buf.push(m.sec);
            buf.push(m.valid);
            push_le_u32(&mut buf, 0); // time_accuracy
            push_le_i32(&mut buf, 0); // nanosecond
            buf.push(m.fix_type);
            buf.push(m.flags);
            buf.push(0); // flags2
            buf.push(m.num_satellites);
            push_le_i32(&mut buf, (m.lon_degrees / 1e-7).round() as i32);
            push_le_i32(&mut buf, (m.lat_degrees / 1e-7).round() as i32);
            push_le_i32(&mut buf, (m.height_m / 1e-3).round() as i32);
            push_le_i32(&mut buf, (m.height_msl_m / 1e-3).round() as i32);
            push_le_u32(&mut buf, 0); // horiz_accuracy
            push_le_u32(&mut buf, 0); // vert_accuracy
            push_le_i32(&mut buf, (m.vel_north_m_s / 1e-3).round() as i32);
            push_le_i32(&mut buf, (m.vel_east_m_s / 1e-3).round() as i32);
            push_le_i32(&mut buf, (m.vel_down_m_s / 1e-3).round() as i32);
            push_le_u32(&mut buf, (m.ground_speed_m_s / 1e-3).round() as u32);
            push_le_i32(&mut buf, (m.heading_degrees / 1e-5).round() as i32);
            push_le_u32(&mut buf, 0); // speed_accuracy_estimate
            push_le_u32(&mut buf, 0); // heading_accuracy_estimate
            push_le_u16(&mut buf, (m.pdop / 0.01).round() as u16);
            buf.extend_from_slice(&[0; 6]); // reserved1
            push_le_i32(&mut buf, 0); // heading_of_vehicle
            push_le_i16(&mut buf, 0); // magnetic_declination
            push_le_u16(&mut buf, 0); // magnetic_declination_accuracy
        }
        UbxMessage::MonHw(m) => {
            buf.extend_from_slice(&[0u8; 16]); // pin_sel/bank/dir/val
            push_le_u16(&mut buf, m.noise_per_ms);
            push_le_u16(&mut buf, m.agc_cnt);
            buf.push(m.antenna_status);
            buf.push(m.antenna_power);
            buf.push(m.flags);
            buf.push(0); // reserved1
            push_le_u32(&mut buf, 0); // used_mask
            buf.extend_from_slice(&[0u8; 17]); // vp
            buf.push(m.jam_ind);
            buf.extend_from_slice(&[0, 0]); // reserved2
            push_le_u32(&mut buf, 0); // pin_irq
            push_le_u32(&mut buf, 0); // pull_h
            push_le_u32(&mut buf, 0); // pull_l
        }
        UbxMessage::MonVer(m) => {
            push_fixed_str(&mut buf, &m.software_version, 30);
            push_fixed_str(&mut buf, &m.hardware_version, 10);
            for extension in &m.extensions {
                push_fixed_str(&mut buf, extension, 30);
            }
        }
        UbxMessage::RxmRawx(m) => {
            push_le_f64(&mut buf, m.rcv_tow_s);
            push_le_u16(&mut buf, m.week);
            buf.push(m.leap_s as u8);
            buf.push(m.measurements.len() as u8);
            buf.push(m.rec_stat);
            buf.extend_from_slice(&[0, 0, 0]);
            for measurement in &m.measurements {
                push_le_f64(&mut buf, measurement.pseudorange_m);
                push_le_f64(&mut buf, measurement.carrier_phase_cycles);
                push_le_u32(&mut buf, measurement.doppler_hz.to_bits());
                buf.push(measurement.gnss_id);
                buf.push(measurement.sv_id);
                buf.push(0); // reserved2
                buf.push(measurement.freq_id);
                push_le_u16(&mut buf, measurement.lock_time_ms);
                buf.push(measurement.cno_db_hz);
                buf.push(0); // pr_stdev
                buf.push(0); // cp_stdev
                buf.push(0); // do_stdev
                buf.push(measurement.trk_stat);
                buf.push(0); // reserved3
            }
        }
        UbxMessage::RxmSfrbx(m) => {
            buf.push(m.gnss_id);
            buf.push(m.sv_id);
            buf.push(0); // reserved1
            buf.push(m.freq_id);
            buf.push(m.words.len() as u8);
            buf.push(0); // reserved2
            buf.push(m.version);
            buf.push(0); // reserved3
            for word in &m.words {
                push_le_u32(&mut buf, *word);
            }
        }
        UbxMessage::RxmRaw(m) => {
            push_le_f64(&mut buf, m.rcv_tow_ms);
            push_le_u16(&mut buf, m.week);
            buf.push(m.measurements.len() as u8);
            buf.push(0); // reserved1
            for measurement in &m.measurements {
                push_le_f64(&mut buf, measurement.carrier_phase_cycles);
                push_le_f64(&mut buf, measurement.pseudorange_m);
                push_le_u32(&mut buf, measurement.doppler_hz.to_bits());
                buf.push(measurement.sv_id);
                buf.push(measurement.mes_qi as u8);
                buf.push(measurement.cno_db_hz as u8);
                buf.push(measurement.lli);
            }
        }
        UbxMessage::RxmSfrb(m) => {
            buf.push(m.chn);
            buf.push(m.sv_id);
            for word in m.dwrd {
                push_le_u32(&mut buf, word);
            }
        }
        UbxMessage::Unknown { payload, .. } => {
            buf.extend_from_slice(payload);
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "alloc")]
    use alloc::{string::ToString, vec};

    #[test]
    fn cfg_rate_round_trips() {
        let message = UbxMessage::CfgRate(CfgRate {
            measure_rate_ms: 1000,
            nav_rate: 1,
            time_ref: 1,
        });
        let bytes = encode(&message).unwrap();
        assert_eq!(bytes, vec![0xE8, 0x03, 0x01, 0x00, 0x01, 0x00]);
        let decoded = decode(0x06, 0x08, &bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn nav_pvt_round_trips_lat_lon_scaling() {
        let message = UbxMessage::NavPvt(NavPvt {
            itow_ms: 100,
            year: 2026,
            month: 7,
            day: 27,
            hour: 10,
            min: 0,
            sec: 0,
            valid: 0x07,
            fix_type: 3,
            flags: 1,
            num_satellites: 12,
            lon_degrees: 2.3522,
            lat_degrees: 48.8566,
            height_m: 100.0,
            height_msl_m: 95.0,
            vel_north_m_s: 1.0,
            vel_east_m_s: 0.5,
            vel_down_m_s: 0.0,
            ground_speed_m_s: 1.1,
            heading_degrees: 45.0,
            pdop: 1.5,
        });
        let bytes = encode(&message).unwrap();
        match decode(0x01, 0x07, &bytes).unwrap() {
            UbxMessage::NavPvt(decoded) => {
                assert!((decoded.lon_degrees - 2.3522).abs() < 1e-6);
                assert!((decoded.lat_degrees - 48.8566).abs() < 1e-6);
                assert_eq!(decoded.num_satellites, 12);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn mon_ver_reads_nul_padded_strings_and_extensions() {
        let message = UbxMessage::MonVer(MonVer {
            software_version: "ROM BASE 3.01".into(),
            hardware_version: "00080000".into(),
            extensions: vec!["FWVER=SPG 4.04".into()],
        });
        let bytes = encode(&message).unwrap();
        match decode(0x0A, 0x04, &bytes).unwrap() {
            UbxMessage::MonVer(decoded) => {
                assert_eq!(decoded.software_version, "ROM BASE 3.01");
                assert_eq!(decoded.extensions, vec!["FWVER=SPG 4.04".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_class_id_preserves_raw_payload() {
        let decoded = decode(0xFF, 0xFF, &[1, 2, 3]).unwrap();
        assert_eq!(
            decoded,
            UbxMessage::Unknown {
                class: 0xFF,
                id: 0xFF,
                payload: vec![1, 2, 3],
            }
        );
    }
}
