//! UBX codec: u-blox's length-prefixed, Fletcher-8 checksummed binary
//! protocol, covering the receiver-configuration and navigation message
//! subset used at the NTRIP/receiver boundary.

mod encoder;
mod messages;
mod parser;

pub use encoder::encode;
pub use messages::{
    decode, CfgMsg, CfgNav5, CfgPrtUart, CfgRate, CfgTmode3, MonHw, MonVer, NavPvt, NavSvin,
    NavTimeUtc, NavVelNed, RxmRaw, RxmRawMeasurement, RxmRawx, RxmRawxMeasurement, RxmSfrb,
    RxmSfrbx, UbxMessage,
};
pub use parser::UbxParser;
