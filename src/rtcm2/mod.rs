//! RTCM SC-104 v2 codec: a 6-bit-reversed, parity-protected bitstream with
//! no byte-level framing of its own.

mod encoder;
mod messages;
mod parser;

pub use encoder::Rtcm2Encoder;
pub use messages::{CorrectionData, Rtcm2Header, Rtcm2Message};
pub use parser::Rtcm2Parser;
