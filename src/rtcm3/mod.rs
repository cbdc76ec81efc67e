//! RTCM SC-104 v3 codec: a byte-framed, CRC-24Q-protected message family
//! covering GPS/GLONASS RTK observations, stationary antenna and descriptor
//! messages, GPS broadcast ephemeris, and the MSM family.

mod encoder;
mod messages;
mod parser;

pub use encoder::encode;
pub use messages::{
    decode, AntennaDescriptor, GlonassL1Signal, GlonassL2Signal, GlonassSatelliteObservation,
    GpsEphemeris, GpsEphemerisRaw, GpsL1Signal, GpsL2Signal, GpsSatelliteObservation, MsmCell,
    MsmPacket, MsmSatellite, Rtcm3Message, StationaryAntenna,
};
pub use parser::Rtcm3Parser;
