//! Typed positions and velocities, with the JSON marshalling conventions
//! the collaborators at the NTRIP/telemetry boundary expect (scaled
//! integers, trailing-null omission) rather than a derived, field-named
//! representation.

/// A generic 3D vector. [`VelocityNed`], [`VelocityXyz`] and [`PositionXyz`]
/// are unit/axis-labelled views over the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3D { x, y, z }
    }

    pub fn distance(&self, other: &Vector3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Standard X-Y-Z position vector. The Flockwave-style wire JSON stores
/// positions as mm integers rather than raw floating point metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionXyz(pub Vector3D);

impl PositionXyz {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        PositionXyz(Vector3D::new(x, y, z))
    }
}

/// Standard X-Y-Z velocity vector, mm/s in its JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityXyz(pub Vector3D);

impl VelocityXyz {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        VelocityXyz(Vector3D::new(x, y, z))
    }
}

/// NED (North-East-Down) velocity vector. `north` aliases `x`, `east`
/// aliases `y`, `down` aliases `z`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityNed(Vector3D);

impl VelocityNed {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        VelocityNed(Vector3D::new(north, east, down))
    }

    pub fn north(&self) -> f64 {
        self.0.x
    }

    pub fn east(&self) -> f64 {
        self.0.y
    }

    pub fn down(&self) -> f64 {
        self.0.z
    }
}

/// ECEF (Earth-Centered, Earth-Fixed) position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EcefCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EcefCoordinate {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        EcefCoordinate { x, y, z }
    }
}

/// A GPS coordinate: latitude/longitude in degrees, plus up to three
/// independent, optional altitude channels.
///
/// Invariant: each altitude channel is independently optional; there is no
/// requirement that any of them be set, and a coordinate with none of them
/// is legal (used, for example, for a pure lat/lon fix).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsCoordinate {
    pub lat: f64,
    pub lon: f64,
    /// Altitude above mean sea level, metres.
    pub amsl: Option<f64>,
    /// Altitude above home level, metres.
    pub ahl: Option<f64>,
    /// Altitude above ground level, metres.
    pub agl: Option<f64>,
}

impl GpsCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        GpsCoordinate {
            lat,
            lon,
            amsl: None,
            ahl: None,
            agl: None,
        }
    }

    pub fn with_amsl(mut self, amsl: Option<f64>) -> Self {
        self.amsl = amsl;
        self
    }

    pub fn with_ahl(mut self, ahl: Option<f64>) -> Self {
        self.ahl = ahl;
        self
    }

    pub fn with_agl(mut self, agl: Option<f64>) -> Self {
        self.agl = agl;
        self
    }
}

/// A coordinate in a local flat-earth tangent plane, metres from the
/// transform's origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlatEarthCoordinate {
    pub x: f64,
    pub y: f64,
    pub amsl: Option<f64>,
    pub ahl: Option<f64>,
    pub agl: Option<f64>,
}

impl FlatEarthCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        FlatEarthCoordinate {
            x,
            y,
            amsl: None,
            ahl: None,
            agl: None,
        }
    }

    pub fn with_amsl(mut self, amsl: Option<f64>) -> Self {
        self.amsl = amsl;
        self
    }

    pub fn with_ahl(mut self, ahl: Option<f64>) -> Self {
        self.ahl = ahl;
        self
    }

    pub fn with_agl(mut self, agl: Option<f64>) -> Self {
        self.agl = agl;
        self
    }
}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde_json::{json, Value};

    #[cfg(feature = "alloc")]
    use alloc::vec;

    fn scaled_round(v: f64, scale: f64) -> i64 {
        (v * scale).round() as i64
    }

    impl Vector3D {
        pub fn to_json(&self) -> Value {
            json!([self.x, self.y, self.z])
        }
    }

    impl PositionXyz {
        /// `[x·1e3, y·1e3, z·1e3]` in mm, matching the Flockwave wire form.
        pub fn to_json(&self) -> Value {
            json!([
                scaled_round(self.0.x, 1e3),
                scaled_round(self.0.y, 1e3),
                scaled_round(self.0.z, 1e3),
            ])
        }
    }

    impl VelocityXyz {
        pub fn to_json(&self) -> Value {
            json!([
                scaled_round(self.0.x, 1e3),
                scaled_round(self.0.y, 1e3),
                scaled_round(self.0.z, 1e3),
            ])
        }
    }

    impl VelocityNed {
        pub fn to_json(&self) -> Value {
            json!([
                scaled_round(self.north(), 1e3),
                scaled_round(self.east(), 1e3),
                scaled_round(self.down(), 1e3),
            ])
        }
    }

    impl EcefCoordinate {
        /// `[x·1e3, y·1e3, z·1e3]` in mm.
        pub fn to_json(&self) -> Value {
            json!([
                scaled_round(self.x, 1e3),
                scaled_round(self.y, 1e3),
                scaled_round(self.z, 1e3),
            ])
        }
    }

    /// `[lat·1e7, lon·1e7, amsl·1e3|null, ahl·1e3|null, agl·1e3?]`.
    /// Trailing `null`s are never appended beyond the 4th element; a 5th
    /// element is present only when `agl` is set.
    impl GpsCoordinate {
        pub fn to_json(&self) -> Value {
            let mut arr = vec![
                Value::from(scaled_round(self.lat, 1e7)),
                Value::from(scaled_round(self.lon, 1e7)),
                self.amsl.map(|v| Value::from(scaled_round(v, 1e3))).unwrap_or(Value::Null),
                self.ahl.map(|v| Value::from(scaled_round(v, 1e3))).unwrap_or(Value::Null),
            ];
            if let Some(agl) = self.agl {
                arr.push(Value::from(scaled_round(agl, 1e3)));
            }
            Value::Array(arr)
        }
    }

    impl FlatEarthCoordinate {
        pub fn to_json(&self) -> Value {
            let mut arr = vec![
                Value::from(scaled_round(self.x, 1e3)),
                Value::from(scaled_round(self.y, 1e3)),
                self.amsl.map(|v| Value::from(scaled_round(v, 1e3))).unwrap_or(Value::Null),
                self.ahl.map(|v| Value::from(scaled_round(v, 1e3))).unwrap_or(Value::Null),
            ];
            if let Some(agl) = self.agl {
                arr.push(Value::from(scaled_round(agl, 1e3)));
            }
            Value::Array(arr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ned_velocity_aliases_match_axes() {
        let v = VelocityNed::new(1.0, 2.0, 3.0);
        assert_eq!(v.north(), 1.0);
        assert_eq!(v.east(), 2.0);
        assert_eq!(v.down(), 3.0);
    }

    #[test]
    fn gps_coordinate_default_has_no_altitudes() {
        let c = GpsCoordinate::new(1.0, 2.0);
        assert!(c.amsl.is_none());
        assert!(c.ahl.is_none());
        assert!(c.agl.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn gps_coordinate_json_omits_trailing_nulls_without_agl() {
        let c = GpsCoordinate::new(10.0, 20.0).with_amsl(Some(5.0));
        let json = c.to_json();
        assert_eq!(json, serde_json::json!([100_000_000, 200_000_000, 5000, null]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn gps_coordinate_json_includes_agl_as_fifth_element() {
        let c = GpsCoordinate::new(0.0, 0.0).with_agl(Some(1.5));
        let json = c.to_json();
        assert_eq!(json, serde_json::json!([0, 0, null, null, 1500]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn ecef_json_is_mm_integers() {
        let c = EcefCoordinate::new(1.2345, -2.0, 0.0);
        assert_eq!(c.to_json(), serde_json::json!([1234, -2000, 0]));
    }
}
