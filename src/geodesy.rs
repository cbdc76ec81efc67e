//! WGS-84 ellipsoid parameters and the geodetic conversions built on top of
//! them: ECEF ↔ geodetic, the local tangent-plane ("flat-earth") transform,
//! and haversine distance.

use crate::coords::{EcefCoordinate, FlatEarthCoordinate, GpsCoordinate};
use crate::error::GeodesyError;

/// An ellipsoid of revolution, parameterised the way WGS-84 is: by an
/// equatorial radius and an inverse flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub equatorial_radius_m: f64,
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    /// The WGS-84 reference ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        equatorial_radius_m: 6_378_137.0,
        inverse_flattening: 298.257_223_563,
    };

    pub fn flattening(&self) -> f64 {
        1.0 / self.inverse_flattening
    }

    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }

    pub fn polar_radius_m(&self) -> f64 {
        self.equatorial_radius_m * (1.0 - self.flattening())
    }

    /// Mean radius (2a + b) / 3, as defined by the IUGG.
    pub fn mean_radius_m(&self) -> f64 {
        (2.0 * self.equatorial_radius_m + self.polar_radius_m()) / 3.0
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

/// Speed of light in m/s (GPS-specific constant, exact IEEE-754 value of
/// the decimal below).
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// The value of pi used by GPS ICD ephemeris/almanac scaling formulas. Not
/// bit-identical to `std::f64::consts::PI`; the interface spec calls for
/// this exact decimal.
pub const GPS_PI: f64 = 3.141_592_653_589_8;

/// Converts ECEF coordinates to geodetic (latitude/longitude/altitude)
/// using a closed-form, single-pass approximation (no iteration).
pub fn ecef_to_gps(ecef: &EcefCoordinate, ellipsoid: Ellipsoid) -> GpsCoordinate {
    let a = ellipsoid.equatorial_radius_m;
    let b = ellipsoid.polar_radius_m();
    let e2 = ellipsoid.eccentricity_squared();

    let (x, y, z) = (ecef.x, ecef.y, ecef.z);
    let p = (x * x + y * y).sqrt();
    let theta = (a * z).atan2(b * p);

    let ep2_times_b = (a * a - b * b) / b;
    let e2_times_a = a - b * b / a;

    let lat = (z + ep2_times_b * theta.sin().powi(3))
        .atan2(p - e2_times_a * theta.cos().powi(3));
    let lon = y.atan2(x);

    let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    let amsl = p / lat.cos() - n;

    GpsCoordinate::new(lat.to_degrees(), lon.to_degrees())
        .with_amsl(Some(amsl))
}

/// Converts geodetic coordinates to ECEF. Requires `coord.amsl` to be set.
pub fn gps_to_ecef(
    coord: &GpsCoordinate,
    ellipsoid: Ellipsoid,
) -> Result<EcefCoordinate, GeodesyError> {
    let height = coord.amsl.ok_or(GeodesyError::MissingAltitude)?;

    let a = ellipsoid.equatorial_radius_m;
    let e2 = ellipsoid.eccentricity_squared();

    let lat = coord.lat.to_radians();
    let lon = coord.lon.to_radians();

    let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    let cos_lat = lat.cos();
    let x = (n + height) * cos_lat * lon.cos();
    let y = (n + height) * cos_lat * lon.sin();
    let z = (n * (1.0 - e2) + height) * lat.sin();

    Ok(EcefCoordinate::new(x, y, z))
}

/// Great-circle distance between two GPS coordinates using the ellipsoid's
/// mean radius (haversine formula).
pub fn haversine(first: &GpsCoordinate, second: &GpsCoordinate, ellipsoid: Ellipsoid) -> f64 {
    let r = ellipsoid.mean_radius_m();
    let lat1 = first.lat.to_radians();
    let lat2 = second.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (second.lon - first.lon).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * r * a.sqrt().asin()
}

/// Axis convention for [`FlatEarthTransform`]: which compass direction the
/// second and third axes point in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisConvention {
    /// North-East-Up.
    Neu,
    /// North-West-Up.
    Nwu,
    /// North-East-Down.
    Ned,
    /// North-West-Down.
    Nwd,
}

impl AxisConvention {
    pub fn parse(s: &str) -> Result<Self, GeodesyError> {
        match s.to_ascii_lowercase().as_str() {
            "neu" => Ok(AxisConvention::Neu),
            "nwu" => Ok(AxisConvention::Nwu),
            "ned" => Ok(AxisConvention::Ned),
            "nwd" => Ok(AxisConvention::Nwd),
            _ => Err(GeodesyError::UnknownAxisConvention),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisConvention::Neu => "neu",
            AxisConvention::Nwu => "nwu",
            AxisConvention::Ned => "ned",
            AxisConvention::Nwd => "nwd",
        }
    }

    fn y_mul(&self) -> f64 {
        match self {
            AxisConvention::Neu | AxisConvention::Ned => 1.0,
            AxisConvention::Nwu | AxisConvention::Nwd => -1.0,
        }
    }

    fn z_mul(&self) -> f64 {
        match self {
            AxisConvention::Neu | AxisConvention::Nwu => 1.0,
            AxisConvention::Ned | AxisConvention::Nwd => -1.0,
        }
    }
}

/// Options used to construct a [`FlatEarthTransform`].
#[derive(Debug, Clone, Copy)]
pub struct FlatEarthOptions {
    pub origin: GpsCoordinate,
    /// Orientation of the X axis, in degrees clockwise from North.
    pub orientation_deg: f64,
    pub axes: AxisConvention,
}

impl Default for FlatEarthOptions {
    fn default() -> Self {
        FlatEarthOptions {
            origin: GpsCoordinate::new(0.0, 0.0),
            orientation_deg: 0.0,
            axes: AxisConvention::Nwu,
        }
    }
}

/// A local tangent-plane ("flat-earth") transform anchored at an origin,
/// with a configurable rotation and axis convention.
///
/// Precomputed coefficients depend only on the origin latitude, the
/// orientation and the ellipsoid, so they are cached at construction time
/// rather than recomputed on every conversion.
#[derive(Debug, Clone, Copy)]
pub struct FlatEarthTransform {
    origin: GpsCoordinate,
    orientation_deg: f64,
    axes: AxisConvention,
    r1: f64,
    r2_cos_origin_lat: f64,
    sin_alpha: f64,
    cos_alpha: f64,
}

impl FlatEarthTransform {
    pub fn new(options: FlatEarthOptions, ellipsoid: Ellipsoid) -> Self {
        let a = ellipsoid.equatorial_radius_m;
        let e2 = ellipsoid.eccentricity_squared();
        let origin_lat = options.origin.lat.to_radians();

        let x = 1.0 - e2 * origin_lat.sin().powi(2);
        let r1 = a * (1.0 - e2) / x.powf(1.5);
        let r2_cos_origin_lat = a / x.sqrt() * origin_lat.cos();

        FlatEarthTransform {
            origin: options.origin,
            orientation_deg: options.orientation_deg,
            axes: options.axes,
            r1,
            r2_cos_origin_lat,
            sin_alpha: options.orientation_deg.to_radians().sin(),
            cos_alpha: options.orientation_deg.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> GpsCoordinate {
        self.origin
    }

    pub fn orientation_deg(&self) -> f64 {
        self.orientation_deg
    }

    pub fn axes(&self) -> AxisConvention {
        self.axes
    }

    /// Converts a GPS coordinate to flat-earth coordinates relative to this
    /// transform's origin.
    pub fn to_flat(&self, coord: &GpsCoordinate) -> FlatEarthCoordinate {
        let dlat = (coord.lat - self.origin.lat).to_radians();
        let dlon = (coord.lon - self.origin.lon).to_radians();

        let x0 = dlat * self.r1;
        let y0 = dlon * self.r2_cos_origin_lat;

        let x = x0 * self.cos_alpha + y0 * self.sin_alpha;
        let y = -x0 * self.sin_alpha + y0 * self.cos_alpha;

        let y_mul = self.axes.y_mul();
        let z_mul = self.axes.z_mul();

        FlatEarthCoordinate::new(x, y * y_mul)
            .with_amsl(coord.amsl.map(|v| v * z_mul))
            .with_ahl(coord.ahl.map(|v| v * z_mul))
            .with_agl(coord.agl.map(|v| v * z_mul))
    }

    /// Converts flat-earth coordinates back to a GPS coordinate.
    pub fn to_gps(&self, coord: &FlatEarthCoordinate) -> GpsCoordinate {
        let y_mul = self.axes.y_mul();
        let z_mul = self.axes.z_mul();

        let x0 = coord.x;
        let y0 = coord.y * y_mul;

        let x = x0 * self.cos_alpha - y0 * self.sin_alpha;
        let y = x0 * self.sin_alpha + y0 * self.cos_alpha;

        let lat = (x / self.r1).to_degrees() + self.origin.lat;
        let lon = (y / self.r2_cos_origin_lat).to_degrees() + self.origin.lon;

        GpsCoordinate::new(lat, lon)
            .with_amsl(coord.amsl.map(|v| v * z_mul))
            .with_ahl(coord.ahl.map(|v| v * z_mul))
            .with_agl(coord.agl.map(|v| v * z_mul))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecef_geodetic_round_trip_recovers_position() {
        let original = GpsCoordinate::new(45.0, 12.0).with_amsl(Some(150.0));
        let ecef = gps_to_ecef(&original, Ellipsoid::WGS84).unwrap();
        let recovered = ecef_to_gps(&ecef, Ellipsoid::WGS84);
        assert!((recovered.lat - original.lat).abs() < 1e-9);
        assert!((recovered.lon - original.lon).abs() < 1e-9);
        assert!((recovered.amsl.unwrap() - 150.0).abs() < 1e-6);
    }

    #[test]
    fn gps_to_ecef_requires_amsl() {
        let coord = GpsCoordinate::new(0.0, 0.0);
        assert_eq!(gps_to_ecef(&coord, Ellipsoid::WGS84), Err(GeodesyError::MissingAltitude));
    }

    #[test]
    fn equator_prime_meridian_lies_on_equatorial_radius() {
        let coord = GpsCoordinate::new(0.0, 0.0).with_amsl(Some(0.0));
        let ecef = gps_to_ecef(&coord, Ellipsoid::WGS84).unwrap();
        assert!((ecef.x - Ellipsoid::WGS84.equatorial_radius_m).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-9);
        assert!(ecef.z.abs() < 1e-9);
    }

    #[test]
    fn haversine_lyon_paris_matches_reference_scenario() {
        let lyon = GpsCoordinate::new(45.7597, 4.8422);
        let paris = GpsCoordinate::new(48.8567, 2.3508);
        let ellipsoid = Ellipsoid {
            equatorial_radius_m: 6_371_000.0,
            inverse_flattening: f64::INFINITY,
        };
        // A sphere (flattening 0) of radius 6,371,000 m matches the mean
        // radius the reference scenario calls for directly.
        let d = haversine(&lyon, &paris, ellipsoid);
        assert!((d - 392_216.718).abs() < 1.0, "got {d}");
    }

    #[test]
    fn flat_earth_round_trip_nwu() {
        let origin = GpsCoordinate::new(47.4979, 19.0402);
        let xf = FlatEarthTransform::new(
            FlatEarthOptions {
                origin,
                orientation_deg: 0.0,
                axes: AxisConvention::Nwu,
            },
            Ellipsoid::WGS84,
        );
        let target = GpsCoordinate::new(47.55, 19.10).with_amsl(Some(120.0));
        let flat = xf.to_flat(&target);
        let back = xf.to_gps(&flat);
        assert!((back.lat - target.lat).abs() < 1e-5);
        assert!((back.lon - target.lon).abs() < 1e-5);
    }

    #[test]
    fn flat_earth_round_trip_all_conventions_with_rotation() {
        let origin = GpsCoordinate::new(10.0, 10.0);
        for axes in [
            AxisConvention::Neu,
            AxisConvention::Nwu,
            AxisConvention::Ned,
            AxisConvention::Nwd,
        ] {
            let xf = FlatEarthTransform::new(
                FlatEarthOptions {
                    origin,
                    orientation_deg: 37.0,
                    axes,
                },
                Ellipsoid::WGS84,
            );
            let target = GpsCoordinate::new(10.05, 9.95);
            let flat = xf.to_flat(&target);
            let back = xf.to_gps(&flat);
            assert!((back.lat - target.lat).abs() < 1e-5, "{:?}", axes);
            assert!((back.lon - target.lon).abs() < 1e-5, "{:?}", axes);
        }
    }

    #[test]
    fn axis_convention_rejects_unknown_name() {
        assert_eq!(AxisConvention::parse("xyz"), Err(GeodesyError::UnknownAxisConvention));
    }
}
