//! Geodetic <-> Cartesian conversions and topocentric look angles on the
//! ground-site reference ellipsoid.

use crate::constants::{SITE_ECC_SQ, SITE_SEMI_MAJOR_M, TWOPI};
use std::f64::consts::FRAC_PI_2;

/// Geodetic position on the site ellipsoid. Angles in radians, height in
/// metres above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub height_m: f64,
}

/// Azimuth/elevation/range of a target as seen from a site.
/// Azimuth is measured from north through east, in [0, 2*pi).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Topocentric {
    pub azimuth: f64,
    pub elevation: f64,
    pub range_m: f64,
}

impl Geodetic {
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, height_m: f64) -> Self {
        Geodetic {
            latitude: lat_deg.to_radians(),
            longitude: lon_deg.to_radians(),
            height_m,
        }
    }

    /// Geodetic -> ECEF, metres.
    pub fn to_ecef(&self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        let n = SITE_SEMI_MAJOR_M / (1.0 - SITE_ECC_SQ * sin_lat * sin_lat).sqrt();
        [
            (n + self.height_m) * cos_lat * cos_lon,
            (n + self.height_m) * cos_lat * sin_lon,
            (n * (1.0 - SITE_ECC_SQ) + self.height_m) * sin_lat,
        ]
    }

    /// ECEF -> geodetic by fixed-point iteration on the latitude.
    ///
    /// Ten passes converge far below practically relevant precision for
    /// terrestrial and orbital heights. Longitude comes out in [0, 2*pi).
    pub fn from_ecef(ecef: [f64; 3]) -> Self {
        let [x, y, z] = ecef;
        let mut longitude = y.atan2(x);
        if longitude < 0.0 {
            longitude += TWOPI;
        }

        let horizontal = (x * x + y * y).sqrt();
        if z == 0.0 {
            return Geodetic {
                latitude: 0.0,
                longitude,
                height_m: horizontal - SITE_SEMI_MAJOR_M,
            };
        }
        if horizontal == 0.0 {
            return Geodetic {
                latitude: if z < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 },
                longitude,
                height_m: z.abs() - SITE_SEMI_MAJOR_M / (1.0 - SITE_ECC_SQ).sqrt(),
            };
        }

        let zxy = z / horizontal;
        let mut lat = zxy.atan();
        let mut n = 0.0;
        for _ in 0..10 {
            let sin_lat = lat.sin();
            n = SITE_SEMI_MAJOR_M / (1.0 - SITE_ECC_SQ * sin_lat * sin_lat).sqrt();
            lat = (zxy * (1.0 + SITE_ECC_SQ * n * sin_lat / z)).atan();
        }

        Geodetic {
            latitude: lat,
            longitude,
            height_m: horizontal / lat.cos() - n,
        }
    }
}

/// Project a site-relative ECEF offset into the east-north-up frame and
/// return azimuth, elevation and range.
pub fn look_angles(site: &Geodetic, delta_ecef: [f64; 3]) -> Topocentric {
    let (sin_lat, cos_lat) = site.latitude.sin_cos();
    let (sin_lon, cos_lon) = site.longitude.sin_cos();
    let [dx, dy, dz] = delta_ecef;

    let up = cos_lon * cos_lat * dx + sin_lon * cos_lat * dy + sin_lat * dz;
    let north = -cos_lon * sin_lat * dx - sin_lon * sin_lat * dy + cos_lat * dz;
    let east = -sin_lon * dx + cos_lon * dy;

    let range_m = (dx * dx + dy * dy + dz * dz).sqrt();
    let elevation = (up / range_m).asin();
    let mut azimuth = east.atan2(north);
    if azimuth < 0.0 {
        azimuth += TWOPI;
    }

    Topocentric {
        azimuth,
        elevation,
        range_m,
    }
}

/// Packed degrees-minutes-seconds (+-DD.MMSSss) to radians.
///
/// 32.3930 reads as 32 deg 39 min 30 sec.
pub fn dms_to_radians(dms: f64) -> f64 {
    let sign = if dms < 0.0 { -1.0 } else { 1.0 };
    let dms = dms.abs();
    let degree = dms.trunc();
    let minute = ((dms - degree) * 100.0).trunc();
    let seconds = (dms - degree - minute / 100.0) * 10_000.0;
    sign * (degree + minute / 60.0 + seconds / 3600.0).to_radians()
}

/// Radians to packed degrees-minutes-seconds (+-DD.MMSSss).
pub fn radians_to_dms(radians: f64) -> f64 {
    let sign = if radians < 0.0 { -1.0 } else { 1.0 };
    let deg = radians.abs().to_degrees();
    let degree = deg.trunc();
    let temp = (deg - degree) * 60.0;
    let minute = temp.trunc();
    let seconds = (temp - minute) * 60.0;
    sign * (degree + minute / 100.0 + seconds / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn equator_prime_meridian_on_axis() {
        let g = Geodetic::from_degrees(0.0, 0.0, 0.0);
        let ecef = g.to_ecef();
        assert_abs_diff_eq!(ecef[0], SITE_SEMI_MAJOR_M, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn round_trip_various_sites() {
        let cases = [
            (32.656465, 110.745166, 0.0),
            (-45.0, -170.0, 2500.0),
            (71.2, 25.7, -120.0),
            (0.001, 0.0, 400_000.0),
            (-89.0, 10.0, 800_000.0),
        ];
        for (lat, lon, h) in cases {
            let g = Geodetic::from_degrees(lat, lon, h);
            let back = Geodetic::from_ecef(g.to_ecef());
            assert_abs_diff_eq!(back.latitude, g.latitude, epsilon = 1e-10);
            assert_abs_diff_eq!(back.height_m, g.height_m, epsilon = 1e-3);
            let mut lon_expect = g.longitude;
            if lon_expect < 0.0 {
                lon_expect += TWOPI;
            }
            assert_abs_diff_eq!(back.longitude, lon_expect, epsilon = 1e-10);
        }
    }

    #[test]
    fn polar_axis_branch() {
        let g = Geodetic::from_ecef([0.0, 0.0, 6_400_000.0]);
        assert_abs_diff_eq!(g.latitude, FRAC_PI_2, epsilon = 1e-12);
        let g = Geodetic::from_ecef([0.0, 0.0, -6_400_000.0]);
        assert_abs_diff_eq!(g.latitude, -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn target_straight_up_has_ninety_elevation() {
        let site = Geodetic::from_degrees(32.656465, 110.745166, 0.0);
        let site_ecef = site.to_ecef();
        let above = Geodetic {
            height_m: 500_000.0,
            ..site
        }
        .to_ecef();
        let delta = [
            above[0] - site_ecef[0],
            above[1] - site_ecef[1],
            above[2] - site_ecef[2],
        ];
        let t = look_angles(&site, delta);
        assert_abs_diff_eq!(t.elevation, FRAC_PI_2, epsilon = 1e-6);
        assert_abs_diff_eq!(t.range_m, 500_000.0, epsilon = 1e-3);
    }

    #[test]
    fn due_north_target_has_zero_azimuth() {
        // From the equator, a point slightly north at the same radius is
        // almost exactly in the +north ENU direction.
        let site = Geodetic::from_degrees(0.0, 0.0, 0.0);
        let north_point = Geodetic::from_degrees(1.0, 0.0, 0.0).to_ecef();
        let site_ecef = site.to_ecef();
        let delta = [
            north_point[0] - site_ecef[0],
            north_point[1] - site_ecef[1],
            north_point[2] - site_ecef[2],
        ];
        let t = look_angles(&site, delta);
        assert_abs_diff_eq!(t.azimuth, 0.0, epsilon = 1e-6);
        assert!(t.elevation < 0.0); // below the horizon, over the curve
    }

    #[test]
    fn due_east_target_has_quarter_turn_azimuth() {
        let site = Geodetic::from_degrees(0.0, 0.0, 0.0);
        let east_point = Geodetic::from_degrees(0.0, 1.0, 0.0).to_ecef();
        let site_ecef = site.to_ecef();
        let delta = [
            east_point[0] - site_ecef[0],
            east_point[1] - site_ecef[1],
            east_point[2] - site_ecef[2],
        ];
        let t = look_angles(&site, delta);
        assert_abs_diff_eq!(t.azimuth, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn packed_dms_round_trip() {
        // 32 deg 39 min 30 sec
        let rad = dms_to_radians(32.3930);
        assert_abs_diff_eq!(
            rad,
            (32.0_f64 + 39.0 / 60.0 + 30.0 / 3600.0).to_radians(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(radians_to_dms(rad), 32.3930, epsilon = 1e-9);
        // negative angles keep their sign through the packing
        let rad = dms_to_radians(-7.0730);
        assert!(rad < 0.0);
        assert_abs_diff_eq!(radians_to_dms(rad), -7.0730, epsilon = 1e-9);
    }
}
