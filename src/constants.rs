//! Physical and geodetic constants.
//!
//! Two distinct Earth models live here on purpose: SGP4 propagates against
//! the gravity model the TLE was fitted to (WGS-72 by NORAD convention),
//! while the ground-site ellipsoid follows the station survey datum.

use std::f64::consts::PI;

pub const TWOPI: f64 = 2.0 * PI;
pub const DEG2RAD: f64 = PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / PI;

/// J2000.0 reference epoch, Julian Date.
pub const J2000_JD: f64 = 2_451_545.0;
/// MJD = JD - this.
pub const MJD_OFFSET: f64 = 2_400_000.5;
/// Reference epoch for seconds-of-time arithmetic.
pub const SECONDS_REF_JD: f64 = 2_450_000.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// Earth rotation rate, rad/s.
pub const EARTH_ANGULAR_VELOCITY: f64 = 7.292115e-5;

/// Ground-site reference ellipsoid semi-major axis, metres.
pub const SITE_SEMI_MAJOR_M: f64 = 6_378_136.49;
/// Ground-site reference ellipsoid flattening.
pub const SITE_FLATTENING: f64 = 1.0 / 298.25642;
/// First eccentricity squared of the site ellipsoid, e2 = 2f - f^2.
pub const SITE_ECC_SQ: f64 = 2.0 * SITE_FLATTENING - SITE_FLATTENING * SITE_FLATTENING;

/// Earth gravity model parameters used by the propagator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityConstants {
    /// Minutes per time unit, 1/xke.
    pub tumin: f64,
    /// Gravitational parameter, km^3/s^2.
    pub mu: f64,
    /// Equatorial radius, km.
    pub radius_earth_km: f64,
    /// sqrt(mu) in Earth-radii^1.5 per minute.
    pub xke: f64,
    pub j2: f64,
    pub j3: f64,
    pub j4: f64,
    pub j3oj2: f64,
}

/// Which gravity model to propagate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GravityModel {
    Wgs72Old,
    /// NORAD convention for TLE propagation.
    #[default]
    Wgs72,
    Wgs84,
}

impl GravityModel {
    pub fn constants(self) -> GravityConstants {
        match self {
            GravityModel::Wgs72Old => {
                let mu = 398_600.79964_f64;
                let radius_earth_km = 6378.135;
                // The historical value, not derived from mu.
                let xke = 0.074_366_916_1_f64;
                GravityConstants {
                    tumin: 1.0 / xke,
                    mu,
                    radius_earth_km,
                    xke,
                    j2: 0.001_082_616,
                    j3: -0.000_002_538_81,
                    j4: -0.000_001_655_97,
                    j3oj2: -0.000_002_538_81 / 0.001_082_616,
                }
            }
            GravityModel::Wgs72 => {
                let mu = 398_600.8_f64;
                let radius_earth_km = 6378.135_f64;
                let xke = 60.0 / (radius_earth_km * radius_earth_km * radius_earth_km / mu).sqrt();
                GravityConstants {
                    tumin: 1.0 / xke,
                    mu,
                    radius_earth_km,
                    xke,
                    j2: 0.001_082_616,
                    j3: -0.000_002_538_81,
                    j4: -0.000_001_655_97,
                    j3oj2: -0.000_002_538_81 / 0.001_082_616,
                }
            }
            GravityModel::Wgs84 => {
                let mu = 398_600.5_f64;
                let radius_earth_km = 6378.137_f64;
                let xke = 60.0 / (radius_earth_km * radius_earth_km * radius_earth_km / mu).sqrt();
                GravityConstants {
                    tumin: 1.0 / xke,
                    mu,
                    radius_earth_km,
                    xke,
                    j2: 0.001_082_629_989_05,
                    j3: -0.000_002_532_153_06,
                    j4: -0.000_001_610_987_61,
                    j3oj2: -0.000_002_532_153_06 / 0.001_082_629_989_05,
                }
            }
        }
    }
}

/// Wrap an angle to [0, 2*pi).
#[inline]
pub fn wrap_to_2pi(x: f64) -> f64 {
    let mut v = x % TWOPI;
    if v < 0.0 {
        v += TWOPI;
    }
    v
}
