//! Greenwich sidereal time and the TEME -> ECEF frame rotation.
//!
//! `gmst` is the mean sidereal angle (IERS Technical Note 21 polynomial);
//! `gast` adds the equation-of-equinoxes approximation. The Earth-fixed
//! rotation uses the mean angle.

use crate::constants::{DEG2RAD, EARTH_ANGULAR_VELOCITY, J2000_JD, TWOPI};

/// Reference frame tag for a Cartesian state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// True equator, mean equinox of date — what SGP4 emits.
    TemeOfDate,
    /// Earth-centred Earth-fixed.
    Ecef,
}

/// Position/velocity pair in metres and metres per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position_m: [f64; 3],
    pub velocity_mps: [f64; 3],
    pub frame: Frame,
}

/// Split a JD so the fraction measures from 0h UT of the civil day.
fn split_from_midnight(jd: f64) -> (f64, f64) {
    let int = jd.trunc();
    let frac = jd - int;
    if frac >= 0.5 {
        (int + 0.5, frac - 0.5)
    } else {
        (int - 0.5, frac + 0.5)
    }
}

/// Greenwich Mean Sidereal Time in radians, reduced to [0, 2*pi).
///
/// `jd_ut1` is a UT1 Julian Date. The polynomial is evaluated at the
/// preceding 0h UT and the fractional day enters through the solar-to-
/// sidereal rate R.
pub fn gmst(jd_ut1: f64) -> f64 {
    let (jd0, fday) = split_from_midnight(jd_ut1);
    let dt = jd0 - J2000_JD;

    let mut gst = (100.460618375 + 0.98564736628633356 * dt + 2.90788e-13 * dt * dt
        - 5.3e-22 * dt * dt * dt)
        * DEG2RAD;

    let tc = dt / 36_525.0;
    let rate = 1.002737909350795 + 5.9006e-11 * tc - 5.9e-15 * tc * tc;
    gst += rate * fday * TWOPI;

    gst = gst % TWOPI;
    if gst < 0.0 {
        gst += TWOPI;
    }
    gst
}

/// Greenwich Apparent Sidereal Time: [`gmst`] plus the short equation-of-
/// equinoxes series in the lunar node.
pub fn gast(jd_ut1: f64) -> f64 {
    let t = (jd_ut1 - J2000_JD) / 36_525.0;
    let mut omega = 2.1824391966 - 33.7570446126362 * t + 3.62262478e-5 * t * t;
    omega = omega % TWOPI;
    if omega < 0.0 {
        omega += TWOPI;
    }
    let eqeq = 1.279908e-8 * omega.sin() + 3.054326e-10 * (2.0 * omega).sin();
    let gst = gmst(jd_ut1) + eqeq;
    gst % TWOPI
}

/// Rotate a TEME state into the Earth-fixed frame at `jd_ut1`.
///
/// Position rotates by the sidereal angle; the velocity gets the same
/// rotation and then loses the Earth-rotation contribution omega x r.
pub fn teme_to_ecef(state: &StateVector, jd_ut1: f64) -> StateVector {
    debug_assert_eq!(state.frame, Frame::TemeOfDate);

    let theta = gmst(jd_ut1);
    let (sin_t, cos_t) = theta.sin_cos();
    let r = &state.position_m;
    let v = &state.velocity_mps;

    let p = [
        r[0] * cos_t + r[1] * sin_t,
        -r[0] * sin_t + r[1] * cos_t,
        r[2],
    ];
    let w = EARTH_ANGULAR_VELOCITY;
    let vel = [
        v[0] * cos_t + v[1] * sin_t + p[1] * w,
        -v[0] * sin_t + v[1] * cos_t - p[0] * w,
        v[2],
    ];

    StateVector {
        position_m: p,
        velocity_mps: vel,
        frame: Frame::Ecef,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gmst_j2000_regression() {
        assert_abs_diff_eq!(gmst(2_451_545.0), 4.894961212735794, epsilon = 1e-10);
    }

    #[test]
    fn gmst_stays_in_range() {
        for jd in [2_440_000.2, 2_451_544.5, 2_451_545.0, 2_460_385.0, 2_470_000.9] {
            let g = gmst(jd);
            assert!((0.0..TWOPI).contains(&g), "gmst({jd}) = {g}");
        }
    }

    #[test]
    fn gast_close_to_gmst() {
        // The equation of equinoxes is a ~1e-8 rad correction.
        let jd = 2_460_385.0;
        assert!((gast(jd) - gmst(jd)).abs() < 1e-7);
        assert!(gast(jd) != gmst(jd));
    }

    #[test]
    fn gmst_advances_faster_than_solar_time() {
        // One solar day advances the sidereal angle by ~2pi + 0.9856 deg.
        let g0 = gmst(2_460_385.0);
        let g1 = gmst(2_460_386.0);
        let mut advance = g1 - g0;
        if advance < 0.0 {
            advance += TWOPI;
        }
        assert_abs_diff_eq!(advance, 0.9856 * DEG2RAD, epsilon = 1e-5);
    }

    #[test]
    fn rotation_preserves_position_magnitude() {
        let state = StateVector {
            position_m: [7.0e6, 1.0e6, 2.0e6],
            velocity_mps: [1.0e3, 7.0e3, 0.5e3],
            frame: Frame::TemeOfDate,
        };
        let ecef = teme_to_ecef(&state, 2_460_385.25);
        assert_eq!(ecef.frame, Frame::Ecef);
        let mag = |v: &[f64; 3]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        assert_abs_diff_eq!(mag(&ecef.position_m), mag(&state.position_m), epsilon = 1e-6);
    }

    #[test]
    fn rotation_by_zero_angle_at_matching_epoch() {
        // Pick the JD where gmst is the rotation angle; a vector along the
        // instantaneous Greenwich meridian maps onto +x.
        let jd = 2_460_385.25;
        let theta = gmst(jd);
        let r = 7.0e6;
        let state = StateVector {
            position_m: [r * theta.cos(), r * theta.sin(), 0.0],
            velocity_mps: [0.0, 0.0, 0.0],
            frame: Frame::TemeOfDate,
        };
        let ecef = teme_to_ecef(&state, jd);
        assert_abs_diff_eq!(ecef.position_m[0], r, epsilon = 1e-4);
        assert_abs_diff_eq!(ecef.position_m[1], 0.0, epsilon = 1e-4);
        // An inertially at-rest point picks up -omega x r in the rotating frame.
        assert_abs_diff_eq!(
            ecef.velocity_mps[1],
            -r * EARTH_ANGULAR_VELOCITY,
            epsilon = 1e-6
        );
    }
}
