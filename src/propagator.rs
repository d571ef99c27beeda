//! SGP4 near-Earth propagator.
//!
//! One-shot initialization recovers the Brouwer mean motion from the TLE's
//! Kozai convention, classifies the orbit regime and precomputes every
//! secular and drag coefficient. `propagate` is then closed-form arithmetic
//! per call; the only state that moves between calls is the deep-space
//! resonance integrator.
//!
//! The math follows Vallado's SGP4 term for term. Positions come out in
//! metres, velocities in metres per second, in the TEME frame of date.

use std::f64::consts::PI;

use log::debug;
use thiserror::Error;

use crate::constants::{GravityConstants, GravityModel, TWOPI};
use crate::deep_space::{DeepSpace, DeepSpaceContext, Resonance};
use crate::elements::MeanElements;
use crate::sidereal::{gmst, Frame, StateVector};

/// Days from 1950 Jan 0.0 UT to the Julian Date origin.
const JD_1950: f64 = 2_433_281.5;

/// Guard divisor for the long-period coefficient near cos i = -1.
const TEMP4: f64 = 1.5e-12;

const X2O3: f64 = 2.0 / 3.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    /// The mean elements put perigee below the Earth's surface.
    #[error("perigee altitude {perigee_km:.1} km is inside the Earth")]
    PerigeeInsideEarth { perigee_km: f64 },

    /// Drag or lunisolar terms pushed eccentricity out of [ -1e-3, 1 ).
    #[error("mean eccentricity {eccentricity} outside the valid range")]
    EccentricityOutOfRange { eccentricity: f64 },

    /// Resonance integration drove the mean motion negative.
    #[error("mean motion {mean_motion} is not positive")]
    NonPositiveMeanMotion { mean_motion: f64 },

    /// The orbit degenerated (p < 0) after short-period corrections.
    #[error("semi-latus rectum {semi_latus} is negative")]
    NegativeSemiLatusRectum { semi_latus: f64 },

    /// Kepler's equation did not converge within ten iterations.
    #[error("Kepler iteration residual {residual} after 10 steps")]
    ConvergenceFailure { residual: f64 },

    /// The propagated radius dropped below one Earth radius.
    #[error("satellite has decayed (radius {radius_er} Earth radii)")]
    SatelliteDecayed { radius_er: f64 },
}

/// Orbit regime picked at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Perigee below 220 km: the D2..D4 drag polynomials and the C5 term
    /// are dropped.
    LowPerigee,
    Normal,
    /// Period of 225 minutes or more: lunisolar and resonance terms apply
    /// (and the simplified drag treatment, as for LowPerigee).
    DeepSpace,
}

/// Secular rates of the angular elements, rad/min.
#[derive(Debug, Clone, Copy)]
struct SecularRates {
    mdot: f64,
    argpdot: f64,
    nodedot: f64,
    /// Quadratic node drag coefficient.
    nodecf: f64,
}

/// Drag-related coefficients from the C/D/T series.
#[derive(Debug, Clone, Copy, Default)]
struct DragCoeffs {
    cc1: f64,
    cc4: f64,
    cc5: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    t2cof: f64,
    t3cof: f64,
    t4cof: f64,
    t5cof: f64,
    omgcof: f64,
    xmcof: f64,
    eta: f64,
    delmo: f64,
    sinmao: f64,
}

/// Mean (single-averaged) elements after the secular/drag/deep-space update,
/// before periodic corrections. Semi-major axis is in Earth radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagatedElements {
    pub semi_major_axis_er: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub raan: f64,
    pub arg_perigee: f64,
    pub mean_anomaly: f64,
    /// rad/min.
    pub mean_motion: f64,
}

/// An initialized SGP4/SDP4 propagator for a single satellite.
///
/// Everything is fixed at construction except the deep-space resonance
/// accumulators, which advance monotonically with the requested times and
/// reset on a sign change. Callers that need strict reproducibility for
/// arbitrary request orders should propagate from a fresh instance or keep
/// requests on one side of the epoch.
#[derive(Debug, Clone)]
pub struct Propagator {
    gravity: GravityConstants,
    epoch_jd: f64,
    bstar: f64,
    // Epoch elements (radians, rad/min).
    ecco: f64,
    inclo: f64,
    nodeo: f64,
    argpo: f64,
    mo: f64,
    /// Brouwer mean motion recovered from the Kozai value.
    no_unkozai: f64,
    regime: Regime,
    rates: SecularRates,
    drag: DragCoeffs,
    // Inclination-derived geometry at epoch.
    con41: f64,
    x1mth2: f64,
    x7thm1: f64,
    xlcof: f64,
    aycof: f64,
    deep: Option<DeepSpace>,
}

/// Kozai -> Brouwer recovery and epoch geometry, Vallado's `initl`.
struct InitGeometry {
    no_unkozai: f64,
    ao: f64,
    con41: f64,
    con42: f64,
    cosio: f64,
    cosio2: f64,
    sinio: f64,
    omeosq: f64,
    rteosq: f64,
    posq: f64,
    rp: f64,
}

fn recover_brouwer(gravity: &GravityConstants, ecco: f64, inclo: f64, no_kozai: f64) -> InitGeometry {
    let eccsq = ecco * ecco;
    let omeosq = 1.0 - eccsq;
    let rteosq = omeosq.sqrt();
    let cosio = inclo.cos();
    let cosio2 = cosio * cosio;

    let ak = (gravity.xke / no_kozai).powf(X2O3);
    let d1 = 0.75 * gravity.j2 * (3.0 * cosio2 - 1.0) / (rteosq * omeosq);
    let mut del = d1 / (ak * ak);
    let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
    del = d1 / (adel * adel);
    let no_unkozai = no_kozai / (1.0 + del);

    let ao = (gravity.xke / no_unkozai).powf(X2O3);
    let sinio = inclo.sin();
    let po = ao * omeosq;
    let con42 = 1.0 - 5.0 * cosio2;
    let con41 = -con42 - cosio2 - cosio2;

    InitGeometry {
        no_unkozai,
        ao,
        con41,
        con42,
        cosio,
        cosio2,
        sinio,
        omeosq,
        rteosq,
        posq: po * po,
        rp: ao * (1.0 - ecco),
    }
}

impl Propagator {
    /// Build a propagator from TLE mean elements against the given gravity
    /// model (WGS-72 for standard NORAD elements).
    pub fn new(elements: &MeanElements, model: GravityModel) -> Result<Self, PropagationError> {
        let gravity = model.constants();
        let ecco = elements.eccentricity;
        let inclo = elements.inclination;

        if !(0.0..1.0).contains(&ecco) {
            return Err(PropagationError::EccentricityOutOfRange { eccentricity: ecco });
        }

        let geo = recover_brouwer(&gravity, ecco, inclo, elements.mean_motion);
        let perigee_km = (geo.rp - 1.0) * gravity.radius_earth_km;
        if geo.rp < 1.0 {
            return Err(PropagationError::PerigeeInsideEarth { perigee_km });
        }

        // Density-profile fitting constant s and the (q0 - s)^4 coefficient,
        // lowered for perigees under 156 km.
        let mut sfour = 78.0 / gravity.radius_earth_km + 1.0;
        let mut qzms24 = ((120.0 - 78.0) / gravity.radius_earth_km).powi(4);
        if perigee_km < 156.0 {
            sfour = perigee_km - 78.0;
            if perigee_km < 98.0 {
                sfour = 20.0;
            }
            qzms24 = ((120.0 - sfour) / gravity.radius_earth_km).powi(4);
            sfour = sfour / gravity.radius_earth_km + 1.0;
        }

        let deep_space = TWOPI / geo.no_unkozai >= 225.0;
        let regime = if deep_space {
            Regime::DeepSpace
        } else if geo.rp < 220.0 / gravity.radius_earth_km + 1.0 {
            Regime::LowPerigee
        } else {
            Regime::Normal
        };

        let pinvsq = 1.0 / geo.posq;
        let tsi = 1.0 / (geo.ao - sfour);
        let eta = geo.ao * ecco * tsi;
        let etasq = eta * eta;
        let eeta = ecco * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qzms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);
        let cc2 = coef1
            * geo.no_unkozai
            * (geo.ao * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.375 * gravity.j2 * tsi / psisq
                    * geo.con41
                    * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let cc1 = elements.bstar * cc2;
        let mut cc3 = 0.0;
        if ecco > 1.0e-4 {
            cc3 = -2.0 * coef * tsi * gravity.j3oj2 * geo.no_unkozai * geo.sinio / ecco;
        }
        let x1mth2 = 1.0 - geo.cosio2;
        let cc4 = 2.0
            * geo.no_unkozai
            * coef1
            * geo.ao
            * geo.omeosq
            * (eta * (2.0 + 0.5 * etasq) + ecco * (0.5 + 2.0 * etasq)
                - gravity.j2 * tsi / (geo.ao * psisq)
                    * (-3.0 * geo.con41 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75
                            * x1mth2
                            * (2.0 * etasq - eeta * (1.0 + etasq))
                            * (2.0 * elements.arg_perigee).cos()));
        let cc5 =
            2.0 * coef1 * geo.ao * geo.omeosq * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        let cosio4 = geo.cosio2 * geo.cosio2;
        let temp1 = 1.5 * gravity.j2 * pinvsq * geo.no_unkozai;
        let temp2 = 0.5 * temp1 * gravity.j2 * pinvsq;
        let temp3 = -0.46875 * gravity.j4 * pinvsq * pinvsq * geo.no_unkozai;
        let mdot = geo.no_unkozai
            + 0.5 * temp1 * geo.rteosq * geo.con41
            + 0.0625 * temp2 * geo.rteosq * (13.0 - 78.0 * geo.cosio2 + 137.0 * cosio4);
        let argpdot = -0.5 * temp1 * geo.con42
            + 0.0625 * temp2 * (7.0 - 114.0 * geo.cosio2 + 395.0 * cosio4)
            + temp3 * (3.0 - 36.0 * geo.cosio2 + 49.0 * cosio4);
        let xhdot1 = -temp1 * geo.cosio;
        let nodedot = xhdot1
            + (0.5 * temp2 * (4.0 - 19.0 * geo.cosio2) + 2.0 * temp3 * (3.0 - 7.0 * geo.cosio2))
                * geo.cosio;
        let omgcof = elements.bstar * cc3 * elements.arg_perigee.cos();
        let xmcof = if ecco > 1.0e-4 {
            -X2O3 * coef * elements.bstar / eeta
        } else {
            0.0
        };
        let nodecf = 3.5 * geo.omeosq * xhdot1 * cc1;
        let xlcof = if (geo.cosio + 1.0).abs() > 1.5e-12 {
            -0.25 * gravity.j3oj2 * geo.sinio * (3.0 + 5.0 * geo.cosio) / (1.0 + geo.cosio)
        } else {
            -0.25 * gravity.j3oj2 * geo.sinio * (3.0 + 5.0 * geo.cosio) / TEMP4
        };
        let aycof = -0.5 * gravity.j3oj2 * geo.sinio;
        let delmotemp = 1.0 + eta * elements.mean_anomaly.cos();

        let mut drag = DragCoeffs {
            cc1,
            cc4,
            cc5,
            t2cof: 1.5 * cc1,
            omgcof,
            xmcof,
            eta,
            delmo: delmotemp * delmotemp * delmotemp,
            sinmao: elements.mean_anomaly.sin(),
            ..DragCoeffs::default()
        };

        if regime == Regime::Normal {
            let cc1sq = cc1 * cc1;
            drag.d2 = 4.0 * geo.ao * tsi * cc1sq;
            let temp = drag.d2 * tsi * cc1 / 3.0;
            drag.d3 = (17.0 * geo.ao + sfour) * temp;
            drag.d4 = 0.5 * temp * geo.ao * tsi * (221.0 * geo.ao + 31.0 * sfour) * cc1;
            drag.t3cof = drag.d2 + 2.0 * cc1sq;
            drag.t4cof = 0.25 * (3.0 * drag.d3 + cc1 * (12.0 * drag.d2 + 10.0 * cc1sq));
            drag.t5cof = 0.2
                * (3.0 * drag.d4
                    + 12.0 * cc1 * drag.d3
                    + 6.0 * drag.d2 * drag.d2
                    + 15.0 * cc1sq * (2.0 * drag.d2 + cc1sq));
        }

        let deep = if deep_space {
            let epoch_1950 = elements.epoch_jd - JD_1950;
            let ds = DeepSpace::new(&DeepSpaceContext {
                epoch_1950,
                eccentricity: ecco,
                inclination: inclo,
                raan: elements.raan,
                arg_perigee: elements.arg_perigee,
                mean_anomaly: elements.mean_anomaly,
                no_unkozai: geo.no_unkozai,
                mdot,
                nodedot,
                argpdot,
                gsto: gmst(elements.epoch_jd),
                xke: gravity.xke,
            });
            debug!(
                "catalog {} deep space: {}",
                elements.catalog_number,
                match ds.resonance() {
                    Resonance::None => "no resonance",
                    Resonance::Synchronous { .. } => "synchronous resonance",
                    Resonance::HalfDay { .. } => "half-day resonance",
                }
            );
            Some(ds)
        } else {
            None
        };

        Ok(Propagator {
            gravity,
            epoch_jd: elements.epoch_jd,
            bstar: elements.bstar,
            ecco,
            inclo,
            nodeo: elements.raan,
            argpo: elements.arg_perigee,
            mo: elements.mean_anomaly,
            no_unkozai: geo.no_unkozai,
            regime,
            rates: SecularRates {
                mdot,
                argpdot,
                nodedot,
                nodecf,
            },
            drag,
            con41: geo.con41,
            x1mth2,
            x7thm1: 7.0 * geo.cosio2 - 1.0,
            xlcof,
            aycof,
            deep,
        })
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Brouwer mean motion at epoch, rad/min.
    pub fn mean_motion(&self) -> f64 {
        self.no_unkozai
    }

    pub fn epoch_jd(&self) -> f64 {
        self.epoch_jd
    }

    /// Propagate to a UTC Julian Date.
    pub fn propagate_jd(&mut self, jd: f64) -> Result<StateVector, PropagationError> {
        self.propagate((jd - self.epoch_jd) * crate::constants::MINUTES_PER_DAY)
    }

    /// Propagate `tsince` minutes past the TLE epoch.
    pub fn propagate(&mut self, tsince: f64) -> Result<StateVector, PropagationError> {
        self.propagate_full(tsince).map(|(state, _)| state)
    }

    /// Propagate and also report the updated mean elements.
    pub fn propagate_full(
        &mut self,
        tsince: f64,
    ) -> Result<(StateVector, PropagatedElements), PropagationError> {
        let t = tsince;
        let t2 = t * t;

        // Secular updates from J2/J4 rates.
        let xmdf = self.mo + self.rates.mdot * t;
        let argpdf = self.argpo + self.rates.argpdot * t;
        let nodedf = self.nodeo + self.rates.nodedot * t;
        let mut argpm = argpdf;
        let mut mm = xmdf;
        let mut nodem = nodedf + self.rates.nodecf * t2;
        let mut tempa = 1.0 - self.drag.cc1 * t;
        let mut tempe = self.bstar * self.drag.cc4 * t;
        let mut templ = self.drag.t2cof * t2;

        // Full drag polynomials only in the Normal regime.
        if self.regime == Regime::Normal {
            let delomg = self.drag.omgcof * t;
            let delmtemp = 1.0 + self.drag.eta * xmdf.cos();
            let delm = self.drag.xmcof * (delmtemp * delmtemp * delmtemp - self.drag.delmo);
            let temp = delomg + delm;
            mm = xmdf + temp;
            argpm = argpdf - temp;
            let t3 = t2 * t;
            let t4 = t3 * t;
            tempa -= self.drag.d2 * t2 + self.drag.d3 * t3 + self.drag.d4 * t4;
            tempe += self.bstar * self.drag.cc5 * (mm.sin() - self.drag.sinmao);
            templ += self.drag.t3cof * t3 + t4 * (self.drag.t4cof + t * self.drag.t5cof);
        }

        let mut nm = self.no_unkozai;
        let mut em = self.ecco;
        let mut inclm = self.inclo;

        if let Some(deep) = self.deep.as_mut() {
            (em, inclm, nodem, argpm, mm, nm) = deep.secular(t, em, inclm, nodem, argpm, mm, nm);
        }

        if nm <= 0.0 {
            return Err(PropagationError::NonPositiveMeanMotion { mean_motion: nm });
        }

        let am = (self.gravity.xke / nm).powf(X2O3) * tempa * tempa;
        nm = self.gravity.xke / am.powf(1.5);
        em -= tempe;

        if em >= 1.0 || em < -0.001 {
            return Err(PropagationError::EccentricityOutOfRange { eccentricity: em });
        }
        // Standard SGP4 floor keeping the perturbation series finite.
        if em < 1.0e-6 {
            em = 1.0e-6;
        }

        mm += self.no_unkozai * templ;
        let mut xlm = mm + argpm + nodem;

        nodem = if nodem >= 0.0 {
            nodem % TWOPI
        } else {
            -((-nodem) % TWOPI)
        };
        argpm %= TWOPI;
        xlm %= TWOPI;
        mm = (xlm - argpm - nodem) % TWOPI;

        let elements = PropagatedElements {
            semi_major_axis_er: am,
            eccentricity: em,
            inclination: inclm,
            raan: nodem,
            arg_perigee: argpm,
            mean_anomaly: mm,
            mean_motion: nm,
        };

        // Lunisolar periodics perturb the elements that feed the Kepler
        // solution; near-Earth orbits use them untouched.
        let mut ep = em;
        let mut xincp = inclm;
        let mut nodep = nodem;
        let mut argpp = argpm;
        let mut mp = mm;

        let (sinip, cosip, aycof, xlcof, con41, x1mth2, x7thm1);
        if let Some(deep) = self.deep.as_ref() {
            (ep, xincp, nodep, argpp, mp) = deep.periodics(t, ep, xincp, nodep, argpp, mp);
            if xincp < 0.0 {
                xincp = -xincp;
                nodep += PI;
                argpp -= PI;
            }
            if !(0.0..=1.0).contains(&ep) {
                return Err(PropagationError::EccentricityOutOfRange { eccentricity: ep });
            }
            sinip = xincp.sin();
            cosip = xincp.cos();
            aycof = -0.5 * self.gravity.j3oj2 * sinip;
            xlcof = if (cosip + 1.0).abs() > 1.5e-12 {
                -0.25 * self.gravity.j3oj2 * sinip * (3.0 + 5.0 * cosip) / (1.0 + cosip)
            } else {
                -0.25 * self.gravity.j3oj2 * sinip * (3.0 + 5.0 * cosip) / TEMP4
            };
            let cosisq = cosip * cosip;
            con41 = 3.0 * cosisq - 1.0;
            x1mth2 = 1.0 - cosisq;
            x7thm1 = 7.0 * cosisq - 1.0;
        } else {
            sinip = xincp.sin();
            cosip = xincp.cos();
            aycof = self.aycof;
            xlcof = self.xlcof;
            con41 = self.con41;
            x1mth2 = self.x1mth2;
            x7thm1 = self.x7thm1;
        }

        // Long-period periodics and the modified Kepler equation.
        let axnl = ep * argpp.cos();
        let temp = 1.0 / (am * (1.0 - ep * ep));
        let aynl = ep * argpp.sin() + temp * aycof;
        let xl = mp + argpp + nodep + temp * xlcof * axnl;

        let u = (xl - nodep) % TWOPI;
        let mut eo1 = u;
        let mut tem5: f64 = 9999.9;
        let mut ktr = 1;
        while tem5.abs() >= 1.0e-12 && ktr <= 10 {
            let sineo1 = eo1.sin();
            let coseo1 = eo1.cos();
            tem5 = 1.0 - coseo1 * axnl - sineo1 * aynl;
            tem5 = (u - aynl * coseo1 + axnl * sineo1 - eo1) / tem5;
            if tem5.abs() >= 0.95 {
                tem5 = if tem5 > 0.0 { 0.95 } else { -0.95 };
            }
            eo1 += tem5;
            ktr += 1;
        }
        if tem5.abs() >= 1.0e-12 {
            return Err(PropagationError::ConvergenceFailure {
                residual: tem5.abs(),
            });
        }

        // Short-period corrections.
        let sineo1 = eo1.sin();
        let coseo1 = eo1.cos();
        let ecose = axnl * coseo1 + aynl * sineo1;
        let esine = axnl * sineo1 - aynl * coseo1;
        let el2 = axnl * axnl + aynl * aynl;
        let pl = am * (1.0 - el2);
        if pl < 0.0 {
            return Err(PropagationError::NegativeSemiLatusRectum { semi_latus: pl });
        }

        let rl = am * (1.0 - ecose);
        let rdotl = am.sqrt() * esine / rl;
        let rvdotl = pl.sqrt() / rl;
        let betal = (1.0 - el2).sqrt();
        let temp = esine / (1.0 + betal);
        let sinu = am / rl * (sineo1 - aynl - axnl * temp);
        let cosu = am / rl * (coseo1 - axnl + aynl * temp);
        let mut su = sinu.atan2(cosu);
        let sin2u = (cosu + cosu) * sinu;
        let cos2u = 1.0 - 2.0 * sinu * sinu;
        let temp = 1.0 / pl;
        let temp1 = 0.5 * self.gravity.j2 * temp;
        let temp2 = temp1 * temp;

        let mrt = rl * (1.0 - 1.5 * temp2 * betal * con41) + 0.5 * temp1 * x1mth2 * cos2u;
        if mrt < 1.0 {
            return Err(PropagationError::SatelliteDecayed { radius_er: mrt });
        }
        su -= 0.25 * temp2 * x7thm1 * sin2u;
        let xnode = nodep + 1.5 * temp2 * cosip * sin2u;
        let xinc = xincp + 1.5 * temp2 * cosip * sinip * cos2u;
        let mvt = rdotl - nm * temp1 * x1mth2 * sin2u / self.gravity.xke;
        let rvdot = rvdotl + nm * temp1 * (x1mth2 * cos2u + 1.5 * con41) / self.gravity.xke;

        // Orientation unit vectors and unit conversion to SI.
        let (sinsu, cossu) = su.sin_cos();
        let (snod, cnod) = xnode.sin_cos();
        let (sini, cosi) = xinc.sin_cos();
        let xmx = -snod * cosi;
        let xmy = cnod * cosi;
        let ux = xmx * sinsu + cnod * cossu;
        let uy = xmy * sinsu + snod * cossu;
        let uz = sini * sinsu;
        let vx = xmx * cossu - cnod * sinsu;
        let vy = xmy * cossu - snod * sinsu;
        let vz = sini * cossu;

        let r_m = mrt * self.gravity.radius_earth_km * 1000.0;
        let v_mps = self.gravity.radius_earth_km * self.gravity.xke / 60.0 * 1000.0;

        let state = StateVector {
            position_m: [r_m * ux, r_m * uy, r_m * uz],
            velocity_mps: [
                (mvt * ux + rvdot * vx) * v_mps,
                (mvt * uy + rvdot * vy) * v_mps,
                (mvt * uz + rvdot * vz) * v_mps,
            ],
            frame: Frame::TemeOfDate,
        };

        Ok((state, elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tle::{parse_record, ChecksumPolicy};
    use approx::assert_abs_diff_eq;

    const L1: &str = "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    const L2: &str = "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

    fn satellite_00005() -> Propagator {
        let el = parse_record(None, L1, L2, ChecksumPolicy::Strict).unwrap();
        Propagator::new(&el, GravityModel::Wgs72).unwrap()
    }

    #[test]
    fn verification_satellite_position_matches_reference() {
        // Vallado verification output at tsince = 309.67110720001529 min.
        let mut prop = satellite_00005();
        let state = prop.propagate(309.67110720001529).unwrap();
        assert_abs_diff_eq!(state.position_m[0], -3_754_251.4743216166, epsilon = 1e-3);
        assert_abs_diff_eq!(state.position_m[1], 7_876_346.817439062, epsilon = 1e-3);
        assert_abs_diff_eq!(state.position_m[2], 4_719_220.856478582, epsilon = 1e-3);
        assert_eq!(state.frame, Frame::TemeOfDate);
    }

    #[test]
    fn gravity_model_changes_position_slightly() {
        let el = parse_record(None, L1, L2, ChecksumPolicy::Strict).unwrap();
        let mut w72 = Propagator::new(&el, GravityModel::Wgs72).unwrap();
        let mut w84 = Propagator::new(&el, GravityModel::Wgs84).unwrap();
        let t = 309.67110720001529;
        let r72 = w72.propagate(t).unwrap().position_m;
        let r84 = w84.propagate(t).unwrap().position_m;
        assert_abs_diff_eq!(r84[0], -3_754_243.7675772426, epsilon = 1e-3);
        let delta = (r72[0] - r84[0]).abs();
        assert!(delta > 1.0 && delta < 100.0);
    }

    #[test]
    fn regime_classification() {
        let prop = satellite_00005();
        assert_eq!(prop.regime(), Regime::Normal);
        // 133-minute period stays near-Earth.
        assert!(TWOPI / prop.mean_motion() < 225.0);
    }

    #[test]
    fn kozai_recovery_shrinks_mean_motion() {
        let el = parse_record(None, L1, L2, ChecksumPolicy::Strict).unwrap();
        let prop = Propagator::new(&el, GravityModel::Wgs72).unwrap();
        // For a prograde 34-degree orbit, the Brouwer value sits just
        // below the Kozai value.
        assert!(prop.mean_motion() < el.mean_motion);
        assert!((prop.mean_motion() - el.mean_motion).abs() / el.mean_motion < 1e-3);
    }

    #[test]
    fn determinism_across_fresh_instances() {
        let mut a = satellite_00005();
        let mut b = satellite_00005();
        for t in [0.0, 12.5, 360.0, 1440.0, -720.0] {
            let ra = a.propagate(t).unwrap();
            let rb = b.propagate(t).unwrap();
            assert_eq!(ra.position_m, rb.position_m);
            assert_eq!(ra.velocity_mps, rb.velocity_mps);
        }
    }

    #[test]
    fn perigee_inside_earth_rejected() {
        let el = parse_record(None, L1, L2, ChecksumPolicy::Strict).unwrap();
        let mut low = el.clone();
        // Mean motion of 17.5 rev/day with e = 0.186 puts perigee underground.
        low.mean_motion = 17.5 / (1440.0 / TWOPI);
        match Propagator::new(&low, GravityModel::Wgs72) {
            Err(PropagationError::PerigeeInsideEarth { perigee_km }) => {
                assert!(perigee_km < 0.0);
            }
            other => panic!("expected perigee error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_eccentricity_rejected_at_init() {
        let el = parse_record(None, L1, L2, ChecksumPolicy::Strict).unwrap();
        let mut bad = el.clone();
        bad.eccentricity = 1.2;
        assert!(matches!(
            Propagator::new(&bad, GravityModel::Wgs72),
            Err(PropagationError::EccentricityOutOfRange { .. })
        ));
    }

    #[test]
    fn propagated_elements_expose_mean_state() {
        let mut prop = satellite_00005();
        let (_, el) = prop.propagate_full(0.0).unwrap();
        assert_abs_diff_eq!(el.eccentricity, 0.1859667, epsilon = 1e-4);
        assert_abs_diff_eq!(el.inclination, 34.2682_f64.to_radians(), epsilon = 1e-6);
        assert!(el.semi_major_axis_er > 1.0);
    }
}
