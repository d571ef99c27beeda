//! SDP4 deep-space extension: lunisolar secular and periodic perturbations
//! plus the 12-hour and 24-hour resonance integrator.
//!
//! Activated by the propagator when the orbital period reaches 225 minutes.
//! Everything here is fixed at initialization except [`ResonanceState`],
//! which the integrator advances in +-720 minute steps.

use std::f64::consts::PI;

use crate::constants::{wrap_to_2pi, TWOPI};

/// Solar mean motion, rad/min.
const ZNS: f64 = 1.19459e-5;
/// Lunar mean motion, rad/min.
const ZNL: f64 = 1.5835218e-4;
/// Solar orbit eccentricity.
const ZES: f64 = 0.01675;
/// Lunar orbit eccentricity.
const ZEL: f64 = 0.05490;

/// Solar perturbation amplitude.
const C1SS: f64 = 2.9864797e-6;
/// Lunar perturbation amplitude.
const C1L: f64 = 4.7968065e-7;

/// Earth rotation rate, rad/min of sidereal phase.
const RPTIM: f64 = 4.375_269_088_011_299_66e-3;

/// Resonance integrator step, minutes.
const STEP: f64 = 720.0;
const STEP2: f64 = STEP * STEP / 2.0;

/// Sine-of-obliquity and friends for the solar geometry.
const ZSINIS: f64 = 0.39785416;
const ZCOSIS: f64 = 0.91744867;
const ZCOSGS: f64 = 0.1945905;
const ZSINGS: f64 = -0.98088458;

// Tesseral resonance amplitudes and phase constants.
const Q22: f64 = 1.7891679e-6;
const Q31: f64 = 2.1460748e-6;
const Q33: f64 = 2.2123015e-7;
const ROOT22: f64 = 1.7891679e-6;
const ROOT32: f64 = 3.7393792e-7;
const ROOT44: f64 = 7.3636953e-9;
const ROOT52: f64 = 1.1428639e-7;
const ROOT54: f64 = 2.1765803e-9;
const FASX2: f64 = 0.13130908;
const FASX4: f64 = 2.8843198;
const FASX6: f64 = 0.37448087;
const G22: f64 = 5.7686396;
const G32: f64 = 0.95240898;
const G44: f64 = 1.8014998;
const G52: f64 = 1.0508330;
const G54: f64 = 4.4108898;

/// Long-period periodic coefficients for one perturbing body, built from
/// the shared geometric template in [`body_terms`].
#[derive(Debug, Clone, Copy, Default)]
struct BodyPeriodics {
    e2: f64,
    e3: f64,
    i2: f64,
    i3: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    gh2: f64,
    gh3: f64,
    gh4: f64,
    h2: f64,
    h3: f64,
}

/// Intermediate S/Z products of the geometric template, consumed by both
/// the periodic coefficients and the secular rates.
#[derive(Debug, Clone, Copy, Default)]
struct BodyTerms {
    s1: f64,
    s2: f64,
    s3: f64,
    s4: f64,
    s5: f64,
    z1: f64,
    z2: f64,
    z3: f64,
    z11: f64,
    z13: f64,
    z21: f64,
    z23: f64,
    z31: f64,
    z33: f64,
    periodics: BodyPeriodics,
}

/// Orientation of a perturbing body relative to the satellite orbit.
struct BodyGeometry {
    zcosg: f64,
    zsing: f64,
    zcosi: f64,
    zsini: f64,
    zcosh: f64,
    zsinh: f64,
    /// Perturbation amplitude (C1SS for the Sun, C1L for the Moon).
    cc: f64,
    /// Body orbit eccentricity (ZES / ZEL).
    ze: f64,
}

/// Which gravitational resonance band the orbit sits in, with the
/// precomputed tesseral torque coefficients.
#[derive(Debug, Clone, Copy)]
pub enum Resonance {
    None,
    /// 24-hour geosynchronous band.
    Synchronous { del1: f64, del2: f64, del3: f64 },
    /// 12-hour Molniya band.
    HalfDay {
        d2201: f64,
        d2211: f64,
        d3210: f64,
        d3222: f64,
        d4410: f64,
        d4422: f64,
        d5220: f64,
        d5232: f64,
        d5421: f64,
        d5433: f64,
    },
}

/// Mutable integrator state: integrated time, mean-longitude and
/// mean-motion accumulators. After any call the sign of `atime` matches the
/// sign of the most recent request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonanceState {
    pub atime: f64,
    pub xli: f64,
    pub xni: f64,
}

/// Everything the deep-space model needs from the near-Earth initializer.
pub(crate) struct DeepSpaceContext {
    /// TLE epoch, days since 1950 Jan 0.0 UT.
    pub epoch_1950: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub raan: f64,
    pub arg_perigee: f64,
    pub mean_anomaly: f64,
    /// Brouwer (un-Kozai'd) mean motion, rad/min.
    pub no_unkozai: f64,
    pub mdot: f64,
    pub nodedot: f64,
    pub argpdot: f64,
    pub gsto: f64,
    pub xke: f64,
}

/// The deep-space perturbation model for one satellite.
#[derive(Debug, Clone)]
pub struct DeepSpace {
    solar: BodyPeriodics,
    lunar: BodyPeriodics,
    /// Solar and lunar mean-anomaly phases at epoch.
    zmos: f64,
    zmol: f64,
    // Lunisolar secular rates.
    dedt: f64,
    didt: f64,
    dmdt: f64,
    domdt: f64,
    dnodt: f64,
    resonance: Resonance,
    /// Drift offsets for the resonance integrator.
    xlamo: f64,
    xfact: f64,
    gsto: f64,
    no_unkozai: f64,
    arg_perigee0: f64,
    argpdot: f64,
    state: ResonanceState,
}

/// Evaluate the lunisolar geometric template for one body.
fn body_terms(
    geom: &BodyGeometry,
    em: f64,
    emsq: f64,
    betasq: f64,
    rtemsq: f64,
    sinomm: f64,
    cosomm: f64,
    sinim: f64,
    cosim: f64,
    xnoi: f64,
) -> BodyTerms {
    let a1 = geom.zcosg * geom.zcosh + geom.zsing * geom.zcosi * geom.zsinh;
    let a3 = -geom.zsing * geom.zcosh + geom.zcosg * geom.zcosi * geom.zsinh;
    let a7 = -geom.zcosg * geom.zsinh + geom.zsing * geom.zcosi * geom.zcosh;
    let a8 = geom.zsing * geom.zsini;
    let a9 = geom.zsing * geom.zsinh + geom.zcosg * geom.zcosi * geom.zcosh;
    let a10 = geom.zcosg * geom.zsini;
    let a2 = cosim * a7 + sinim * a8;
    let a4 = cosim * a9 + sinim * a10;
    let a5 = -sinim * a7 + cosim * a8;
    let a6 = -sinim * a9 + cosim * a10;

    let x1 = a1 * cosomm + a2 * sinomm;
    let x2 = a3 * cosomm + a4 * sinomm;
    let x3 = -a1 * sinomm + a2 * cosomm;
    let x4 = -a3 * sinomm + a4 * cosomm;
    let x5 = a5 * sinomm;
    let x6 = a6 * sinomm;
    let x7 = a5 * cosomm;
    let x8 = a6 * cosomm;

    let z31 = 12.0 * x1 * x1 - 3.0 * x3 * x3;
    let z32 = 24.0 * x1 * x2 - 6.0 * x3 * x4;
    let z33 = 12.0 * x2 * x2 - 3.0 * x4 * x4;
    let mut z1 = 3.0 * (a1 * a1 + a2 * a2) + z31 * emsq;
    let mut z2 = 6.0 * (a1 * a3 + a2 * a4) + z32 * emsq;
    let mut z3 = 3.0 * (a3 * a3 + a4 * a4) + z33 * emsq;
    let z11 = -6.0 * a1 * a5 + emsq * (-24.0 * x1 * x7 - 6.0 * x3 * x5);
    let z12 = -6.0 * (a1 * a6 + a3 * a5)
        + emsq * (-24.0 * (x2 * x7 + x1 * x8) - 6.0 * (x3 * x6 + x4 * x5));
    let z13 = -6.0 * a3 * a6 + emsq * (-24.0 * x2 * x8 - 6.0 * x4 * x6);
    let z21 = 6.0 * a2 * a5 + emsq * (24.0 * x1 * x5 - 6.0 * x3 * x7);
    let z22 = 6.0 * (a4 * a5 + a2 * a6)
        + emsq * (24.0 * (x2 * x5 + x1 * x6) - 6.0 * (x4 * x7 + x3 * x8));
    let z23 = 6.0 * a4 * a6 + emsq * (24.0 * x2 * x6 - 6.0 * x4 * x8);
    z1 = z1 + z1 + betasq * z31;
    z2 = z2 + z2 + betasq * z32;
    z3 = z3 + z3 + betasq * z33;

    let s3 = geom.cc * xnoi;
    let s2 = -0.5 * s3 / rtemsq;
    let s4 = s3 * rtemsq;
    let s1 = -15.0 * em * s4;
    let s5 = x1 * x3 + x2 * x4;
    let s6 = x2 * x3 + x1 * x4;
    let s7 = x2 * x4 - x1 * x3;

    let periodics = BodyPeriodics {
        e2: 2.0 * s1 * s6,
        e3: 2.0 * s1 * s7,
        i2: 2.0 * s2 * z12,
        i3: 2.0 * s2 * (z13 - z11),
        l2: -2.0 * s3 * z2,
        l3: -2.0 * s3 * (z3 - z1),
        l4: -2.0 * s3 * (-21.0 - 9.0 * emsq) * geom.ze,
        gh2: 2.0 * s4 * z32,
        gh3: 2.0 * s4 * (z33 - z31),
        gh4: -18.0 * s4 * geom.ze,
        h2: -2.0 * s2 * z22,
        h3: -2.0 * s2 * (z23 - z21),
    };

    BodyTerms {
        s1,
        s2,
        s3,
        s4,
        s5,
        z1,
        z2,
        z3,
        z11,
        z13,
        z21,
        z23,
        z31,
        z33,
        periodics,
    }
}

impl DeepSpace {
    pub(crate) fn new(ctx: &DeepSpaceContext) -> Self {
        let em = ctx.eccentricity;
        let emsq = em * em;
        let betasq = 1.0 - emsq;
        let rtemsq = betasq.sqrt();
        let (snodm, cnodm) = ctx.raan.sin_cos();
        let (sinomm, cosomm) = ctx.arg_perigee.sin_cos();
        let (sinim, cosim) = ctx.inclination.sin_cos();
        let nm = ctx.no_unkozai;
        let xnoi = 1.0 / nm;

        // Lunar node and perigee geometry from days since 1950 Jan 0.5.
        let day = ctx.epoch_1950 + 18_261.5;
        let xnodce = (4.5236020 - 9.2422029e-4 * day) % TWOPI;
        let (stem, ctem) = xnodce.sin_cos();
        let zcosil = 0.91375164 - 0.03568096 * ctem;
        let zsinil = (1.0 - zcosil * zcosil).sqrt();
        let zsinhl = 0.089683511 * stem / zsinil;
        let zcoshl = (1.0 - zsinhl * zsinhl).sqrt();
        let gam = 5.8351514 + 0.0019443680 * day;
        let mut zx = 0.39785416 * stem / zsinil;
        let zy = zcoshl * ctem + 0.91744867 * zsinhl * stem;
        zx = zx.atan2(zy);
        zx = gam + zx - xnodce;

        let sun = BodyGeometry {
            zcosg: ZCOSGS,
            zsing: ZSINGS,
            zcosi: ZCOSIS,
            zsini: ZSINIS,
            zcosh: cnodm,
            zsinh: snodm,
            cc: C1SS,
            ze: ZES,
        };
        let moon = BodyGeometry {
            zcosg: zx.cos(),
            zsing: zx.sin(),
            zcosi: zcosil,
            zsini: zsinil,
            zcosh: zcoshl * cnodm + zsinhl * snodm,
            zsinh: snodm * zcoshl - cnodm * zsinhl,
            cc: C1L,
            ze: ZEL,
        };

        let sun = body_terms(&sun, em, emsq, betasq, rtemsq, sinomm, cosomm, sinim, cosim, xnoi);
        let moon = body_terms(&moon, em, emsq, betasq, rtemsq, sinomm, cosomm, sinim, cosim, xnoi);

        let zmol = wrap_to_2pi(4.7199672 + 0.22997150 * day - gam);
        let zmos = wrap_to_2pi(6.2565837 + 0.017201977 * day);

        // Secular rates, solar plus lunar, same template per body.
        let near_equatorial =
            ctx.inclination < 5.2359877e-2 || ctx.inclination > PI - 5.2359877e-2;
        let rate_pair = |body: &BodyTerms, zn: f64| {
            let e_dot = zn * body.s1 * body.s5;
            let i_dot = zn * body.s2 * (body.z11 + body.z13);
            let m_dot = -zn * body.s3 * (body.z1 + body.z3 - 14.0 - 6.0 * emsq);
            let gh_dot = zn * body.s4 * (body.z31 + body.z33 - 6.0);
            let h_dot = if near_equatorial {
                0.0
            } else {
                -zn * body.s2 * (body.z21 + body.z23)
            };
            (e_dot, i_dot, m_dot, gh_dot, h_dot)
        };
        let (ses, sis, sms, sghs, shs) = rate_pair(&sun, ZNS);
        let (sel, sil, sml, sghl, shl) = rate_pair(&moon, ZNL);

        let dedt = ses + sel;
        let didt = sis + sil;
        let dmdt = sms + sml;
        let mut domdt = sghs + sghl;
        let mut dnodt = 0.0;
        if sinim != 0.0 {
            domdt -= cosim / sinim * (shs + shl);
            dnodt = (shs + shl) / sinim;
        }

        // Resonance classification and torque coefficients.
        let x2o3 = 2.0 / 3.0;
        let theta = (ctx.gsto) % TWOPI;
        let mut resonance = Resonance::None;
        let mut xlamo = 0.0;
        let mut xfact = 0.0;
        let synchronous = nm > 0.0034906585 && nm < 0.0052359877;
        let half_day = (8.26e-3..=9.24e-3).contains(&nm) && em >= 0.5;

        if half_day {
            let aonv = (nm / ctx.xke).powf(x2o3);
            let cosisq = cosim * cosim;
            let eoc = em * emsq;
            let g201 = -0.306 - (em - 0.64) * 0.440;

            let (g211, g310, g322, g410, g422, g520);
            if em <= 0.65 {
                g211 = 3.616 - 13.2470 * em + 16.2900 * emsq;
                g310 = -19.302 + 117.3900 * em - 228.4190 * emsq + 156.5910 * eoc;
                g322 = -18.9068 + 109.7927 * em - 214.6334 * emsq + 146.5816 * eoc;
                g410 = -41.122 + 242.6940 * em - 471.0940 * emsq + 313.9530 * eoc;
                g422 = -146.407 + 841.8800 * em - 1629.014 * emsq + 1083.4350 * eoc;
                g520 = -532.114 + 3017.977 * em - 5740.032 * emsq + 3708.2760 * eoc;
            } else {
                g211 = -72.099 + 331.819 * em - 508.738 * emsq + 266.724 * eoc;
                g310 = -346.844 + 1582.851 * em - 2415.925 * emsq + 1246.113 * eoc;
                g322 = -342.585 + 1554.908 * em - 2366.899 * emsq + 1215.972 * eoc;
                g410 = -1052.797 + 4758.686 * em - 7193.992 * emsq + 3651.957 * eoc;
                g422 = -3581.690 + 16178.110 * em - 24462.770 * emsq + 12422.520 * eoc;
                if em > 0.715 {
                    g520 = -5149.66 + 29936.92 * em - 54087.36 * emsq + 31324.56 * eoc;
                } else {
                    g520 = 1464.74 - 4664.75 * em + 3763.64 * emsq;
                }
            }
            let (g533, g521, g532);
            if em < 0.7 {
                g533 = -919.22770 + 4988.61 * em - 9064.77 * emsq + 5542.21 * eoc;
                g521 = -822.71072 + 4568.6173 * em - 8491.4146 * emsq + 5337.524 * eoc;
                g532 = -853.66600 + 4690.25 * em - 8624.77 * emsq + 5341.4 * eoc;
            } else {
                g533 = -37995.78 + 161616.52 * em - 229838.2 * emsq + 109377.94 * eoc;
                g521 = -51752.104 + 218913.95 * em - 309468.16 * emsq + 146349.42 * eoc;
                g532 = -40023.88 + 170470.89 * em - 242699.48 * emsq + 115605.82 * eoc;
            }

            let sini2 = sinim * sinim;
            let f220 = 0.75 * (1.0 + 2.0 * cosim + cosisq);
            let f221 = 1.5 * sini2;
            let f321 = 1.875 * sinim * (1.0 - 2.0 * cosim - 3.0 * cosisq);
            let f322 = -1.875 * sinim * (1.0 + 2.0 * cosim - 3.0 * cosisq);
            let f441 = 35.0 * sini2 * f220;
            let f442 = 39.375 * sini2 * sini2;
            let f522 = 9.84375
                * sinim
                * (sini2 * (1.0 - 2.0 * cosim - 5.0 * cosisq)
                    + 1.0 / 3.0 * (-2.0 + 4.0 * cosim + 6.0 * cosisq));
            let f523 = sinim
                * (4.92187512 * sini2 * (-2.0 - 4.0 * cosim + 10.0 * cosisq)
                    + 6.56250012 * (1.0 + 2.0 * cosim - 3.0 * cosisq));
            let f542 = 29.53125
                * sinim
                * (2.0 - 8.0 * cosim + cosisq * (-12.0 + 8.0 * cosim + 10.0 * cosisq));
            let f543 = 29.53125
                * sinim
                * (-2.0 - 8.0 * cosim + cosisq * (12.0 + 8.0 * cosim - 10.0 * cosisq));

            let xno2 = nm * nm;
            let ainv2 = aonv * aonv;
            let mut temp1 = 3.0 * xno2 * ainv2;
            let mut temp = temp1 * ROOT22;
            let d2201 = temp * f220 * g201;
            let d2211 = temp * f221 * g211;
            temp1 *= aonv;
            temp = temp1 * ROOT32;
            let d3210 = temp * f321 * g310;
            let d3222 = temp * f322 * g322;
            temp1 *= aonv;
            temp = 2.0 * temp1 * ROOT44;
            let d4410 = temp * f441 * g410;
            let d4422 = temp * f442 * g422;
            temp1 *= aonv;
            temp = temp1 * ROOT52;
            let d5220 = temp * f522 * g520;
            let d5232 = temp * f523 * g532;
            temp = 2.0 * temp1 * ROOT54;
            let d5421 = temp * f542 * g521;
            let d5433 = temp * f543 * g533;

            resonance = Resonance::HalfDay {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            };
            xlamo = (ctx.mean_anomaly + 2.0 * ctx.raan - 2.0 * theta) % TWOPI;
            xfact = ctx.mdot + dmdt + 2.0 * (ctx.nodedot + dnodt - RPTIM) - nm;
        } else if synchronous {
            let aonv = (nm / ctx.xke).powf(x2o3);
            let g200 = 1.0 + emsq * (-2.5 + 0.8125 * emsq);
            let g310 = 1.0 + 2.0 * emsq;
            let g300 = 1.0 + emsq * (-6.0 + 6.60937 * emsq);
            let f220 = 0.75 * (1.0 + cosim) * (1.0 + cosim);
            let f311 = 0.9375 * sinim * sinim * (1.0 + 3.0 * cosim) - 0.75 * (1.0 + cosim);
            let mut f330 = 1.0 + cosim;
            f330 = 1.875 * f330 * f330 * f330;
            let del1 = 3.0 * nm * nm * aonv * aonv;
            let del2 = 2.0 * del1 * f220 * g200 * Q22;
            let del3 = 3.0 * del1 * f330 * g300 * Q33 * aonv;
            let del1 = del1 * f311 * g310 * Q31 * aonv;
            resonance = Resonance::Synchronous { del1, del2, del3 };
            xlamo = (ctx.mean_anomaly + ctx.raan + ctx.arg_perigee - theta) % TWOPI;
            xfact = ctx.mdot + (ctx.argpdot + ctx.nodedot) - RPTIM + dmdt + domdt + dnodt - nm;
        }

        DeepSpace {
            solar: sun.periodics,
            lunar: moon.periodics,
            zmos,
            zmol,
            dedt,
            didt,
            dmdt,
            domdt,
            dnodt,
            resonance,
            xlamo,
            xfact,
            gsto: ctx.gsto,
            no_unkozai: nm,
            arg_perigee0: ctx.arg_perigee,
            argpdot: ctx.argpdot,
            state: ResonanceState {
                atime: 0.0,
                xli: xlamo,
                xni: nm,
            },
        }
    }

    pub fn resonance(&self) -> Resonance {
        self.resonance
    }

    pub fn state(&self) -> ResonanceState {
        self.state
    }

    /// Tesseral torque derivatives at the current accumulator values:
    /// (mean-motion rate, longitude rate, mean-motion second rate).
    fn torque(&self, xli: f64, xni: f64, atime: f64) -> (f64, f64, f64) {
        match self.resonance {
            Resonance::Synchronous { del1, del2, del3 } => {
                let xndt = del1 * (xli - FASX2).sin()
                    + del2 * (2.0 * (xli - FASX4)).sin()
                    + del3 * (3.0 * (xli - FASX6)).sin();
                let xldot = xni + self.xfact;
                let xnddt = (del1 * (xli - FASX2).cos()
                    + 2.0 * del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * del3 * (3.0 * (xli - FASX6)).cos())
                    * xldot;
                (xndt, xldot, xnddt)
            }
            Resonance::HalfDay {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            } => {
                let xomi = self.arg_perigee0 + self.argpdot * atime;
                let x2omi = xomi + xomi;
                let x2li = xli + xli;
                let xndt = d2201 * (x2omi + xli - G22).sin()
                    + d2211 * (xli - G22).sin()
                    + d3210 * (xomi + xli - G32).sin()
                    + d3222 * (-xomi + xli - G32).sin()
                    + d4410 * (x2omi + x2li - G44).sin()
                    + d4422 * (x2li - G44).sin()
                    + d5220 * (xomi + xli - G52).sin()
                    + d5232 * (-xomi + xli - G52).sin()
                    + d5421 * (xomi + x2li - G54).sin()
                    + d5433 * (-xomi + x2li - G54).sin();
                let xldot = xni + self.xfact;
                let xnddt = (d2201 * (x2omi + xli - G22).cos()
                    + d2211 * (xli - G22).cos()
                    + d3210 * (xomi + xli - G32).cos()
                    + d3222 * (-xomi + xli - G32).cos()
                    + d5220 * (xomi + xli - G52).cos()
                    + d5232 * (-xomi + xli - G52).cos()
                    + 2.0
                        * (d4410 * (x2omi + x2li - G44).cos()
                            + d4422 * (x2li - G44).cos()
                            + d5421 * (xomi + x2li - G54).cos()
                            + d5433 * (-xomi + x2li - G54).cos()))
                    * xldot;
                (xndt, xldot, xnddt)
            }
            Resonance::None => (0.0, 0.0, 0.0),
        }
    }

    /// Advance the resonance accumulators to time `t` (minutes from epoch)
    /// and evaluate the final fractional step. Returns (xl, nm).
    ///
    /// The state resets to the epoch values whenever the request is on the
    /// other side of zero, or closer to zero than the cached time: the
    /// integration only ever marches away from the epoch.
    fn integrate(&mut self, t: f64) -> (f64, f64) {
        let s = &mut self.state;
        if s.atime == 0.0 || t * s.atime <= 0.0 || t.abs() < s.atime.abs() {
            s.atime = 0.0;
            s.xni = self.no_unkozai;
            s.xli = self.xlamo;
        }
        let delt = if t > 0.0 { STEP } else { -STEP };

        loop {
            let (xndt, xldot, xnddt) = self.torque(self.state.xli, self.state.xni, self.state.atime);
            if (t - self.state.atime).abs() < STEP {
                let ft = t - self.state.atime;
                let nm = self.state.xni + xndt * ft + xnddt * ft * ft * 0.5;
                let xl = self.state.xli + xldot * ft + xndt * ft * ft * 0.5;
                return (xl, nm);
            }
            let s = &mut self.state;
            s.xli += xldot * delt + xndt * STEP2;
            s.xni += xndt * delt + xnddt * STEP2;
            s.atime += delt;
        }
    }

    /// Apply the lunisolar secular rates and, in a resonance band, overwrite
    /// the mean anomaly and mean motion from the integrated accumulators.
    ///
    /// Input and output element order: (e, i, raan, argp, M, n).
    #[allow(clippy::too_many_arguments)]
    pub fn secular(
        &mut self,
        t: f64,
        em: f64,
        inclm: f64,
        nodem: f64,
        argpm: f64,
        mm: f64,
        nm: f64,
    ) -> (f64, f64, f64, f64, f64, f64) {
        let theta = (self.gsto + t * RPTIM) % TWOPI;
        let em = em + self.dedt * t;
        let inclm = inclm + self.didt * t;
        let argpm = argpm + self.domdt * t;
        let nodem = nodem + self.dnodt * t;
        let mut mm = mm + self.dmdt * t;
        let mut nm = nm;

        if !matches!(self.resonance, Resonance::None) {
            let (xl, nm_integrated) = self.integrate(t);
            mm = match self.resonance {
                Resonance::Synchronous { .. } => xl - nodem - argpm + theta,
                _ => xl - 2.0 * nodem + 2.0 * theta,
            };
            let dndt = nm_integrated - self.no_unkozai;
            nm = self.no_unkozai + dndt;
        }

        (em, inclm, nodem, argpm, mm, nm)
    }

    /// Lunisolar periodic (Lyddane) corrections at time `t`.
    ///
    /// Input and output element order: (e, i, raan, argp, M). Below 0.2 rad
    /// of inclination the node/perigee corrections are applied through the
    /// (sin i sin O, sin i cos O) plane to dodge the 1/sin i singularity.
    pub fn periodics(
        &self,
        t: f64,
        ep: f64,
        inclp: f64,
        nodep: f64,
        argpp: f64,
        mp: f64,
    ) -> (f64, f64, f64, f64, f64) {
        let body_corrections = |coeffs: &BodyPeriodics, phase: f64, zn_e: f64| {
            let zm = phase;
            let zf = zm + 2.0 * zn_e * zm.sin();
            let sinzf = zf.sin();
            let f2 = 0.5 * sinzf * sinzf - 0.25;
            let f3 = -0.5 * sinzf * zf.cos();
            (
                coeffs.e2 * f2 + coeffs.e3 * f3,
                coeffs.i2 * f2 + coeffs.i3 * f3,
                coeffs.l2 * f2 + coeffs.l3 * f3 + coeffs.l4 * sinzf,
                coeffs.gh2 * f2 + coeffs.gh3 * f3 + coeffs.gh4 * sinzf,
                coeffs.h2 * f2 + coeffs.h3 * f3,
            )
        };

        let (ses, sis, sls, sghs, shs) =
            body_corrections(&self.solar, self.zmos + ZNS * t, ZES);
        let (sel, sil, sll, sghl, shl) =
            body_corrections(&self.lunar, self.zmol + ZNL * t, ZEL);

        let pe = ses + sel;
        let pinc = sis + sil;
        let pl = sls + sll;
        let pgh = sghs + sghl;
        let ph = shs + shl;

        let inclp = inclp + pinc;
        let ep = ep + pe;
        let (sinip, cosip) = inclp.sin_cos();

        if inclp >= 0.2 {
            let ph = ph / sinip;
            let pgh = pgh - cosip * ph;
            (ep, inclp, nodep + ph, argpp + pgh, mp + pl)
        } else {
            // Lyddane modification: rotate the small deviations in the
            // (sin i sin O, sin i cos O) plane instead of dividing by sin i.
            let (sinop, cosop) = nodep.sin_cos();
            let mut alfdp = sinip * sinop;
            let mut betdp = sinip * cosop;
            alfdp += ph * cosop + pinc * cosip * sinop;
            betdp += -ph * sinop + pinc * cosip * cosop;

            let nodep = if nodep >= 0.0 {
                nodep % TWOPI
            } else {
                -((-nodep) % TWOPI)
            };

            let xls = mp + argpp + pl + pgh + (cosip - pinc * sinip) * nodep;
            let xnoh = nodep;
            let mut nodep = alfdp.atan2(betdp);
            if (xnoh - nodep).abs() > PI {
                if nodep < xnoh {
                    nodep += TWOPI;
                } else {
                    nodep -= TWOPI;
                }
            }
            let mp = mp + pl;
            let argpp = xls - mp - cosip * nodep;
            (ep, inclp, nodep, argpp, mp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn molniya_context() -> DeepSpaceContext {
        // e = 0.74, i = 63.4 deg, 718-minute period.
        let nm = TWOPI / 718.0;
        DeepSpaceContext {
            epoch_1950: 27_103.5,
            eccentricity: 0.74,
            inclination: 63.4_f64.to_radians(),
            raan: 120.0_f64.to_radians(),
            arg_perigee: 270.0_f64.to_radians(),
            mean_anomaly: 10.0_f64.to_radians(),
            no_unkozai: nm,
            mdot: nm,
            nodedot: 0.0,
            argpdot: 0.0,
            gsto: 1.0,
            xke: 0.07436691613317342,
        }
    }

    #[test]
    fn molniya_band_is_half_day() {
        let ds = DeepSpace::new(&molniya_context());
        assert!(matches!(ds.resonance(), Resonance::HalfDay { .. }));
    }

    #[test]
    fn geo_band_is_synchronous() {
        let mut ctx = molniya_context();
        ctx.eccentricity = 0.0002;
        ctx.inclination = 0.04_f64.to_radians();
        ctx.no_unkozai = TWOPI / 1436.0;
        ctx.mdot = ctx.no_unkozai;
        let ds = DeepSpace::new(&ctx);
        assert!(matches!(ds.resonance(), Resonance::Synchronous { .. }));
    }

    #[test]
    fn low_eccentricity_half_day_band_is_unresonant() {
        // The 12-hour band only resonates for e >= 0.5.
        let mut ctx = molniya_context();
        ctx.eccentricity = 0.3;
        let ds = DeepSpace::new(&ctx);
        assert!(matches!(ds.resonance(), Resonance::None));
    }

    #[test]
    fn integrator_sign_flip_resets() {
        let mut ds = DeepSpace::new(&molniya_context());
        let fresh = ds.clone();

        let forward = ds.secular(1440.0, 0.74, 1.1, 2.0, 4.7, 0.2, TWOPI / 718.0);
        assert!(ds.state().atime > 0.0);

        // A negative-time excursion flips the state sign...
        ds.secular(-1440.0, 0.74, 1.1, 2.0, 4.7, 0.2, TWOPI / 718.0);
        assert!(ds.state().atime < 0.0);

        // ...and the next positive request starts over from epoch values,
        // reproducing the fresh result exactly.
        let replay = ds.secular(1440.0, 0.74, 1.1, 2.0, 4.7, 0.2, TWOPI / 718.0);
        let mut fresh = fresh;
        let expected = fresh.secular(1440.0, 0.74, 1.1, 2.0, 4.7, 0.2, TWOPI / 718.0);
        assert_eq!(replay, expected);
        assert_eq!(forward, expected);
    }

    #[test]
    fn secular_rates_are_small() {
        let mut ds = DeepSpace::new(&molniya_context());
        let (em, inclm, ..) = ds.secular(1440.0, 0.74, 63.4_f64.to_radians(), 2.0, 4.7, 0.2, TWOPI / 718.0);
        // Lunisolar drift over a day stays tiny.
        assert!((em - 0.74).abs() < 1e-3);
        assert!((inclm - 63.4_f64.to_radians()).abs() < 1e-3);
    }

    #[test]
    fn periodics_perturb_gently() {
        let ds = DeepSpace::new(&molniya_context());
        let (ep, inclp, nodep, argpp, mp) =
            ds.periodics(720.0, 0.74, 63.4_f64.to_radians(), 2.0, 4.7, 0.2);
        assert!((ep - 0.74).abs() < 1e-2);
        assert!((inclp - 63.4_f64.to_radians()).abs() < 1e-2);
        assert!((nodep - 2.0).abs() < 1e-2);
        assert!((argpp - 4.7).abs() < 1e-1);
        assert!((mp - 0.2).abs() < 1e-1);
    }
}
