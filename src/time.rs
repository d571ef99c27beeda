//! Calendar, Julian Date, Modified Julian Date and seconds-of-time
//! conversions.
//!
//! Julian Dates are carried either as a plain `f64` or, where multi-day
//! arithmetic has to keep microsecond precision, as a normalized
//! [`TimeSplit`] integer+fraction pair.

use thiserror::Error;

use crate::constants::{J2000_JD, MJD_OFFSET, SECONDS_PER_DAY, SECONDS_REF_JD};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    /// The calendar inversion is only tabulated for 1900-2100.
    #[error("Julian Date {jd} is more than 36525 days from J2000")]
    JulianDateOutOfRange { jd: f64 },

    #[error("invalid calendar date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// A civil UTC date and time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

/// Normalized integer+fraction pair: `fraction` is always in [0, 1).
///
/// Replaces by-reference renormalization of (int, fraction) doubles with an
/// immutable value; [`TimeSplit::new`] is the only way the invariant is
/// established.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSplit {
    pub days: i64,
    pub fraction: f64,
}

impl TimeSplit {
    /// Build a normalized split from any integer/fraction pair.
    pub fn new(days: i64, fraction: f64) -> Self {
        let carry = fraction.floor();
        TimeSplit {
            days: days + carry as i64,
            fraction: fraction - carry,
        }
    }

    pub fn from_f64(value: f64) -> Self {
        Self::new(0, value)
    }

    pub fn to_f64(self) -> f64 {
        self.days as f64 + self.fraction
    }
}

/// Whole and fractional seconds since the [`SECONDS_REF_JD`] epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondsFromRef {
    pub seconds: i64,
    pub fraction: f64,
}

/// Convert a UTC calendar date/time to a Julian Date.
///
/// Integer part via `367y - 7(y + (mo+9)/12)/4 + 275 mo/9 + d + 1721013`,
/// fractional day from the time of day, shifted by 0.5 so the date rolls at
/// midnight.
pub fn date_time_to_jd(dt: &DateTime) -> f64 {
    let y = dt.year as i64;
    let mo = dt.month as i64;
    let d = dt.day as i64;
    let jd_int = 367 * y - 7 * (y + (mo + 9) / 12) / 4 + 275 * mo / 9 + d + 1_721_013;
    let day_frac = dt.hour as f64 / 24.0
        + dt.minute as f64 / 1440.0
        + dt.second / SECONDS_PER_DAY
        + 0.5;
    jd_int as f64 + day_frac
}

/// Same conversion, keeping the integer/fraction split.
pub fn date_time_to_jd_split(dt: &DateTime) -> TimeSplit {
    let jd = date_time_to_jd(dt);
    let days = jd.floor();
    TimeSplit::new(days as i64, jd - days)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Convert a Julian Date back to a UTC calendar date/time.
///
/// Valid for |JD - J2000| <= 36525 days (years 1900-2100). A seconds value
/// within 1 ms of 59.999 rounds up to the next minute and the carry cascades
/// across the minute, hour, day, month and year boundaries.
pub fn jd_to_date_time(jd: f64) -> Result<DateTime, TimeError> {
    if (jd - J2000_JD).abs() > 36_525.0 {
        return Err(TimeError::JulianDateOutOfRange { jd });
    }

    let date_mjd = jd - MJD_OFFSET;
    let t4 = date_mjd.rem_euclid(1.0);
    let t1 = 1.0 + date_mjd - t4 + 2_400_000.0;
    let ih = ((t1 - 1_867_216.25) / 36_524.0) as i64;
    let t2 = t1 + 1.0 + ih as f64 - (ih / 4) as f64;
    let t3 = t2 - 1_720_995.0;
    let mut ih1 = ((t3 - 122.1) / 365.25) as i64;

    let mut year = ih1 as i32;
    let t1 = 365.25 * ih1 as f64 - (365.25 * ih1 as f64) % 1.0;
    let ih2 = ((t3 - t1) / 30.6001) as i64;
    ih1 = (30.6001 * ih2 as f64) as i64;
    let day_real = t3 - t1 - ih1 as f64 + t4;
    let mut month = (ih2 - 1) as i32;
    if ih2 > 13 {
        month = (ih2 - 13) as i32;
    }
    if month <= 2 {
        year += 1;
    }

    let mut day = day_real as u32;
    let t1 = (day_real - day as f64) * 24.0;
    let mut hour = t1 as u32;
    let t2 = (t1 - hour as f64) * 60.0;
    let mut minute = t2 as u32;
    let mut second = (t2 - minute as f64) * 60.0;

    if (second - 59.999).abs() < 0.001 {
        second = 0.0;
        minute += 1;
    }
    if second < 0.0 {
        second = 0.0;
    }
    if minute == 60 {
        minute = 0;
        hour += 1;
    }
    let mut month = month as u32;
    if hour == 24 {
        hour = 0;
        day += 1;
        if day > days_in_month(year, month) {
            day = 1;
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
    }

    Ok(DateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
    })
}

/// JD -> MJD on a normalized split (MJD = JD - 2400000.5).
pub fn jd_to_mjd(jd: TimeSplit) -> TimeSplit {
    TimeSplit::new(jd.days - 2_400_001, jd.fraction + 0.5)
}

/// MJD -> JD on a normalized split.
pub fn mjd_to_jd(mjd: TimeSplit) -> TimeSplit {
    TimeSplit::new(mjd.days + 2_400_000, mjd.fraction + 0.5)
}

/// Seconds elapsed since the reference epoch JD 2450000.0, split so that
/// several days of arithmetic keep sub-microsecond resolution.
pub fn jd_to_seconds_from_reference(jd: TimeSplit) -> SecondsFromRef {
    let whole = (jd.days - SECONDS_REF_JD as i64) * SECONDS_PER_DAY as i64;
    let frac = jd.fraction * SECONDS_PER_DAY;
    let carry = frac.floor();
    SecondsFromRef {
        seconds: whole + carry as i64,
        fraction: frac - carry,
    }
}

/// Inverse of [`jd_to_seconds_from_reference`].
pub fn seconds_from_reference_to_jd(sec: SecondsFromRef) -> TimeSplit {
    let days = sec.seconds.div_euclid(SECONDS_PER_DAY as i64);
    let rem = sec.seconds.rem_euclid(SECONDS_PER_DAY as i64);
    TimeSplit::new(
        SECONDS_REF_JD as i64 + days,
        (rem as f64 + sec.fraction) / SECONDS_PER_DAY,
    )
}

/// Day of year, 1-based. Uses the full Gregorian leap rule; the mod-4
/// shortcut found in legacy orbit code misclassifies 1900 and 2100.
pub fn day_of_year(year: i32, month: u32, day: u32) -> Result<u32, TimeError> {
    if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
        return Err(TimeError::InvalidDate { year, month, day });
    }
    let cumulative = [0u32, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
    let mut doy = cumulative[(month - 1) as usize] + day;
    if month > 2 && is_leap_year(year) {
        doy += 1;
    }
    Ok(doy)
}

/// Julian Date of `year` January 0.0 (i.e. midnight ending December 31 of
/// the previous year), the anchor for TLE fractional day-of-year epochs.
pub fn jd_of_year_start(year: i32) -> f64 {
    date_time_to_jd(&DateTime {
        year: year - 1,
        month: 12,
        day: 31,
        hour: 0,
        minute: 0,
        second: 0.0,
    })
}
