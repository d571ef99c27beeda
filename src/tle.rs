//! Fixed-column Two-Line Element parsing.
//!
//! Records are 2- or 3-line groups (optional name line first), `#` lines are
//! comments. Columns follow the NORAD layout:
//!
//! ```text
//! 1 NNNNNC NNNNNAAA NNNNN.NNNNNNNN +.NNNNNNNN +NNNNN-N +NNNNN-N N NNNNN
//! 2 NNNNN NNN.NNNN NNN.NNNN NNNNNNN NNN.NNNN NNN.NNNN NN.NNNNNNNNNNNNNN
//! ```
//!
//! Catalog numbers above 99999 use the Alpha-5 encoding (A0000..Z9999).

use std::io::BufRead;

use log::warn;
use thiserror::Error;

use crate::constants::{DEG2RAD, MINUTES_PER_DAY, TWOPI};
use crate::elements::{epoch_to_jd, full_epoch_year, MeanElements};

/// Revolutions per day to radians per minute.
const XPDOTP: f64 = MINUTES_PER_DAY / TWOPI;

#[derive(Error, Debug)]
pub enum TleError {
    #[error("line {line_no}: expected a TLE record, got {content:?}")]
    UnexpectedRecord { line_no: usize, content: String },

    #[error("line {line}: checksum is {expected} but columns 1-68 tally to {computed}")]
    ChecksumMismatch { line: u8, expected: u8, computed: u8 },

    #[error("cannot parse {field} (columns {columns}) from {text:?}")]
    MalformedField {
        field: &'static str,
        columns: &'static str,
        text: String,
    },

    #[error("catalog numbers disagree between lines: {line1} vs {line2}")]
    CatalogMismatch { line1: u32, line2: u32 },

    #[error("TLE lines contain non-ASCII characters")]
    NonAscii,

    #[error("no TLE records found in input")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What to do with a bad checksum. Field-collected TLEs routinely carry
/// stale checksum digits, so the mismatch can be downgraded to a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    #[default]
    Strict,
    Lenient,
}

/// Checksum of the first 68 columns: digit sum with '-' counting as 1,
/// everything else 0, modulo 10.
pub fn compute_checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(68)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Return `line` truncated/padded to 68 columns with the correct checksum
/// appended, discarding any checksum already present.
pub fn fix_checksum(line: &str) -> String {
    let body: String = line.chars().take(68).collect();
    let padded = format!("{body:<68}");
    let checksum = compute_checksum(&padded);
    format!("{padded}{checksum}")
}

fn check_line(line: &str, which: u8, policy: ChecksumPolicy) -> Result<(), TleError> {
    let Some(given) = line.as_bytes().get(68) else {
        return Ok(());
    };
    if !given.is_ascii_digit() {
        return Ok(());
    }
    let expected = given - b'0';
    let computed = compute_checksum(line);
    if expected != computed {
        match policy {
            ChecksumPolicy::Strict => {
                return Err(TleError::ChecksumMismatch {
                    line: which,
                    expected,
                    computed,
                })
            }
            ChecksumPolicy::Lenient => warn!(
                "TLE line {which} checksum is {expected} but tallies to {computed}; accepting"
            ),
        }
    }
    Ok(())
}

fn float_field(line: &str, range: std::ops::Range<usize>, field: &'static str, columns: &'static str) -> Result<f64, TleError> {
    let text = line.get(range).unwrap_or("");
    text.trim().parse::<f64>().map_err(|_| TleError::MalformedField {
        field,
        columns,
        text: text.to_string(),
    })
}

fn int_field(line: &str, range: std::ops::Range<usize>, field: &'static str, columns: &'static str) -> Result<u32, TleError> {
    let text = line.get(range).unwrap_or("");
    text.trim().parse::<u32>().map_err(|_| TleError::MalformedField {
        field,
        columns,
        text: text.to_string(),
    })
}

/// Decode a 5-column catalog field, Alpha-5 aware: a leading letter encodes
/// the ten-thousands (A=10 .. Z=33, skipping I and O).
fn catalog_field(line: &str, field: &'static str) -> Result<u32, TleError> {
    let text = line.get(2..7).unwrap_or("");
    let trimmed = text.trim();
    let malformed = || TleError::MalformedField {
        field,
        columns: "3-7",
        text: text.to_string(),
    };
    let mut chars = trimmed.chars();
    let first = chars.next().ok_or_else(malformed)?;
    if !first.is_ascii_alphabetic() {
        return trimmed.parse::<u32>().map_err(|_| malformed());
    }
    let c = first.to_ascii_uppercase();
    let mut high = (c as u8 - b'A') as u32 + 10;
    if c > 'I' {
        high -= 1;
    }
    if c > 'O' {
        high -= 1;
    }
    let low: u32 = chars.as_str().parse().map_err(|_| malformed())?;
    Ok(high * 10_000 + low)
}

/// Encode a catalog number into its 5-column Alpha-5 form, or `None` above
/// the Z9999 ceiling of 339999.
pub fn catalog_to_alpha5(n: u32) -> Option<String> {
    if n < 100_000 {
        return Some(format!("{n:05}"));
    }
    if n > 339_999 {
        return None;
    }
    let mut code = (n / 10_000) as u8 + b'A' - 10;
    if code >= b'I' {
        code += 1;
    }
    if code >= b'O' {
        code += 1;
    }
    Some(format!("{}{:04}", code as char, n % 10_000))
}

/// Decode the TLE mantissa+exponent field: " 40768-4" -> 0.40768e-4.
fn implied_decimal(line: &str, range: std::ops::Range<usize>, field: &'static str, columns: &'static str) -> Result<f64, TleError> {
    let text = line.get(range).unwrap_or("");
    let s = text.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    let malformed = || TleError::MalformedField {
        field,
        columns,
        text: text.to_string(),
    };
    let bytes = s.as_bytes();
    let exp_pos = (1..bytes.len())
        .rev()
        .find(|&i| bytes[i] == b'+' || bytes[i] == b'-');
    let (mantissa, exponent) = match exp_pos {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, "+0"),
    };
    let sign = if mantissa.starts_with('-') { -1.0 } else { 1.0 };
    let digits = mantissa.trim_start_matches(['+', '-']);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let value: f64 = format!("0.{digits}").parse().map_err(|_| malformed())?;
    let exp: i32 = exponent.parse().map_err(|_| malformed())?;
    Ok(sign * value * 10f64.powi(exp))
}

/// Parse one record from a line pair, with an optional name label.
pub fn parse_record(
    name: Option<&str>,
    line1: &str,
    line2: &str,
    policy: ChecksumPolicy,
) -> Result<MeanElements, TleError> {
    let line1 = line1.trim_end();
    let line2 = line2.trim_end();

    if !line1.is_ascii() || !line2.is_ascii() {
        return Err(TleError::NonAscii);
    }

    // Work against 69-column lines so the column ranges below cannot slice
    // out of bounds on a short-but-valid final field.
    let l1 = format!("{line1:<69}");
    let l2 = format!("{line2:<69}");

    if !l1.starts_with("1 ") {
        return Err(TleError::UnexpectedRecord {
            line_no: 1,
            content: line1.to_string(),
        });
    }
    if !l2.starts_with("2 ") {
        return Err(TleError::UnexpectedRecord {
            line_no: 2,
            content: line2.to_string(),
        });
    }

    check_line(&l1, 1, policy)?;
    check_line(&l2, 2, policy)?;

    // Line 1 fields.
    let catalog_number = catalog_field(&l1, "catalog number")?;
    let classification = l1.as_bytes()[7] as char;
    let intl_designator = l1[9..17].trim().to_string();
    let epoch_year_2d = int_field(&l1, 18..20, "epoch year", "19-20")?;
    let epoch_day = float_field(&l1, 20..32, "epoch day of year", "21-32")?;
    let ndot_rev = float_field(&l1, 33..43, "mean motion derivative", "34-43")?;
    let nddot_rev = implied_decimal(&l1, 44..52, "mean motion 2nd derivative", "45-52")?;
    let bstar = implied_decimal(&l1, 53..61, "B* drag term", "54-61")?;
    let ephemeris_type = l1[62..63].trim().parse::<u8>().unwrap_or(0);
    let element_set = l1[64..68].trim().parse::<u16>().unwrap_or(0);

    // Line 2 fields.
    let catalog_line2 = catalog_field(&l2, "catalog number")?;
    if catalog_number != catalog_line2 {
        return Err(TleError::CatalogMismatch {
            line1: catalog_number,
            line2: catalog_line2,
        });
    }
    let inclination_deg = float_field(&l2, 8..16, "inclination", "9-16")?;
    let raan_deg = float_field(&l2, 17..25, "RAAN", "18-25")?;
    let ecc_digits = l2[26..33].replace(' ', "0");
    let eccentricity: f64 = format!("0.{ecc_digits}")
        .parse()
        .map_err(|_| TleError::MalformedField {
            field: "eccentricity",
            columns: "27-33",
            text: l2[26..33].to_string(),
        })?;
    let argp_deg = float_field(&l2, 34..42, "argument of perigee", "35-42")?;
    let mean_anomaly_deg = float_field(&l2, 43..51, "mean anomaly", "44-51")?;
    let mean_motion_rev_day = float_field(&l2, 52..63, "mean motion", "53-63")?;
    let rev_number = l2[63..68].trim().parse::<u32>().unwrap_or(0);

    let epoch_year = full_epoch_year(epoch_year_2d);

    Ok(MeanElements {
        catalog_number,
        name: name.map(|n| n.trim().to_string()),
        classification,
        intl_designator,
        epoch_year,
        epoch_day,
        epoch_jd: epoch_to_jd(epoch_year, epoch_day),
        // rev/day^2 and rev/day^3 (already /2 and /6) into rad/min^2,3.
        ndot: ndot_rev / (XPDOTP * MINUTES_PER_DAY),
        nddot: nddot_rev / (XPDOTP * MINUTES_PER_DAY * MINUTES_PER_DAY),
        bstar,
        eccentricity,
        inclination: inclination_deg * DEG2RAD,
        raan: raan_deg * DEG2RAD,
        arg_perigee: argp_deg * DEG2RAD,
        mean_anomaly: mean_anomaly_deg * DEG2RAD,
        mean_motion: mean_motion_rev_day / XPDOTP,
        ephemeris_type,
        element_set,
        rev_number,
    })
}

/// One record's worth of outcome from a stream: the driver decides whether a
/// failed record aborts the batch or is skipped.
pub type RecordResult = Result<MeanElements, TleError>;

/// Read every record from a text stream.
///
/// Blank lines and `#` comments are skipped. A line that is neither a
/// comment nor a line-1 start may serve as a name label for the pair that
/// follows; two such lines in a row make the record fail with
/// `UnexpectedRecord`. I/O failures abort the whole read.
pub fn parse_stream<R: BufRead>(
    reader: R,
    policy: ChecksumPolicy,
) -> Result<Vec<RecordResult>, TleError> {
    let mut records = Vec::new();
    let mut pending_name: Option<(usize, String)> = None;
    let mut pending_line1: Option<(usize, String)> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some((_, l1)) = pending_line1.take() {
            let name = pending_name.take().map(|(_, n)| n);
            records.push(parse_record(name.as_deref(), &l1, trimmed, policy));
            continue;
        }

        if trimmed.starts_with("1 ") {
            pending_line1 = Some((line_no, trimmed.to_string()));
        } else if let Some((name_line_no, _name)) = pending_name.take() {
            // Second non-record line in a row: neither was a valid record.
            records.push(Err(TleError::UnexpectedRecord {
                line_no: name_line_no,
                content: trimmed.to_string(),
            }));
        } else {
            pending_name = Some((line_no, trimmed.to_string()));
        }
    }

    if let Some((line_no, _)) = pending_line1 {
        records.push(Err(TleError::UnexpectedRecord {
            line_no,
            content: "line 1 without a matching line 2".to_string(),
        }));
    }
    if records.is_empty() {
        return Err(TleError::Empty);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    // Vallado verification satellite 00005, checksums valid.
    const L1: &str = "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    const L2: &str = "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

    // ISS record whose line-1 checksum digit is stale (tallies to 5, says 1).
    const ISS1: &str = "1 25544U 98067A   24075.50000000  .00002182  00000-0  40768-4 0  9991";
    const ISS2: &str = "2 25544  51.6416  77.3721 0004537 150.2020 310.0000 15.50103472000003";

    #[test]
    fn parses_verification_satellite() {
        let el = parse_record(None, L1, L2, ChecksumPolicy::Strict).unwrap();
        assert_eq!(el.catalog_number, 5);
        assert_eq!(el.classification, 'U');
        assert_eq!(el.intl_designator, "58002B");
        assert_eq!(el.epoch_year, 2000);
        assert_abs_diff_eq!(el.epoch_day, 179.78495062, epsilon = 1e-10);
        assert_abs_diff_eq!(el.bstar, 2.8098e-5, epsilon = 1e-12);
        assert_abs_diff_eq!(el.eccentricity, 0.1859667, epsilon = 1e-10);
        assert_abs_diff_eq!(el.inclination, 34.2682_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(el.raan, 348.7242_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(el.arg_perigee, 331.7664_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(el.mean_anomaly, 19.3264_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(el.mean_motion, 0.04722944544077857, epsilon = 1e-12);
        assert_eq!(el.element_set, 475);
        assert_eq!(el.rev_number, 41366);
    }

    #[test]
    fn checksum_policy_strict_vs_lenient() {
        let err = parse_record(None, ISS1, ISS2, ChecksumPolicy::Strict).unwrap_err();
        match err {
            TleError::ChecksumMismatch { line, expected, computed } => {
                assert_eq!((line, expected, computed), (1, 1, 5));
            }
            other => panic!("expected checksum mismatch, got {other}"),
        }
        let el = parse_record(None, ISS1, ISS2, ChecksumPolicy::Lenient).unwrap();
        assert_eq!(el.catalog_number, 25_544);
        assert_abs_diff_eq!(el.epoch_jd, 2_460_385.0, epsilon = 1e-9);
    }

    #[test]
    fn reserialized_line_reproduces_checksum() {
        for line in [L1, L2, ISS2] {
            let fixed = fix_checksum(&line[..68]);
            assert_eq!(fixed, line);
            let digit = fixed.as_bytes()[68] - b'0';
            assert_eq!(digit, compute_checksum(&fixed));
        }
        // The stale ISS line 1 comes back with its checksum corrected.
        let fixed = fix_checksum(ISS1);
        assert_eq!(fixed.as_bytes()[68] - b'0', 5);
    }

    #[test]
    fn catalog_mismatch_is_rejected() {
        let bad2 = "2 00007  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413669";
        assert!(matches!(
            parse_record(None, L1, bad2, ChecksumPolicy::Lenient),
            Err(TleError::CatalogMismatch { line1: 5, line2: 7 })
        ));
    }

    #[test]
    fn malformed_field_names_the_columns() {
        let broken = L2.replace("34.2682", "34.26a2");
        let err = parse_record(None, L1, &broken, ChecksumPolicy::Lenient).unwrap_err();
        match err {
            TleError::MalformedField { field, columns, .. } => {
                assert_eq!(field, "inclination");
                assert_eq!(columns, "9-16");
            }
            other => panic!("expected malformed field, got {other}"),
        }
    }

    #[test]
    fn non_ascii_is_rejected() {
        let bad = L1.replace("23 ", "23\u{a0}");
        assert!(matches!(
            parse_record(None, &bad, L2, ChecksumPolicy::Lenient),
            Err(TleError::NonAscii)
        ));
    }

    #[test]
    fn alpha5_catalog_numbers() {
        let l1 = fix_checksum("1 A0000U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  475");
        let l2 = fix_checksum("2 A0000  34.2682 348.7242 1859667 331.7664  19.3264 10.8241915741366");
        let el = parse_record(None, &l1, &l2, ChecksumPolicy::Strict).unwrap();
        assert_eq!(el.catalog_number, 100_000);

        assert_eq!(catalog_to_alpha5(25_544).as_deref(), Some("25544"));
        assert_eq!(catalog_to_alpha5(100_000).as_deref(), Some("A0000"));
        assert_eq!(catalog_to_alpha5(339_999).as_deref(), Some("Z9999"));
        assert_eq!(catalog_to_alpha5(340_000), None);
    }

    #[test]
    fn implied_decimal_forms() {
        let probe = |text: &str| {
            let padded = format!("{text:<8}");
            implied_decimal(&padded, 0..8, "probe", "1-8").unwrap()
        };
        assert_abs_diff_eq!(probe(" 40768-4"), 0.40768e-4, epsilon = 1e-15);
        assert_abs_diff_eq!(probe("-11606-4"), -0.11606e-4, epsilon = 1e-15);
        assert_abs_diff_eq!(probe(" 00000-0"), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(probe(" 28098+1"), 2.8098, epsilon = 1e-12);
    }

    #[test]
    fn stream_handles_names_comments_and_bad_records() {
        let text = format!(
            "# field-collected elements\n\nISS (ZARYA)\n{ISS1}\n{ISS2}\n{L1}\n{L2}\nnot a tle\nalso not one\n"
        );
        let records = parse_stream(Cursor::new(text), ChecksumPolicy::Lenient).unwrap();
        assert_eq!(records.len(), 3);
        let iss = records[0].as_ref().unwrap();
        assert_eq!(iss.name.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(iss.catalog_number, 25_544);
        let five = records[1].as_ref().unwrap();
        assert_eq!(five.name, None);
        assert_eq!(five.catalog_number, 5);
        assert!(matches!(
            records[2],
            Err(TleError::UnexpectedRecord { .. })
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            parse_stream(Cursor::new("# nothing here\n"), ChecksumPolicy::Strict),
            Err(TleError::Empty)
        ));
    }
}
