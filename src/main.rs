//! Command-line overpass predictor: TLE file in, visibility table out.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime as ChronoDateTime, Timelike, Utc};
use clap::Parser;
use log::{info, warn};

use satpass::constants::GravityModel;
use satpass::geodesy::dms_to_radians;
use satpass::pass::{format_sample, report_header, PassPredictor, PredictionConfig, Site};
use satpass::time::{date_time_to_jd, DateTime};
use satpass::tle::{parse_stream, ChecksumPolicy};

#[derive(Parser, Debug)]
#[command(name = "satpass", about = "Predict satellite overpasses from a TLE file")]
struct Args {
    /// TLE file (2- or 3-line records, # comments allowed).
    tle: PathBuf,

    /// Site latitude, degrees north (or +-DD.MMSSss with --dms).
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Site longitude, degrees east (or +-DD.MMSSss with --dms).
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Site height above the reference ellipsoid, metres.
    #[arg(long, default_value_t = 0.0)]
    height: f64,

    /// Read --lat/--lon as packed degrees-minutes-seconds.
    #[arg(long)]
    dms: bool,

    /// Start epoch: RFC 3339 UTC timestamp or a raw Julian Date.
    /// Defaults to each record's TLE epoch.
    #[arg(long)]
    start: Option<String>,

    /// Prediction span, days.
    #[arg(long, default_value_t = 1.0)]
    days: f64,

    /// Sampling step, seconds.
    #[arg(long, default_value_t = 60.0)]
    step_seconds: f64,

    /// Elevation mask, degrees.
    #[arg(long, default_value_t = 0.0)]
    mask: f64,

    /// Propagate against WGS-84 instead of the standard WGS-72.
    #[arg(long)]
    wgs84: bool,

    /// Fail records whose checksum digit does not tally.
    #[arg(long)]
    strict_checksum: bool,

    /// Write the table here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_start(text: &str) -> Result<f64> {
    if let Ok(jd) = text.parse::<f64>() {
        return Ok(jd);
    }
    let stamp: ChronoDateTime<Utc> = text
        .parse()
        .with_context(|| format!("--start {text:?} is neither a Julian Date nor RFC 3339"))?;
    let date = stamp.date_naive();
    use chrono::Datelike;
    Ok(date_time_to_jd(&DateTime {
        year: date.year(),
        month: date.month(),
        day: date.day(),
        hour: stamp.hour(),
        minute: stamp.minute(),
        second: stamp.second() as f64 + stamp.nanosecond() as f64 * 1e-9,
    }))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (lat, lon) = if args.dms {
        (dms_to_radians(args.lat), dms_to_radians(args.lon))
    } else {
        (args.lat.to_radians(), args.lon.to_radians())
    };
    let site = Site::new(satpass::geodesy::Geodetic {
        latitude: lat,
        longitude: lon,
        height_m: args.height,
    });

    let start_jd = match &args.start {
        Some(text) => parse_start(text)?,
        None => 0.0,
    };
    let config = PredictionConfig {
        start_jd,
        duration_days: args.days,
        step_days: args.step_seconds / 86_400.0,
        elevation_mask_rad: args.mask.to_radians(),
    };
    let model = if args.wgs84 {
        GravityModel::Wgs84
    } else {
        GravityModel::Wgs72
    };
    let policy = if args.strict_checksum {
        ChecksumPolicy::Strict
    } else {
        ChecksumPolicy::Lenient
    };

    let file = File::open(&args.tle)
        .with_context(|| format!("cannot open TLE file {}", args.tle.display()))?;
    let records = parse_stream(BufReader::new(file), policy)
        .with_context(|| format!("cannot read TLE file {}", args.tle.display()))?;

    let mut elements = Vec::new();
    for record in records {
        match record {
            Ok(el) => elements.push(el),
            Err(err) => warn!("skipping TLE record: {err}"),
        }
    }
    if elements.is_empty() {
        bail!("no parsable TLE records in {}", args.tle.display());
    }

    let predictor = PassPredictor::new(site, config).with_model(model);
    let results = predictor.predict_all(&elements);
    if results.is_empty() {
        bail!("every satellite failed to propagate");
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    for (el, samples) in &results {
        let label = el
            .name
            .clone()
            .unwrap_or_else(|| format!("catalog {}", el.catalog_number));
        let windows = predictor.group_passes(samples);
        info!(
            "{label}: {} visible samples in {} passes",
            samples.len(),
            windows.len()
        );
        writeln!(out, "# {label} ({} passes)", windows.len())?;
        writeln!(out, "{}", report_header())?;
        for sample in samples {
            writeln!(out, "{}", format_sample(sample))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
