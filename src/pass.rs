//! Overpass prediction: step a propagator across a time window, rotate each
//! state into the Earth-fixed frame and keep the samples a ground station
//! can actually see.

use log::warn;
use thiserror::Error;

use crate::constants::GravityModel;
use crate::elements::MeanElements;
use crate::geodesy::{look_angles, Geodetic, Topocentric};
use crate::propagator::{PropagationError, Propagator};
use crate::sidereal::teme_to_ecef;
use crate::time::{jd_to_date_time, DateTime, TimeError};

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Time(#[from] TimeError),
}

/// A ground station with its ECEF coordinates precomputed.
#[derive(Debug, Clone)]
pub struct Site {
    pub geodetic: Geodetic,
    ecef: [f64; 3],
}

impl Site {
    pub fn new(geodetic: Geodetic) -> Self {
        let ecef = geodetic.to_ecef();
        Site { geodetic, ecef }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64, height_m: f64) -> Self {
        Self::new(Geodetic::from_degrees(lat_deg, lon_deg, height_m))
    }

    pub fn ecef(&self) -> [f64; 3] {
        self.ecef
    }
}

/// Prediction window and sampling configuration.
#[derive(Debug, Clone, Copy)]
pub struct PredictionConfig {
    /// UTC Julian Date to start from; 0.0 means the TLE epoch.
    pub start_jd: f64,
    pub duration_days: f64,
    pub step_days: f64,
    /// Minimum elevation for a sample to count as visible.
    pub elevation_mask_rad: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            start_jd: 0.0,
            duration_days: 1.0,
            step_days: 1.0 / 1440.0,
            elevation_mask_rad: 0.0,
        }
    }
}

/// One epoch at which the satellite clears the elevation mask.
#[derive(Debug, Clone)]
pub struct VisibleSample {
    pub jd: f64,
    pub utc: DateTime,
    pub observation: Topocentric,
}

/// A contiguous block of visible samples: one rise-to-set pass.
#[derive(Debug, Clone)]
pub struct PassWindow {
    pub samples: Vec<VisibleSample>,
}

impl PassWindow {
    pub fn rise_jd(&self) -> f64 {
        self.samples.first().map(|s| s.jd).unwrap_or(0.0)
    }

    pub fn set_jd(&self) -> f64 {
        self.samples.last().map(|s| s.jd).unwrap_or(0.0)
    }

    pub fn duration_minutes(&self) -> f64 {
        (self.set_jd() - self.rise_jd()) * 1440.0
    }

    pub fn max_elevation(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.observation.elevation)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// The driver tying the propagator, frame rotation and geodesy together.
#[derive(Debug, Clone)]
pub struct PassPredictor {
    site: Site,
    config: PredictionConfig,
    model: GravityModel,
}

impl PassPredictor {
    pub fn new(site: Site, config: PredictionConfig) -> Self {
        PassPredictor {
            site,
            config,
            model: GravityModel::default(),
        }
    }

    pub fn with_model(mut self, model: GravityModel) -> Self {
        self.model = model;
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Predict all visible samples for one satellite.
    ///
    /// A propagator fault anywhere in the window fails the whole satellite;
    /// batch callers decide whether to skip it.
    pub fn predict(&self, elements: &MeanElements) -> Result<Vec<VisibleSample>, PredictionError> {
        let mut propagator = Propagator::new(elements, self.model)?;
        let start_jd = if self.config.start_jd > 0.0 {
            self.config.start_jd
        } else {
            elements.epoch_jd
        };
        let steps = (self.config.duration_days / self.config.step_days).round() as u64;

        let mut visible = Vec::new();
        for k in 0..steps {
            let jd = start_jd + k as f64 * self.config.step_days;
            let teme = propagator.propagate_jd(jd)?;
            let ecef = teme_to_ecef(&teme, jd);
            let site_ecef = self.site.ecef;
            let delta = [
                ecef.position_m[0] - site_ecef[0],
                ecef.position_m[1] - site_ecef[1],
                ecef.position_m[2] - site_ecef[2],
            ];
            let observation = look_angles(&self.site.geodetic, delta);
            if observation.elevation > self.config.elevation_mask_rad {
                visible.push(VisibleSample {
                    jd,
                    utc: jd_to_date_time(jd)?,
                    observation,
                });
            }
        }
        Ok(visible)
    }

    /// Predict for a whole batch, skipping satellites whose propagation
    /// faults and logging why. Returns (elements, samples) per survivor.
    pub fn predict_all<'a>(
        &self,
        batch: &'a [MeanElements],
    ) -> Vec<(&'a MeanElements, Vec<VisibleSample>)> {
        let mut out = Vec::new();
        for elements in batch {
            match self.predict(elements) {
                Ok(samples) => out.push((elements, samples)),
                Err(err) => {
                    warn!(
                        "skipping catalog {}: {err}",
                        elements.catalog_number
                    );
                }
            }
        }
        out
    }

    /// Fold visible samples into contiguous pass windows. Samples further
    /// apart than 1.5 sampling steps open a new window.
    pub fn group_passes(&self, samples: &[VisibleSample]) -> Vec<PassWindow> {
        group_passes(samples, self.config.step_days)
    }
}

/// Group visible samples into passes by sample contiguity.
pub fn group_passes(samples: &[VisibleSample], step_days: f64) -> Vec<PassWindow> {
    let gap = 1.5 * step_days;
    let mut windows: Vec<PassWindow> = Vec::new();
    for sample in samples {
        match windows.last_mut() {
            Some(window) if sample.jd - window.set_jd() <= gap => {
                window.samples.push(sample.clone());
            }
            _ => windows.push(PassWindow {
                samples: vec![sample.clone()],
            }),
        }
    }
    windows
}

/// Header for the visibility table.
pub fn report_header() -> String {
    format!(
        "{:<20} {:>4} {:>2} {:>2} {:>2} {:>2} {:>8}  {:>10}  {:>10}",
        "JulianDate", "Year", "Mo", "Dy", "Hr", "Mi", "Second", "Elev(deg)", "Azim(deg)"
    )
}

/// One whitespace-padded report row: fractional JD to 10 decimals, the UTC
/// civil time, then elevation and azimuth in degrees to 4 decimals.
pub fn format_sample(sample: &VisibleSample) -> String {
    let u = &sample.utc;
    format!(
        "{:<20.10} {:>4} {:>2} {:>2} {:>2} {:>2} {:>8.3}  {:>10.4}  {:>10.4}",
        sample.jd,
        u.year,
        u.month,
        u.day,
        u.hour,
        u.minute,
        u.second,
        sample.observation.elevation.to_degrees(),
        sample.observation.azimuth.to_degrees(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEG2RAD;

    fn sample(jd: f64, elevation: f64) -> VisibleSample {
        VisibleSample {
            jd,
            utc: jd_to_date_time(jd).unwrap(),
            observation: Topocentric {
                azimuth: 1.0,
                elevation,
                range_m: 1.0e6,
            },
        }
    }

    #[test]
    fn grouping_splits_on_gaps() {
        let step = 1.0 / 1440.0;
        let base = 2_460_385.0;
        let samples = vec![
            sample(base, 0.2),
            sample(base + step, 0.3),
            sample(base + 2.0 * step, 0.25),
            // 20-minute gap
            sample(base + 22.0 * step, 0.4),
            sample(base + 23.0 * step, 0.35),
        ];
        let windows = group_passes(&samples, step);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].samples.len(), 3);
        assert_eq!(windows[1].samples.len(), 2);
        assert!((windows[0].duration_minutes() - 2.0).abs() < 1e-9);
        assert!((windows[0].max_elevation() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn empty_samples_make_no_windows() {
        assert!(group_passes(&[], 1.0 / 1440.0).is_empty());
    }

    #[test]
    fn report_row_layout() {
        let s = sample(2_460_385.0, 35.0 * DEG2RAD);
        let row = format_sample(&s);
        assert!(row.starts_with("2460385.0000000000"));
        assert!(row.contains("2024"));
        assert!(row.contains("35.0000"));
        let header = report_header();
        assert!(header.contains("JulianDate"));
        assert!(header.contains("Azim(deg)"));
    }

    #[test]
    fn default_config_matches_conventions() {
        let c = PredictionConfig::default();
        assert_eq!(c.start_jd, 0.0);
        assert_eq!(c.duration_days, 1.0);
        assert!((c.step_days - 1.0 / 1440.0).abs() < 1e-15);
        assert_eq!(c.elevation_mask_rad, 0.0);
    }

    #[test]
    fn site_precomputes_ecef() {
        let site = Site::from_degrees(32.656465, 110.745166, 0.0);
        let ecef = site.ecef();
        let expected = site.geodetic.to_ecef();
        assert_eq!(ecef, expected);
        // Northern hemisphere, eastern longitude.
        assert!(ecef[2] > 0.0);
        assert!(ecef[1] > 0.0);
    }
}
