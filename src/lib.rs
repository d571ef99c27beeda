//! # satpass
//!
//! Satellite overpass prediction from Two-Line Element sets.
//!
//! The crate parses TLEs, propagates them with the SGP4 analytic model
//! (including the SDP4 deep-space extension for periods of 225 minutes and
//! up), rotates the inertial state into the Earth-fixed frame and reports
//! when a ground station sees the satellite above its elevation mask.
//!
//! ```no_run
//! use satpass::pass::{PassPredictor, PredictionConfig, Site};
//! use satpass::tle::{parse_record, ChecksumPolicy};
//!
//! let l1 = "1 25544U 98067A   24075.50000000  .00002182  00000-0  40768-4 0  9991";
//! let l2 = "2 25544  51.6416  77.3721 0004537 150.2020 310.0000 15.50103472000003";
//! let elements = parse_record(None, l1, l2, ChecksumPolicy::Lenient).unwrap();
//!
//! let site = Site::from_degrees(32.656465, 110.745166, 0.0);
//! let config = PredictionConfig {
//!     elevation_mask_rad: 10.0_f64.to_radians(),
//!     ..PredictionConfig::default()
//! };
//! let predictor = PassPredictor::new(site, config);
//! for sample in predictor.predict(&elements).unwrap() {
//!     println!("{}", satpass::pass::format_sample(&sample));
//! }
//! ```

pub mod constants;
pub mod deep_space;
pub mod elements;
pub mod geodesy;
pub mod pass;
pub mod propagator;
pub mod sidereal;
pub mod time;
pub mod tle;

pub use constants::GravityModel;
pub use elements::MeanElements;
pub use geodesy::{Geodetic, Topocentric};
pub use pass::{PassPredictor, PredictionConfig, Site, VisibleSample};
pub use propagator::{PropagationError, Propagator, Regime};
pub use sidereal::{Frame, StateVector};
pub use tle::{ChecksumPolicy, TleError};
