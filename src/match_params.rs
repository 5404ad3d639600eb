//! # CRT matching configuration
//!
//! [`CrtMatchParams`] gathers every threshold used by the hit clustering, the CRT track
//! builder and the two CRT/TPC matching engines. The host application is responsible for
//! loading it (the struct derives `serde` traits); the library only validates it.
//!
//! ## Groups of parameters
//!
//! **Hit clustering / track building**
//! - `time_limit` – single-link time gap inside one T0 group (µs).
//! - `average_hit_dist` – radius used to merge hits of the same tagger (cm).
//! - `use_top_plane` – allow top taggers to pair with side taggers.
//! - `distance_limit` – maximum hit separation for a track, and maximum DCA for a hit match (cm).
//!
//! **Hit matching**
//! - `min_track_length` – TPC trajectories shorter than this are never matched (cm).
//! - `track_direction_frac` – fraction of valid points averaged for the end directions.
//! - `t0_window_margin` – slack added on both sides of the allowed T0 window (µs).
//!
//! **Track matching**
//! - `max_angle_diff` – maximum angle between a TPC trajectory and a CRT track (degrees).
//! - `max_distance` – maximum average DCA between a TPC trajectory and a CRT track (cm).
//! - `stitch_across_cpa` – accept CRT tracks crossing either drift volume.
//!
//! ## Example
//!
//! ```rust
//! use crtmatch::match_params::CrtMatchParams;
//!
//! let params = CrtMatchParams::builder()
//!     .max_angle_diff(5.0)
//!     .use_top_plane(false)
//!     .build()
//!     .unwrap();
//! println!("{params:#}");
//! ```

use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{Centimeter, Degree, Microsecond};
use crate::crt_errors::CrtError;

/// Tunable thresholds for CRT hit clustering and CRT/TPC matching.
///
/// Default values:
///
/// * `time_limit`: 0.1 µs
/// * `average_hit_dist`: 20 cm
/// * `use_top_plane`: true
/// * `distance_limit`: 100 cm
/// * `min_track_length`: 20 cm
/// * `track_direction_frac`: 0.5
/// * `t0_window_margin`: 10 µs
/// * `max_angle_diff`: 10°
/// * `max_distance`: 50 cm
/// * `stitch_across_cpa`: false
///
/// Notes & Validation
/// -----------------
/// * Distances, times and the angle limit must be non-negative.
/// * `track_direction_frac` must lie in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtMatchParams {
    // --- Hit clustering / track building ---
    pub time_limit: Microsecond,
    pub average_hit_dist: Centimeter,
    pub use_top_plane: bool,
    pub distance_limit: Centimeter,

    // --- Hit matching ---
    pub min_track_length: Centimeter,
    pub track_direction_frac: f64,
    pub t0_window_margin: Microsecond,

    // --- Track matching ---
    pub max_angle_diff: Degree,
    pub max_distance: Centimeter,
    pub stitch_across_cpa: bool,
}

impl CrtMatchParams {
    /// Equivalent to [`CrtMatchParams::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a validated fluent builder from the default values.
    pub fn builder() -> CrtMatchParamsBuilder {
        CrtMatchParamsBuilder::new()
    }
}

impl Default for CrtMatchParams {
    fn default() -> Self {
        CrtMatchParams {
            time_limit: 0.1,
            average_hit_dist: 20.0,
            use_top_plane: true,
            distance_limit: 100.0,
            min_track_length: 20.0,
            track_direction_frac: 0.5,
            t0_window_margin: 10.0,
            max_angle_diff: 10.0,
            max_distance: 50.0,
            stitch_across_cpa: false,
        }
    }
}

/// Builder for [`CrtMatchParams`], with validation.
#[derive(Debug, Clone)]
pub struct CrtMatchParamsBuilder {
    params: CrtMatchParams,
}

impl Default for CrtMatchParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrtMatchParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: CrtMatchParams::default(),
        }
    }

    // --- Clustering / track building ---
    pub fn time_limit(mut self, v: Microsecond) -> Self {
        self.params.time_limit = v;
        self
    }
    pub fn average_hit_dist(mut self, v: Centimeter) -> Self {
        self.params.average_hit_dist = v;
        self
    }
    pub fn use_top_plane(mut self, v: bool) -> Self {
        self.params.use_top_plane = v;
        self
    }
    pub fn distance_limit(mut self, v: Centimeter) -> Self {
        self.params.distance_limit = v;
        self
    }

    // --- Hit matching ---
    pub fn min_track_length(mut self, v: Centimeter) -> Self {
        self.params.min_track_length = v;
        self
    }
    pub fn track_direction_frac(mut self, v: f64) -> Self {
        self.params.track_direction_frac = v;
        self
    }
    pub fn t0_window_margin(mut self, v: Microsecond) -> Self {
        self.params.t0_window_margin = v;
        self
    }

    // --- Track matching ---
    pub fn max_angle_diff(mut self, v: Degree) -> Self {
        self.params.max_angle_diff = v;
        self
    }
    pub fn max_distance(mut self, v: Centimeter) -> Self {
        self.params.max_distance = v;
        self
    }
    pub fn stitch_across_cpa(mut self, v: bool) -> Self {
        self.params.stitch_across_cpa = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder.
    ///
    /// Return
    /// ----------
    /// * `Ok(CrtMatchParams)` if every value is valid, or
    ///   [`CrtError::InvalidMatchParameter`] naming the first offending field.
    pub fn build(self) -> Result<CrtMatchParams, CrtError> {
        let p = &self.params;

        for (name, value) in [
            ("time_limit", p.time_limit),
            ("average_hit_dist", p.average_hit_dist),
            ("distance_limit", p.distance_limit),
            ("min_track_length", p.min_track_length),
            ("t0_window_margin", p.t0_window_margin),
            ("max_angle_diff", p.max_angle_diff),
            ("max_distance", p.max_distance),
        ] {
            if !Self::ge0(value) {
                return Err(CrtError::InvalidMatchParameter(format!(
                    "{name} must be >= 0"
                )));
            }
        }

        if !(Self::gt0(p.track_direction_frac) && p.track_direction_frac <= 1.0) {
            return Err(CrtError::InvalidMatchParameter(
                "track_direction_frac must be in (0, 1]".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for CrtMatchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "CRT Matching Parameters")?;
            writeln!(f, "-----------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Hit clustering / track building]")?;
            line!(
                "time_limit           = {:.3} us",
                self.time_limit,
                "Single-link gap inside a T0 group"
            )?;
            line!(
                "average_hit_dist     = {:.1} cm",
                self.average_hit_dist,
                "Merge radius for hits of one tagger"
            )?;
            line!(
                "use_top_plane        = {}",
                self.use_top_plane,
                "Allow top/side tagger pairs"
            )?;
            line!(
                "distance_limit       = {:.1} cm",
                self.distance_limit,
                "Max hit separation / hit DCA"
            )?;

            writeln!(f, "\n[Hit matching]")?;
            line!(
                "min_track_length     = {:.1} cm",
                self.min_track_length,
                "Shorter TPC tracks are skipped"
            )?;
            line!(
                "track_direction_frac = {:.2}",
                self.track_direction_frac,
                "Fraction of points for end directions"
            )?;
            line!(
                "t0_window_margin     = {:.1} us",
                self.t0_window_margin,
                "Slack on the allowed T0 window"
            )?;

            writeln!(f, "\n[Track matching]")?;
            line!(
                "max_angle_diff       = {:.1} deg",
                self.max_angle_diff,
                "Max angle between TPC and CRT tracks"
            )?;
            line!(
                "max_distance         = {:.1} cm",
                self.max_distance,
                "Max average DCA between tracks"
            )?;
            line!(
                "stitch_across_cpa    = {}",
                self.stitch_across_cpa,
                "Accept CRT tracks in either TPC"
            )?;

            Ok(())
        } else {
            write!(
                f,
                "CrtMatchParams(time_limit={:.3}us, average_hit_dist={:.1}cm, use_top_plane={}, distance_limit={:.1}cm, min_track_length={:.1}cm, track_direction_frac={:.2}, max_angle_diff={:.1}deg, max_distance={:.1}cm, stitch_across_cpa={})",
                self.time_limit,
                self.average_hit_dist,
                self.use_top_plane,
                self.distance_limit,
                self.min_track_length,
                self.track_direction_frac,
                self.max_angle_diff,
                self.max_distance,
                self.stitch_across_cpa,
            )
        }
    }
}
