//! # T0 from single CRT hits
//!
//! A TPC trajectory only measures positions relative to an unknown interaction time (T0):
//! every X coordinate is shifted by `T0 · v_drift` toward the anode of its drift volume.
//! [`CrtT0Matcher`] resolves that ambiguity with single CRT hits.
//!
//! ## Algorithm
//!
//! 1. [`CrtT0Matcher::track_t0_range`] computes the T0 window that keeps the whole trajectory
//!    inside its drift volume (between the cathode and 3 cm beyond the anode).
//! 2. Every CRT hit whose time lies inside that window (widened by
//!    [`t0_window_margin`](crate::match_params::CrtMatchParams::t0_window_margin)) is taken as a
//!    T0 hypothesis: the trajectory is shifted accordingly and extrapolated from both ends
//!    along the averaged end directions ([`CrtT0Matcher::track_direction_average`]).
//! 3. The hit with the smallest distance of closest approach wins
//!    ([`CrtT0Matcher::closest_crt_hit`]) and is accepted when that distance is below
//!    [`distance_limit`](crate::match_params::CrtMatchParams::distance_limit)
//!    ([`CrtT0Matcher::t0_from_crt_hits`]).
//!
//! ## One-dimensional hits
//!
//! A hit produced by a single strip has one coordinate known only to within the strip length.
//! The distance of closest approach then scans 20 points across that uncertainty and keeps the
//! minimum (see [`CrtT0Matcher::distance_of_closest_approach`]).

use nalgebra::{Point3, Vector3};
use tracing::{debug, trace};

use crate::constants::{Centimeter, Microsecond, DCA_SAMPLES, DCA_START};
use crate::crt_hit::{point_line_distance, CrtHit};
use crate::geometry::tpc_geometry::{TpcGeometry, TpcSide};
use crate::match_params::CrtMatchParams;
use crate::trajectory::Trajectory;

/// Accepted CRT hit match for a TPC trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrtHitMatch {
    /// Index of the matched hit in the slice given to the matcher.
    pub hit_index: usize,
    /// Distance of closest approach between the shifted trajectory and the hit (cm).
    pub dca: Centimeter,
    /// Trajectory T0, the time of the matched hit (µs).
    pub t0: Microsecond,
}

/// Matches TPC trajectories to single CRT hits.
#[derive(Debug, Clone)]
pub struct CrtT0Matcher {
    tpc: TpcGeometry,
    params: CrtMatchParams,
}

impl CrtT0Matcher {
    pub fn new(tpc: TpcGeometry, params: CrtMatchParams) -> Self {
        CrtT0Matcher { tpc, params }
    }

    pub fn params(&self) -> &CrtMatchParams {
        &self.params
    }

    pub fn tpc_geometry(&self) -> &TpcGeometry {
        &self.tpc
    }

    /// Allowed T0 window of a trajectory.
    ///
    /// Arguments
    /// -----------------
    /// * `start_x`, `end_x`: Reconstructed X of the trajectory endpoints (cm).
    /// * `side`: Drift volume of the trajectory.
    ///
    /// Return
    /// ----------
    /// * `(t0_min, t0_max)` in µs.
    ///
    /// See also
    /// ------------
    /// * [`TpcGeometry::t0_range`] – window definition.
    pub fn track_t0_range(
        &self,
        start_x: Centimeter,
        end_x: Centimeter,
        side: TpcSide,
    ) -> (Microsecond, Microsecond) {
        self.tpc.t0_range(start_x, end_x, side)
    }

    /// Distance of closest approach between a CRT hit and the line through a trajectory point.
    ///
    /// The point is first shifted in X by the drift distance implied by `t0`. When the hit has
    /// an uncertainty above 50 cm along an axis (checked in X, Y, Z order), 20 positions are
    /// sampled along that axis at `pos + ((i + 1) / 10 − 1) · err` and the smallest distance is
    /// kept. Otherwise the nominal hit position is used.
    ///
    /// Arguments
    /// -----------------
    /// * `position`: Trajectory point (unshifted).
    /// * `direction`: Direction of the line through `position`; must be non-zero.
    /// * `hit`: CRT hit.
    /// * `side`: Drift volume of the trajectory.
    /// * `t0`: T0 hypothesis (µs).
    ///
    /// Return
    /// ----------
    /// * The minimum distance (cm). A zero direction gives NaN, which never wins a comparison
    ///   so the result stays at 99999.
    pub fn distance_of_closest_approach(
        &self,
        position: &Point3<f64>,
        direction: &Vector3<f64>,
        hit: &CrtHit,
        side: TpcSide,
        t0: Microsecond,
    ) -> Centimeter {
        let mut a = *position;
        a.x += self.tpc.drift_shift(side, t0);
        let b = a + direction;

        let dca = |p: &Point3<f64>| point_line_distance(p, &a, &b);

        match hit.degenerate_axis() {
            Some(axis) => (0..DCA_SAMPLES)
                .map(|i| {
                    let mut p = hit.position;
                    p[axis] += ((i as f64 + 1.0) / 10.0 - 1.0) * hit.error[axis];
                    dca(&p)
                })
                .fold(DCA_START, |min, d| if d < min { d } else { min }),
            None => {
                let d = dca(&hit.position);
                if d < DCA_START {
                    d
                } else {
                    DCA_START
                }
            }
        }
    }

    /// Average direction at both ends of a trajectory.
    ///
    /// Only valid points are used. With `n = floor(n_valid · frac)`, the start direction is
    /// minus the mean of the first `n` directions (pointing out of the trajectory) and the end
    /// direction is the mean of the last `n`.
    ///
    /// Return
    /// ----------
    /// * `(start_dir, end_dir)`, not normalised. Both are NaN when `n == 0`.
    pub fn track_direction_average(
        &self,
        trajectory: &Trajectory,
        frac: f64,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let directions: Vec<Vector3<f64>> =
            trajectory.valid_points().map(|p| p.direction).collect();
        let n = (directions.len() as f64 * frac).floor() as usize;
        let n = n.min(directions.len());

        let start_sum: Vector3<f64> = directions[..n].iter().sum();
        let end_sum: Vector3<f64> = directions[directions.len() - n..].iter().sum();
        (-start_sum / n as f64, end_sum / n as f64)
    }

    /// Closest admissible CRT hit to a trajectory.
    ///
    /// Arguments
    /// -----------------
    /// * `trajectory`: TPC trajectory; without valid points nothing is admissible.
    /// * `hits`: Candidate CRT hits.
    /// * `side`: Drift volume of the trajectory.
    ///
    /// Return
    /// ----------
    /// * `Some((hit_index, dca))` for the smallest distance of closest approach, computed at
    ///   both trajectory ends with the hit time as T0, or `None` if no hit time lies within the
    ///   allowed T0 window.
    ///
    /// See also
    /// ------------
    /// * [`CrtT0Matcher::track_t0_range`] – allowed T0 window.
    /// * [`CrtT0Matcher::track_direction_average`] – end directions.
    pub fn closest_crt_hit(
        &self,
        trajectory: &Trajectory,
        hits: &[CrtHit],
        side: TpcSide,
    ) -> Option<(usize, Centimeter)> {
        let (start, end) = (trajectory.start()?, trajectory.end()?);
        let (t0_min, t0_max) = self.track_t0_range(start.x, end.x, side);
        let margin = self.params.t0_window_margin;
        let (start_dir, end_dir) =
            self.track_direction_average(trajectory, self.params.track_direction_frac);

        let mut best: Option<(usize, Centimeter)> = None;
        for (i, hit) in hits.iter().enumerate() {
            if !(hit.time >= t0_min - margin && hit.time <= t0_max + margin) {
                continue;
            }
            let start_dca =
                self.distance_of_closest_approach(&start, &start_dir, hit, side, hit.time);
            let end_dca = self.distance_of_closest_approach(&end, &end_dir, hit, side, hit.time);
            let dca = start_dca.min(end_dca);
            trace!(hit = i, time = hit.time, dca, "CRT hit candidate");

            if best.map_or(true, |(_, min)| dca < min) {
                best = Some((i, dca));
            }
        }
        best
    }

    /// T0 of a trajectory from the closest CRT hit.
    ///
    /// Return
    /// ----------
    /// * `None` when the trajectory is shorter than `min_track_length`, when no hit is
    ///   admissible, or when the best distance is not below `distance_limit`.
    pub fn t0_from_crt_hits(
        &self,
        trajectory: &Trajectory,
        hits: &[CrtHit],
        side: TpcSide,
    ) -> Option<CrtHitMatch> {
        let length = trajectory.length();
        if length < self.params.min_track_length {
            debug!(length, "trajectory too short for CRT hit matching");
            return None;
        }

        let (hit_index, dca) = self.closest_crt_hit(trajectory, hits, side)?;
        if dca < self.params.distance_limit {
            debug!(hit_index, dca, t0 = hits[hit_index].time, "CRT hit matched");
            Some(CrtHitMatch {
                hit_index,
                dca,
                t0: hits[hit_index].time,
            })
        } else {
            debug!(hit_index, dca, "closest CRT hit beyond distance limit");
            None
        }
    }
}
