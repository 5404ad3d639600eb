//! # T0 from CRT tracks
//!
//! [`CrtTrackMatcher`] matches a TPC trajectory to a straight [`CrtTrack`] built from two CRT
//! hits. A CRT track gives both a time and a direction, so a match is scored on two quantities:
//!
//! - the **angle** between the trajectory and the CRT track, both oriented downward;
//! - the **average distance of closest approach** between the trajectory endpoints, shifted by
//!   the drift distance implied by the CRT track time, and the CRT track line.
//!
//! ## Candidate selection
//!
//! A CRT track is a candidate for a trajectory when its time lies in the trajectory's allowed
//! T0 window (see [`TpcGeometry::t0_range`]) widened by
//! [`t0_window_margin`](crate::match_params::CrtMatchParams::t0_window_margin), and when its
//! line crosses the drift volume of the trajectory (or either drift volume with
//! [`stitch_across_cpa`](crate::match_params::CrtMatchParams::stitch_across_cpa)).
//!
//! ## Selection strategies
//!
//! | Method                                          | Minimises | Window on the other metric     |
//! |-------------------------------------------------|-----------|--------------------------------|
//! | [`CrtTrackMatcher::closest_crt_track_by_angle`] | angle     | DCA in `[min_dca, max_distance)` |
//! | [`CrtTrackMatcher::closest_crt_track_by_dca`]   | DCA       | angle in `[min_angle, max_angle_diff)` |
//!
//! [`CrtTrackMatcher::get_matched_crt_track_id`] and [`CrtTrackMatcher::t0_from_crt_tracks`]
//! use the angle strategy and additionally require the angle to be below `max_angle_diff`.

use nalgebra::Point3;
use tracing::{debug, trace};

use crate::constants::{Centimeter, Degree, Microsecond, EPS};
use crate::crt_hit::{point_line_distance, CrtTrack};
use crate::geometry::aabb::Aabb;
use crate::geometry::tpc_geometry::{TpcGeometry, TpcSide};
use crate::match_params::CrtMatchParams;
use crate::trajectory::Trajectory;

/// Best CRT track found for a TPC trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrtTrackMatch {
    /// Index of the CRT track in the slice given to the matcher.
    pub track_index: usize,
    /// Angle between the trajectory and the CRT track (degrees).
    pub angle: Degree,
    /// Average distance of closest approach at the CRT track time (cm).
    pub dca: Centimeter,
    /// Time of the CRT track (µs).
    pub t0: Microsecond,
}

/// Matches TPC trajectories to CRT tracks.
#[derive(Debug, Clone)]
pub struct CrtTrackMatcher {
    tpc: TpcGeometry,
    params: CrtMatchParams,
}

impl CrtTrackMatcher {
    pub fn new(tpc: TpcGeometry, params: CrtMatchParams) -> Self {
        CrtTrackMatcher { tpc, params }
    }

    pub fn params(&self) -> &CrtMatchParams {
        &self.params
    }

    /// Entry and exit points of the CRT track line in a drift volume.
    pub fn tpc_intersection(
        &self,
        tpc: &Aabb,
        track: &CrtTrack,
    ) -> Option<(Point3<f64>, Point3<f64>)> {
        tpc.line_intersection(&track.start, &track.end)
    }

    /// `true` if the CRT track line crosses any drift volume.
    pub fn crosses_tpc(&self, track: &CrtTrack) -> bool {
        self.tpc
            .tpcs()
            .iter()
            .any(|tpc| self.tpc_intersection(tpc, track).is_some())
    }

    /// `true` if the CRT track line enters or leaves a drift volume through its anode face.
    pub fn crosses_apa(&self, track: &CrtTrack) -> bool {
        [TpcSide::Negative, TpcSide::Positive].into_iter().any(|side| {
            let anode_x = self.tpc.anode_x(side);
            let tolerance = EPS * anode_x.abs().max(1.0);
            self.tpc_intersection(self.tpc.tpc(side), track)
                .is_some_and(|(entry, exit)| {
                    (entry.x - anode_x).abs() < tolerance || (exit.x - anode_x).abs() < tolerance
                })
        })
    }

    /// Angle between a trajectory and a CRT track, in degrees.
    ///
    /// Both are oriented from their larger-Y endpoint to their smaller-Y endpoint before the
    /// angle is taken, so the result lies in `[0, 180]`. NaN for a trajectory without valid
    /// points.
    pub fn angle_between_tracks(&self, trajectory: &Trajectory, track: &CrtTrack) -> Degree {
        let Some((tpc_top, tpc_bottom)) = trajectory.top_down() else {
            return f64::NAN;
        };
        let (crt_top, crt_bottom) = track.top_down();

        let tpc_dir = tpc_top - tpc_bottom;
        let crt_dir = crt_top - crt_bottom;
        tpc_dir.angle(&crt_dir).to_degrees()
    }

    /// Mean distance of the X-shifted trajectory endpoints to the CRT track line.
    ///
    /// Arguments
    /// -----------------
    /// * `trajectory`: TPC trajectory.
    /// * `track`: CRT track.
    /// * `shift`: Signed X shift applied to both trajectory endpoints (cm).
    ///
    /// Return
    /// ----------
    /// * The average distance (cm), NaN for a trajectory without valid points.
    pub fn ave_dca_between_tracks(
        &self,
        trajectory: &Trajectory,
        track: &CrtTrack,
        shift: Centimeter,
    ) -> Centimeter {
        let (Some(mut start), Some(mut end)) = (trajectory.start(), trajectory.end()) else {
            return f64::NAN;
        };
        start.x += shift;
        end.x += shift;

        let start_dca = point_line_distance(&start, &track.start, &track.end);
        let end_dca = point_line_distance(&end, &track.start, &track.end);
        0.5 * (start_dca + end_dca)
    }

    /// [`CrtTrackMatcher::ave_dca_between_tracks`] with the shift implied by `t0`.
    pub fn ave_dca_at_t0(
        &self,
        trajectory: &Trajectory,
        track: &CrtTrack,
        side: TpcSide,
        t0: Microsecond,
    ) -> Centimeter {
        self.ave_dca_between_tracks(trajectory, track, self.tpc.drift_shift(side, t0))
    }

    /// Indices of the CRT tracks compatible in time and space with a trajectory.
    ///
    /// Return
    /// ----------
    /// * The indices, in input order, of the tracks whose time lies in the allowed T0 window
    ///   (± `t0_window_margin`) and whose line crosses the trajectory drift volume (or either
    ///   drift volume with `stitch_across_cpa`). Empty for a trajectory without valid points.
    pub fn all_possible_crt_tracks(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
    ) -> Vec<usize> {
        let (Some(start), Some(end)) = (trajectory.start(), trajectory.end()) else {
            return Vec::new();
        };
        let (t0_min, t0_max) = self.tpc.t0_range(start.x, end.x, side);
        let margin = self.params.t0_window_margin;

        tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.time >= t0_min - margin && track.time <= t0_max + margin)
            .filter(|(_, track)| {
                if self.params.stitch_across_cpa {
                    self.crosses_tpc(track)
                } else {
                    self.tpc_intersection(self.tpc.tpc(side), track).is_some()
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Score every candidate CRT track of a trajectory.
    fn candidates(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
    ) -> Vec<CrtTrackMatch> {
        self.all_possible_crt_tracks(trajectory, tracks, side)
            .into_iter()
            .map(|i| {
                let track = &tracks[i];
                let candidate = CrtTrackMatch {
                    track_index: i,
                    angle: self.angle_between_tracks(trajectory, track),
                    dca: self.ave_dca_at_t0(trajectory, track, side, track.time),
                    t0: track.time,
                };
                trace!(
                    track = i,
                    angle = candidate.angle,
                    dca = candidate.dca,
                    "CRT track candidate"
                );
                candidate
            })
            .collect()
    }

    /// Candidate with the smallest angle among those with an average DCA in
    /// `[min_dca, max_distance)`.
    ///
    /// Arguments
    /// -----------------
    /// * `trajectory`: TPC trajectory.
    /// * `tracks`: Candidate CRT tracks.
    /// * `side`: Drift volume of the trajectory.
    /// * `min_dca`: Lower bound on the average DCA (cm), 0 to keep every candidate.
    pub fn closest_crt_track_by_angle(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
        min_dca: Centimeter,
    ) -> Option<CrtTrackMatch> {
        self.candidates(trajectory, tracks, side)
            .into_iter()
            .filter(|c| c.dca >= min_dca && c.dca < self.params.max_distance)
            .fold(None, |best: Option<CrtTrackMatch>, c| match best {
                Some(b) if !(c.angle < b.angle) => Some(b),
                _ => Some(c),
            })
    }

    /// Candidate with the smallest average DCA among those with an angle in
    /// `[min_angle, max_angle_diff)`, `min_angle` in degrees (0 keeps every candidate).
    pub fn closest_crt_track_by_dca(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
        min_angle: Degree,
    ) -> Option<CrtTrackMatch> {
        self.candidates(trajectory, tracks, side)
            .into_iter()
            .filter(|c| c.angle >= min_angle && c.angle < self.params.max_angle_diff)
            .fold(None, |best: Option<CrtTrackMatch>, c| match best {
                Some(b) if !(c.dca < b.dca) => Some(b),
                _ => Some(c),
            })
    }

    fn accepted_match(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
    ) -> Option<CrtTrackMatch> {
        let best = self.closest_crt_track_by_angle(trajectory, tracks, side, 0.0)?;
        if best.angle < self.params.max_angle_diff {
            debug!(
                track = best.track_index,
                angle = best.angle,
                dca = best.dca,
                "CRT track matched"
            );
            Some(best)
        } else {
            debug!(
                track = best.track_index,
                angle = best.angle,
                "closest CRT track beyond angle limit"
            );
            None
        }
    }

    /// Index of the CRT track matched to a trajectory, if any.
    ///
    /// See also
    /// ------------
    /// * [`CrtTrackMatcher::closest_crt_track_by_angle`] – candidate ranking.
    pub fn get_matched_crt_track_id(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
    ) -> Option<usize> {
        self.accepted_match(trajectory, tracks, side)
            .map(|m| m.track_index)
    }

    /// T0 of a trajectory from the matched CRT track, if any.
    pub fn t0_from_crt_tracks(
        &self,
        trajectory: &Trajectory,
        tracks: &[CrtTrack],
        side: TpcSide,
    ) -> Option<Microsecond> {
        self.accepted_match(trajectory, tracks, side).map(|m| m.t0)
    }
}
