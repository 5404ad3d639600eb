//! # CRT hits and candidate CRT tracks
//!
//! A [`CrtHit`] is a reconstructed crossing point in one tagger: a position with per-axis
//! uncertainty, a time, and the tagger (optionally strip) it was recorded in. Hits produced
//! by a single strip measure only one coordinate; the other coordinate along the strip is
//! carried as a large uncertainty (see [`ONE_D_HIT_ERROR`](crate::constants::ONE_D_HIT_ERROR)).
//!
//! A [`CrtTrack`] is a straight two-hit track hypothesis formed by the
//! [`track_builder`](crate::track_builder) from hits of two different taggers.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{Centimeter, Microsecond, ONE_D_HIT_ERROR};

/// One reconstructed CRT hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtHit {
    /// Hit position in world coordinates (cm).
    pub position: Point3<f64>,
    /// Per-axis half-width of the position uncertainty (cm).
    pub error: Vector3<f64>,
    /// Hit time (µs).
    pub time: Microsecond,
    /// Name of the tagger that recorded the hit.
    pub tagger: String,
    /// Name of the strip, when the hit comes from a single strip.
    pub strip: Option<String>,
}

impl CrtHit {
    pub fn new(
        position: Point3<f64>,
        error: Vector3<f64>,
        time: Microsecond,
        tagger: impl Into<String>,
    ) -> Self {
        CrtHit {
            position,
            error,
            time,
            tagger: tagger.into(),
            strip: None,
        }
    }

    pub fn with_strip(mut self, strip: impl Into<String>) -> Self {
        self.strip = Some(strip.into());
        self
    }

    /// Index of the first axis (X, then Y, then Z) whose uncertainty marks the hit as a
    /// 1-D strip measurement, if any.
    pub fn degenerate_axis(&self) -> Option<usize> {
        (0..3).find(|&i| self.error[i] > ONE_D_HIT_ERROR)
    }

    pub fn distance_to(&self, other: &CrtHit) -> Centimeter {
        nalgebra::distance(&self.position, &other.position)
    }
}

/// Straight-line track built from two CRT hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtTrack {
    pub start: Point3<f64>,
    pub start_error: Vector3<f64>,
    pub end: Point3<f64>,
    pub end_error: Vector3<f64>,
    /// Track time, the mean of the two hit times (µs).
    pub time: Microsecond,
    /// Time of the first hit (µs).
    pub start_time: Microsecond,
    /// Time of the second hit (µs).
    pub end_time: Microsecond,
    pub taggers: (String, String),
    /// `true` when both endpoints are measured (two-hit tracks always are).
    pub complete: bool,
}

impl CrtTrack {
    /// Build a track from its two hits.
    ///
    /// The first hit becomes the track start; the track time is the mean of the two hit times.
    pub fn from_hits(first: &CrtHit, second: &CrtHit) -> Self {
        CrtTrack {
            start: first.position,
            start_error: first.error,
            end: second.position,
            end_error: second.error,
            time: 0.5 * (first.time + second.time),
            start_time: first.time,
            end_time: second.time,
            taggers: (first.tagger.clone(), second.tagger.clone()),
            complete: true,
        }
    }

    /// Build a track directly from its endpoints and time.
    pub fn from_points(
        start: Point3<f64>,
        end: Point3<f64>,
        time: Microsecond,
        taggers: (String, String),
    ) -> Self {
        CrtTrack {
            start,
            start_error: Vector3::zeros(),
            end,
            end_error: Vector3::zeros(),
            time,
            start_time: time,
            end_time: time,
            taggers,
            complete: true,
        }
    }

    /// Unnormalised direction `end - start`.
    pub fn direction(&self) -> Vector3<f64> {
        self.end - self.start
    }

    pub fn length(&self) -> Centimeter {
        self.direction().norm()
    }

    /// Endpoints ordered with the larger-Y endpoint first.
    pub fn top_down(&self) -> (Point3<f64>, Point3<f64>) {
        if self.start.y < self.end.y {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }

    /// Perpendicular distance from `point` to the infinite line through the track.
    pub fn distance_to_line(&self, point: &Point3<f64>) -> Centimeter {
        point_line_distance(point, &self.start, &self.end)
    }
}

/// Distance from `point` to the infinite line through `a` and `b`.
///
/// `|(p - a) × (p - b)| / |b - a|`; NaN when `a == b`.
pub fn point_line_distance(point: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Centimeter {
    let numerator = (point - a).cross(&(point - b)).norm();
    numerator / (b - a).norm()
}

#[cfg(test)]
mod crt_hit_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degenerate_axis_precedence() {
        let mut hit = CrtHit::new(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), 0.0, "volTaggerTopHigh_0");
        assert_eq!(hit.degenerate_axis(), None);

        hit.error = Vector3::new(1.0, 80.0, 1.0);
        assert_eq!(hit.degenerate_axis(), Some(1));

        hit.error = Vector3::new(1.0, 80.0, 90.0);
        assert_eq!(hit.degenerate_axis(), Some(1));

        hit.error = Vector3::new(60.0, 80.0, 90.0);
        assert_eq!(hit.degenerate_axis(), Some(0));

        hit.error = Vector3::new(1.0, 50.0, 50.1);
        assert_eq!(hit.degenerate_axis(), Some(2));
    }

    #[test]
    fn test_track_from_hits() {
        let a = CrtHit::new(Point3::new(0.0, 300.0, 10.0), Vector3::new(2.0, 1.0, 2.0), 10.0, "volTaggerTopHigh_0");
        let b = CrtHit::new(Point3::new(0.0, -300.0, 10.0), Vector3::new(2.0, 1.0, 2.0), 10.2, "volTaggerBot_0");
        let track = CrtTrack::from_hits(&a, &b);

        assert_relative_eq!(track.time, 10.1, epsilon = 1e-12);
        assert_eq!(track.length(), 600.0);
        assert_eq!(track.direction(), Vector3::new(0.0, -600.0, 0.0));
        assert_eq!(track.top_down().0, a.position);
        assert_eq!(
            track.taggers,
            ("volTaggerTopHigh_0".to_string(), "volTaggerBot_0".to_string())
        );
    }

    #[test]
    fn test_point_line_distance() {
        let d = point_line_distance(
            &Point3::new(3.0, 4.0, 0.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        );
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }
}
