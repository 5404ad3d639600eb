//! # TPC trajectories
//!
//! A [`Trajectory`] is the ordered list of points of a reconstructed TPC track (or of a
//! simulated particle path, for the geometry crossing queries). Each point carries a local
//! direction and a validity flag; invalid points are skipped by every directional average.

use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::Centimeter;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub position: Point3<f64>,
    pub direction: Vector3<f64>,
    pub valid: bool,
}

impl TrajectoryPoint {
    pub fn new(position: Point3<f64>, direction: Vector3<f64>) -> Self {
        TrajectoryPoint {
            position,
            direction,
            valid: true,
        }
    }

    pub fn invalid(position: Point3<f64>, direction: Vector3<f64>) -> Self {
        TrajectoryPoint {
            position,
            direction,
            valid: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(points: Vec<TrajectoryPoint>) -> Self {
        Trajectory { points }
    }

    /// Build a trajectory from bare positions.
    ///
    /// Every point is valid; its direction is the unit vector toward the next point
    /// (the last point reuses the previous direction).
    pub fn from_positions(positions: &[Point3<f64>]) -> Self {
        let mut directions: Vec<Vector3<f64>> = positions
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b - a).try_normalize(0.0).unwrap_or_else(Vector3::zeros))
            .collect();
        if let Some(last) = directions.last().copied() {
            directions.push(last);
        } else if !positions.is_empty() {
            directions.push(Vector3::zeros());
        }

        Trajectory {
            points: positions
                .iter()
                .zip(directions)
                .map(|(p, d)| TrajectoryPoint::new(*p, d))
                .collect(),
        }
    }

    /// Straight trajectory from `start` to `end` sampled with `n_points` points (at least two).
    pub fn straight(start: Point3<f64>, end: Point3<f64>, n_points: usize) -> Self {
        let n = n_points.max(2);
        let positions: Vec<Point3<f64>> = (0..n)
            .map(|i| start + (end - start) * (i as f64 / (n - 1) as f64))
            .collect();
        Self::from_positions(&positions)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.points.iter().map(|p| &p.position)
    }

    pub fn valid_points(&self) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter().filter(|p| p.valid)
    }

    /// First valid point position (the track vertex).
    pub fn start(&self) -> Option<Point3<f64>> {
        self.valid_points().next().map(|p| p.position)
    }

    /// Last valid point position.
    pub fn end(&self) -> Option<Point3<f64>> {
        self.valid_points().last().map(|p| p.position)
    }

    /// Path length summed over consecutive valid points.
    pub fn length(&self) -> Centimeter {
        self.valid_points()
            .tuple_windows()
            .map(|(a, b)| nalgebra::distance(&a.position, &b.position))
            .sum()
    }

    /// Start and end positions ordered with the larger-Y endpoint first.
    pub fn top_down(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let (start, end) = (self.start()?, self.end()?);
        if start.y < end.y {
            Some((end, start))
        } else {
            Some((start, end))
        }
    }
}
