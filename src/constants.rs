//! # Constants and type definitions for crtmatch
//!
//! This module centralizes the **sentinel values**, **fixed thresholds**, and **unit aliases**
//! shared by the geometry index and the matching algorithms.
//!
//! ## Overview
//!
//! - Sentinel coordinates returned by crossing-point queries when nothing was crossed
//! - Fixed detector constants (anode gap, 1-D hit threshold, DCA sampling)
//! - Unit aliases used in public signatures (cm, µs, degrees)
//!
//! Lengths are expressed in **centimeters**, times in **microseconds** and drift velocities
//! in **cm/µs** everywhere in the crate.

use nalgebra::Point3;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Length in centimeters
pub type Centimeter = f64;
/// Time in microseconds
pub type Microsecond = f64;
/// Angle in degrees
pub type Degree = f64;

// -------------------------------------------------------------------------------------------------
// Sentinels
// -------------------------------------------------------------------------------------------------

/// Coordinate used for the entry/exit points of a crossing-point scan that never
/// found a point inside the volume.
pub const SENTINEL_COORD: f64 = -99999.0;

/// Sentinel point `(-99999, -99999, -99999)`.
#[inline]
pub fn sentinel_point() -> Point3<f64> {
    Point3::new(SENTINEL_COORD, SENTINEL_COORD, SENTINEL_COORD)
}

/// Starting value of every distance-of-closest-approach minimisation.
pub const DCA_START: Centimeter = 99999.0;

/// Test whether a crossing point is the "no crossing" sentinel.
///
/// Only the X coordinate is inspected, matching how crossing points are consumed
/// by [`valid_crossing_point`](crate::geometry::crt_geometry::CrtGeometry::valid_crossing_point).
#[inline]
pub fn is_sentinel_point(point: &Point3<f64>) -> bool {
    point.x == SENTINEL_COORD
}

// -------------------------------------------------------------------------------------------------
// Detector constants
// -------------------------------------------------------------------------------------------------

/// Gap between the edge of the drift volume and the anode plane, added to the full drift
/// length when computing the allowed T0 window.
pub const ANODE_GAP: Centimeter = 3.0;

/// A CRT hit whose uncertainty on one axis exceeds this value is treated as a 1-D
/// (single strip) measurement along that axis.
pub const ONE_D_HIT_ERROR: Centimeter = 50.0;

/// Number of samples taken along the degenerate axis of a 1-D hit.
pub const DCA_SAMPLES: usize = 20;

/// Numerical epsilon used for geometric comparisons
pub const EPS: f64 = 1e-6;
