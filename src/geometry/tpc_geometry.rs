//! TPC drift volumes and drift properties.
//!
//! The active volume is made of two drift volumes sharing a central cathode at `x = 0`.
//! Charge drifts toward negative X in the first one and toward positive X in the second,
//! each anode sitting at `x = ∓2·half_width`.
//!
//! ```text
//!   anode            cathode            anode
//!   x=-2w              x=0               x=+2w
//!     |  <-- drift --   |   -- drift -->   |
//!     |   Negative      |     Positive     |
//! ```

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::constants::{Centimeter, Microsecond, ANODE_GAP};
use crate::crt_errors::CrtError;
use crate::geometry::aabb::Aabb;

/// Drift side of a TPC trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TpcSide {
    /// Drift toward negative X (TPC 0).
    Negative,
    /// Drift toward positive X (TPC 1).
    Positive,
}

impl TpcSide {
    pub fn index(&self) -> usize {
        match self {
            TpcSide::Negative => 0,
            TpcSide::Positive => 1,
        }
    }

    /// Sign applied to the X shift implied by a T0 hypothesis.
    pub fn shift_sign(&self) -> f64 {
        match self {
            TpcSide::Negative => -1.0,
            TpcSide::Positive => 1.0,
        }
    }

    pub fn other(&self) -> TpcSide {
        match self {
            TpcSide::Negative => TpcSide::Positive,
            TpcSide::Positive => TpcSide::Negative,
        }
    }
}

impl TryFrom<usize> for TpcSide {
    type Error = CrtError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TpcSide::Negative),
            1 => Ok(TpcSide::Positive),
            _ => Err(CrtError::InvalidTpcGeometry(format!(
                "unknown TPC index {value}"
            ))),
        }
    }
}

/// Geometry of the two drift volumes plus the drift velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpcGeometry {
    /// Half of the drift length of one TPC (cm).
    pub half_width: Centimeter,
    /// Half height along Y (cm), the volume spans `[-half_height, half_height]`.
    pub half_height: Centimeter,
    /// Length along Z (cm), the volume spans `[0, length]`.
    pub length: Centimeter,
    /// Drift velocity (cm/µs).
    pub drift_velocity: f64,
    tpcs: [Aabb; 2],
}

impl TpcGeometry {
    /// Build the two drift volumes.
    ///
    /// Arguments
    /// -----------------
    /// * `half_width`: Half drift length of a single TPC (cm).
    /// * `half_height`: Half height of the active volume (cm).
    /// * `length`: Length of the active volume along Z (cm).
    /// * `drift_velocity`: Electron drift velocity (cm/µs).
    ///
    /// Return
    /// ----------
    /// * The geometry, or [`CrtError::InvalidTpcGeometry`] when a dimension or the drift
    ///   velocity is not strictly positive.
    pub fn new(
        half_width: Centimeter,
        half_height: Centimeter,
        length: Centimeter,
        drift_velocity: f64,
    ) -> Result<Self, CrtError> {
        for (name, value) in [
            ("half_width", half_width),
            ("half_height", half_height),
            ("length", length),
            ("drift_velocity", drift_velocity),
        ] {
            if !(value > 0.0) {
                return Err(CrtError::InvalidTpcGeometry(format!(
                    "{name} must be > 0 (got {value})"
                )));
            }
        }

        Ok(TpcGeometry {
            half_width,
            half_height,
            length,
            drift_velocity,
            tpcs: drift_volumes(half_width, half_height, length),
        })
    }

    pub fn tpc(&self, side: TpcSide) -> &Aabb {
        &self.tpcs[side.index()]
    }

    pub fn tpcs(&self) -> &[Aabb; 2] {
        &self.tpcs
    }

    /// Box enclosing both drift volumes.
    pub fn active_volume(&self) -> Aabb {
        self.tpcs[0].union(&self.tpcs[1])
    }

    /// X coordinate of the anode plane of a drift volume.
    pub fn anode_x(&self, side: TpcSide) -> Centimeter {
        side.shift_sign() * 2.0 * self.half_width
    }

    /// Signed X shift of reconstructed positions implied by a T0 hypothesis.
    pub fn drift_shift(&self, side: TpcSide, t0: Microsecond) -> Centimeter {
        side.shift_sign() * t0 * self.drift_velocity
    }

    /// Allowed T0 window of a trajectory with reconstructed endpoint X coordinates.
    ///
    /// The trajectory may be shifted toward its anode until the point nearest to the anode
    /// lies 3 cm past the anode plane, and toward the cathode until the point nearest to
    /// the cathode reaches `x = 0`.
    ///
    /// Return
    /// ----------
    /// * `(t0_min, t0_max)` in µs.
    pub fn t0_range(
        &self,
        start_x: Centimeter,
        end_x: Centimeter,
        side: TpcSide,
    ) -> (Microsecond, Microsecond) {
        let vd = self.drift_velocity;
        let anode = 2.0 * self.half_width + ANODE_GAP;
        let low_x = start_x.min(end_x);
        let high_x = start_x.max(end_x);

        match side {
            TpcSide::Negative => {
                let xmax = -high_x;
                let xmin = -anode - low_x;
                (-xmax / vd, -xmin / vd)
            }
            TpcSide::Positive => {
                let xmin = -low_x;
                let xmax = anode - high_x;
                (xmin / vd, xmax / vd)
            }
        }
    }
}

impl Default for TpcGeometry {
    /// Two 2 m drift volumes, 4 m high and 5 m long, drift velocity 0.16 cm/µs.
    fn default() -> Self {
        TpcGeometry {
            half_width: 100.0,
            half_height: 200.0,
            length: 500.0,
            drift_velocity: 0.16,
            tpcs: drift_volumes(100.0, 200.0, 500.0),
        }
    }
}

fn drift_volumes(half_width: f64, half_height: f64, length: f64) -> [Aabb; 2] {
    let full = 2.0 * half_width;
    [
        Aabb::from_corners(
            Point3::new(-full, -half_height, 0.0),
            Point3::new(0.0, half_height, length),
        ),
        Aabb::from_corners(
            Point3::new(0.0, -half_height, 0.0),
            Point3::new(full, half_height, length),
        ),
    ]
}

#[cfg(test)]
mod tpc_geometry_test {
    use super::*;

    #[test]
    fn test_tpc_boxes() {
        let geo = TpcGeometry::new(100.0, 200.0, 500.0, 0.16).unwrap();
        assert_eq!(geo.tpc(TpcSide::Negative).min, Point3::new(-200.0, -200.0, 0.0));
        assert_eq!(geo.tpc(TpcSide::Negative).max, Point3::new(0.0, 200.0, 500.0));
        assert_eq!(geo.tpc(TpcSide::Positive).max, Point3::new(200.0, 200.0, 500.0));
        assert_eq!(geo.active_volume().min.x, -200.0);
        assert_eq!(geo.anode_x(TpcSide::Negative), -200.0);
        assert_eq!(geo.anode_x(TpcSide::Positive), 200.0);
        assert_eq!(geo, TpcGeometry::default());
    }

    #[test]
    fn test_invalid_geometry() {
        assert_eq!(
            TpcGeometry::new(100.0, 200.0, 500.0, 0.0),
            Err(CrtError::InvalidTpcGeometry(
                "drift_velocity must be > 0 (got 0)".into()
            ))
        );
        assert!(TpcGeometry::new(f64::NAN, 200.0, 500.0, 0.16).is_err());
        assert!(TpcSide::try_from(2).is_err());
        assert_eq!(TpcSide::try_from(1).unwrap(), TpcSide::Positive);
    }

    #[test]
    fn test_drift_shift_sign() {
        let geo = TpcGeometry::default();
        assert_eq!(geo.drift_shift(TpcSide::Positive, 100.0), 16.0);
        assert_eq!(geo.drift_shift(TpcSide::Negative, 100.0), -16.0);
    }
}
