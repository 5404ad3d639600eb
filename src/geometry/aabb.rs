//! Axis-aligned boxes in the world frame.
//!
//! Every CRT entity (tagger, module, strip) and every TPC drift volume is described by
//! an [`Aabb`]. A box is immutable once built and always satisfies `min ≤ max` on each
//! axis, whatever the order of the two corners it was built from.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Immutable axis-aligned bounding box, in world coordinates (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Build a box from two opposite corners given in any order.
    ///
    /// Arguments
    /// -----------------
    /// * `a`, `b`: Two opposite corners of the box.
    ///
    /// Return
    /// ----------
    /// * The box whose `min`/`max` are the per-axis minimum/maximum of the two corners.
    pub fn from_corners(a: Point3<f64>, b: Point3<f64>) -> Self {
        Aabb {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.min.x
    }
    pub fn max_x(&self) -> f64 {
        self.max.x
    }
    pub fn min_y(&self) -> f64 {
        self.min.y
    }
    pub fn max_y(&self) -> f64 {
        self.max.y
    }
    pub fn min_z(&self) -> f64 {
        self.min.z
    }
    pub fn max_z(&self) -> f64 {
        self.max.z
    }

    /// Full width of the box along each axis.
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Strict containment: the point lies inside the open box on all three axes.
    pub fn contains_strict(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| point[i] > self.min[i] && point[i] < self.max[i])
    }

    /// Smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Widen every axis whose full width is exactly one unit by one unit on each side.
    ///
    /// Module boxes with a unit-wide axis come from stepped trajectories that land on
    /// the box boundary; only an exact width of `1.0` triggers the widening.
    pub(crate) fn widen_unit_axes(&self) -> Aabb {
        let mut min = self.min;
        let mut max = self.max;
        for i in 0..3 {
            if (max[i] - min[i]).abs() == 1.0 {
                min[i] -= 1.0;
                max[i] += 1.0;
            }
        }
        Aabb { min, max }
    }

    /// Entry and exit points of the infinite line through `start` and `end`.
    ///
    /// Slab method: the line is parametrised as `start + t (end - start)` and clipped
    /// against the three pairs of planes. Axes along which the line does not move are only
    /// accepted when the line lies within that slab.
    ///
    /// Return
    /// ----------
    /// * `Some((entry, exit))`, ordered along the `start → end` direction, or `None` if the
    ///   line misses the box or `start == end`.
    pub fn line_intersection(
        &self,
        start: &Point3<f64>,
        end: &Point3<f64>,
    ) -> Option<(Point3<f64>, Point3<f64>)> {
        let dir = end - start;
        if dir.norm_squared() == 0.0 {
            return None;
        }

        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;
        for i in 0..3 {
            if dir[i] == 0.0 {
                if start[i] < self.min[i] || start[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[i] - start[i]) / dir[i];
            let t2 = (self.max[i] - start[i]) / dir[i];
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }

        if t_near > t_far {
            return None;
        }
        Some((start + dir * t_near, start + dir * t_far))
    }
}

#[cfg(test)]
mod aabb_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_corner_order_is_irrelevant() {
        let a = Point3::new(3.0, -1.0, 10.0);
        let b = Point3::new(-2.0, 4.0, -5.0);
        let box1 = Aabb::from_corners(a, b);
        let box2 = Aabb::from_corners(b, a);

        assert_eq!(box1, box2);
        for i in 0..3 {
            assert!(box1.min[i] <= box1.max[i]);
        }
        assert_eq!(box1.min, Point3::new(-2.0, -1.0, -5.0));
        assert_eq!(box1.max, Point3::new(3.0, 4.0, 10.0));
    }

    #[test]
    fn test_strict_containment() {
        let b = Aabb::from_corners(Point3::origin(), Point3::new(1.0, 2.0, 3.0));
        assert!(b.contains_strict(&Point3::new(0.5, 1.0, 1.5)));
        assert!(!b.contains_strict(&Point3::new(0.0, 1.0, 1.5)));
        assert!(!b.contains_strict(&Point3::new(0.5, 2.0, 1.5)));
    }

    #[test]
    fn test_widen_unit_axes() {
        let b = Aabb::from_corners(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 10.0, 0.5));
        let w = b.widen_unit_axes();
        assert_eq!(w.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(w.max, Point3::new(2.0, 10.0, 0.5));
    }

    #[test]
    fn test_line_intersection() {
        let b = Aabb::from_corners(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        let (entry, exit) = b
            .line_intersection(&Point3::new(-5.0, 0.0, 0.0), &Point3::new(5.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(entry, Point3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(exit, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);

        // the line extends past the segment ends
        let (entry, exit) = b
            .line_intersection(&Point3::new(0.0, 5.0, 0.5), &Point3::new(0.0, 4.0, 0.5))
            .unwrap();
        assert_relative_eq!(entry, Point3::new(0.0, 1.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(exit, Point3::new(0.0, -1.0, 0.5), epsilon = 1e-12);

        assert!(b
            .line_intersection(&Point3::new(-5.0, 3.0, 0.0), &Point3::new(5.0, 3.0, 0.0))
            .is_none());
        assert!(b
            .line_intersection(&Point3::new(0.0, 0.0, 0.0), &Point3::new(0.0, 0.0, 0.0))
            .is_none());
    }
}
