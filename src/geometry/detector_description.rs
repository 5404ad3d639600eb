//! # Detector description input
//!
//! The geometry index does not load a detector description itself; it consumes an already
//! resolved hierarchy of boxes. For each sensitive leaf volume (a CRT strip) the description
//! provides the chain of its ancestors, leaf first:
//!
//! ```text
//! index 0  strip      (sensitive leaf)
//! index 1  module     (strip array)
//! index 2  tagger
//! index 3  detector   (CRT enclosure)
//! index 4… outer volumes up to the world (optional)
//! ```
//!
//! Each [`GeoVolume`] carries its local half-extents and its local-to-parent rigid transform.
//! Composing the transforms from a node up to the end of the path gives that node's
//! local-to-world transform.

use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::crt_errors::CrtError;
use crate::geometry::aabb::Aabb;

/// Minimum number of nodes a sensitive path must carry (strip, module, tagger, detector).
pub const MIN_PATH_DEPTH: usize = 4;

pub const STRIP_LEVEL: usize = 0;
pub const MODULE_LEVEL: usize = 1;
pub const TAGGER_LEVEL: usize = 2;

/// One box-shaped volume of the detector hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoVolume {
    pub name: String,
    /// Half-widths of the box along its local axes (cm).
    pub half_extents: Vector3<f64>,
    /// Placement of this volume inside its parent.
    pub local_to_parent: Isometry3<f64>,
}

impl GeoVolume {
    pub fn new(
        name: impl Into<String>,
        half_extents: Vector3<f64>,
        local_to_parent: Isometry3<f64>,
    ) -> Self {
        GeoVolume {
            name: name.into(),
            half_extents,
            local_to_parent,
        }
    }

    /// Volume whose placement is a pure translation of its parent frame.
    pub fn translated(
        name: impl Into<String>,
        half_extents: Vector3<f64>,
        offset: Vector3<f64>,
    ) -> Self {
        Self::new(name, half_extents, Isometry3::translation(offset.x, offset.y, offset.z))
    }
}

/// Leaf-first chain of volumes from a sensitive strip up to the outermost volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePath {
    pub nodes: Vec<GeoVolume>,
}

impl VolumePath {
    pub fn new(nodes: Vec<GeoVolume>) -> Self {
        VolumePath { nodes }
    }

    /// Check that the path reaches at least the detector enclosure.
    pub(crate) fn validate(&self) -> Result<(), CrtError> {
        if self.nodes.len() < MIN_PATH_DEPTH {
            return Err(CrtError::MissingAncestor {
                leaf: self
                    .nodes
                    .first()
                    .map(|n| n.name.clone())
                    .unwrap_or_default(),
                depth: self.nodes.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn node(&self, level: usize) -> &GeoVolume {
        &self.nodes[level]
    }

    /// Local-to-world transform of the node at `level`.
    pub(crate) fn local_to_world(&self, level: usize) -> Isometry3<f64> {
        self.nodes[level..]
            .iter()
            .rev()
            .fold(Isometry3::identity(), |acc, node| acc * node.local_to_parent)
    }

    /// World-frame box of the node at `level`.
    ///
    /// The two opposite local corners `±half_extents` are moved to the world frame and
    /// sorted per axis.
    pub(crate) fn world_box(&self, level: usize) -> Aabb {
        let node = self.node(level);
        let to_world = self.local_to_world(level);
        let h = node.half_extents;
        let corner = to_world.transform_point(&Point3::from(h));
        let opposite = to_world.transform_point(&Point3::from(-h));
        Aabb::from_corners(corner, opposite)
    }

    /// Origin of the node at `level` expressed in its parent frame.
    pub(crate) fn origin_in_parent(&self, level: usize) -> Point3<f64> {
        self.node(level)
            .local_to_parent
            .transform_point(&Point3::origin())
    }
}

/// Source of sensitive-volume paths consumed by
/// [`CrtGeometry::new`](crate::geometry::crt_geometry::CrtGeometry::new).
pub trait DetectorDescription {
    fn sensitive_paths(&self) -> Vec<VolumePath>;
}

impl DetectorDescription for Vec<VolumePath> {
    fn sensitive_paths(&self) -> Vec<VolumePath> {
        self.clone()
    }
}

impl DetectorDescription for [VolumePath] {
    fn sensitive_paths(&self) -> Vec<VolumePath> {
        self.to_vec()
    }
}

#[cfg(test)]
mod detector_description_test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn world_node() -> GeoVolume {
        GeoVolume::translated("world", Vector3::new(1e4, 1e4, 1e4), Vector3::zeros())
    }

    #[test]
    fn test_short_path_is_rejected() {
        let path = VolumePath::new(vec![
            GeoVolume::translated("strip_0", Vector3::new(1.0, 1.0, 1.0), Vector3::zeros()),
            GeoVolume::translated("module_0", Vector3::new(1.0, 1.0, 1.0), Vector3::zeros()),
        ]);
        assert_eq!(
            path.validate(),
            Err(CrtError::MissingAncestor {
                leaf: "strip_0".into(),
                depth: 2
            })
        );
        assert_eq!(
            path.validate().unwrap_err().to_string(),
            "Sensitive volume 'strip_0' has a path of only 2 nodes (strip, module, tagger and detector are required)"
        );
    }

    #[test]
    fn test_world_box_composes_translations() {
        let path = VolumePath::new(vec![
            GeoVolume::translated("strip", Vector3::new(1.0, 2.0, 3.0), Vector3::new(1.0, 0.0, 0.0)),
            GeoVolume::translated("module", Vector3::new(5.0, 5.0, 5.0), Vector3::new(0.0, 10.0, 0.0)),
            GeoVolume::translated("tagger", Vector3::new(50.0, 50.0, 50.0), Vector3::new(0.0, 0.0, 100.0)),
            GeoVolume::translated("det", Vector3::new(500.0, 500.0, 500.0), Vector3::new(-1.0, 0.0, 0.0)),
            world_node(),
        ]);
        assert!(path.validate().is_ok());

        let strip = path.world_box(STRIP_LEVEL);
        assert_relative_eq!(strip.min, Point3::new(-1.0, 8.0, 97.0), epsilon = 1e-12);
        assert_relative_eq!(strip.max, Point3::new(1.0, 12.0, 103.0), epsilon = 1e-12);
        assert_eq!(path.origin_in_parent(MODULE_LEVEL), Point3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn test_world_box_sorts_rotated_corners() {
        // a quarter turn around Y swaps the local X and Z extents and flips their signs
        let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        let path = VolumePath::new(vec![
            GeoVolume::translated("strip", Vector3::new(1.0, 1.0, 1.0), Vector3::zeros()),
            GeoVolume::translated("module", Vector3::new(1.0, 1.0, 1.0), Vector3::zeros()),
            GeoVolume::new(
                "tagger",
                Vector3::new(10.0, 2.0, 1.0),
                Isometry3::from_parts(Vector3::new(0.0, 0.0, 0.0).into(), rot),
            ),
            world_node(),
        ]);

        let tagger = path.world_box(TAGGER_LEVEL);
        assert_relative_eq!(tagger.min, Point3::new(-1.0, -2.0, -10.0), epsilon = 1e-12);
        assert_relative_eq!(tagger.max, Point3::new(1.0, 2.0, 10.0), epsilon = 1e-12);
    }
}
