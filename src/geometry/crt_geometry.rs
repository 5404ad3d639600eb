//! # CRT geometry index
//!
//! This module defines [`CrtGeometry`], the static three-level index over the Cosmic Ray
//! Tagger shell:
//!
//! ```text
//! CrtGeometry
//! ├── taggers  name → CrtTagger  (child module names)
//! ├── modules  name → CrtModule  (owning tagger name, readout plane, child strip names)
//! └── strips   name → CrtStrip   (owning module name)
//! ```
//!
//! Entities only refer to their parent and children **by name**; the three flat maps are the
//! single owners. The index is built once from a [`DetectorDescription`] and is read-only
//! afterwards, so it can be shared freely between threads processing different events.
//!
//! ## Numeric indices
//!
//! The `*_by_index` lookups follow the iteration order of the underlying ordered maps
//! (lexicographic by name). The order is stable for a given geometry but is not tied to any
//! external channel numbering.
//!
//! ## Queries
//!
//! - Containment ([`CrtGeometry::is_inside_tagger`], [`CrtGeometry::is_inside_module`],
//!   [`CrtGeometry::is_inside_strip`]) uses strict inequalities on all three axes.
//! - Crossing points average the first and last trajectory points found inside an entity.
//! - [`CrtGeometry::check_overlap`], [`CrtGeometry::has_overlap`] and
//!   [`CrtGeometry::valid_crossing_point`] decide whether a particle crossing a tagger could
//!   be localised by two perpendicular readout planes.
//!
//! ## Errors
//!
//! Lookups never fail loudly: a missing name or index yields `None` (or a zero count).
//! Only the constructor returns an error, for sensitive volumes that lack their module,
//! tagger or detector ancestors.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::constants::{is_sentinel_point, sentinel_point};
use crate::crt_errors::CrtError;
use crate::geometry::aabb::Aabb;
use crate::geometry::detector_description::{
    DetectorDescription, MODULE_LEVEL, STRIP_LEVEL, TAGGER_LEVEL,
};
use crate::trajectory::Trajectory;

/// Finest sensitive element of the CRT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtStrip {
    pub name: String,
    pub aabb: Aabb,
    /// Name of the module holding this strip.
    pub module: String,
}

/// Strip array forming one readout layer of a tagger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtModule {
    pub name: String,
    pub aabb: Aabb,
    /// Readout plane inside the tagger: 1 when the module sits on the positive side of the
    /// tagger depth axis, 0 otherwise.
    pub plane: u8,
    /// Name of the tagger holding this module.
    pub tagger: String,
    pub strips: BTreeSet<String>,
}

/// Planar CRT wall made of two perpendicular module layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtTagger {
    pub name: String,
    pub aabb: Aabb,
    pub modules: BTreeSet<String>,
}

/// Static tagger → module → strip index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrtGeometry {
    taggers: BTreeMap<String, CrtTagger>,
    modules: BTreeMap<String, CrtModule>,
    strips: BTreeMap<String, CrtStrip>,
}

impl CrtGeometry {
    /// Build the index from a detector description.
    ///
    /// Each sensitive path contributes its strip, module and tagger. Taggers and modules are
    /// registered the first time their name is met, with a box computed from their own local
    /// half-extents (not from the union of their children). The tagger box uses the full
    /// half-extent on every axis, depth included; it is not halved along the depth axis.
    /// Once every leaf is processed, a second pass attaches each module to its owning tagger.
    ///
    /// Arguments
    /// -----------------
    /// * `description`: Source of leaf-first volume paths.
    ///
    /// Return
    /// ----------
    /// * The populated index, or [`CrtError::MissingAncestor`] if a path is too short to
    ///   contain a strip, module, tagger and detector.
    ///
    /// See also
    /// ------------
    /// * [`VolumePath::world_box`](crate::geometry::detector_description::VolumePath) – corner transform and per-axis sort.
    pub fn new<D>(description: &D) -> Result<Self, CrtError>
    where
        D: DetectorDescription + ?Sized,
    {
        let mut geometry = CrtGeometry::default();

        for path in description.sensitive_paths() {
            path.validate()?;

            let tagger_name = path.node(TAGGER_LEVEL).name.clone();
            let module_name = path.node(MODULE_LEVEL).name.clone();
            let strip_name = path.node(STRIP_LEVEL).name.clone();

            if !geometry.taggers.contains_key(&tagger_name) {
                let tagger = CrtTagger {
                    name: tagger_name.clone(),
                    aabb: path.world_box(TAGGER_LEVEL),
                    modules: BTreeSet::new(),
                };
                geometry.taggers.insert(tagger_name.clone(), tagger);
            }

            if !geometry.modules.contains_key(&module_name) {
                let plane = u8::from(path.origin_in_parent(MODULE_LEVEL).z > 0.0);
                let module = CrtModule {
                    name: module_name.clone(),
                    aabb: path.world_box(MODULE_LEVEL),
                    plane,
                    tagger: tagger_name.clone(),
                    strips: BTreeSet::new(),
                };
                geometry.modules.insert(module_name.clone(), module);
            }

            if !geometry.strips.contains_key(&strip_name) {
                let strip = CrtStrip {
                    name: strip_name.clone(),
                    aabb: path.world_box(STRIP_LEVEL),
                    module: module_name.clone(),
                };
                geometry.strips.insert(strip_name.clone(), strip);
                if let Some(module) = geometry.modules.get_mut(&module_name) {
                    module.strips.insert(strip_name);
                }
            }
        }

        // Module → tagger association needs every module registered first.
        for module in geometry.modules.values() {
            if let Some(tagger) = geometry.taggers.get_mut(&module.tagger) {
                tagger.modules.insert(module.name.clone());
            }
        }

        debug!(
            taggers = geometry.taggers.len(),
            modules = geometry.modules.len(),
            strips = geometry.strips.len(),
            "CRT geometry index built"
        );

        Ok(geometry)
    }

    // ---------------------------------------------------------------------------------------------
    // Counts
    // ---------------------------------------------------------------------------------------------

    pub fn num_taggers(&self) -> usize {
        self.taggers.len()
    }

    pub fn num_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn num_modules_in_tagger(&self, tagger_name: &str) -> usize {
        self.tagger(tagger_name).map_or(0, |t| t.modules.len())
    }

    pub fn num_modules_in_tagger_index(&self, tagger_i: usize) -> usize {
        self.tagger_by_index(tagger_i).map_or(0, |t| t.modules.len())
    }

    pub fn num_strips(&self) -> usize {
        self.strips.len()
    }

    pub fn num_strips_in_module(&self, module_name: &str) -> usize {
        self.module(module_name).map_or(0, |m| m.strips.len())
    }

    pub fn num_strips_in_module_index(&self, module_i: usize) -> usize {
        self.module_by_index(module_i).map_or(0, |m| m.strips.len())
    }

    pub fn num_strips_in_tagger_module(&self, tagger_i: usize, module_i: usize) -> usize {
        self.module_in_tagger(tagger_i, module_i)
            .map_or(0, |m| m.strips.len())
    }

    // ---------------------------------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------------------------------

    pub fn tagger(&self, name: &str) -> Option<&CrtTagger> {
        self.taggers.get(name)
    }

    pub fn tagger_by_index(&self, tagger_i: usize) -> Option<&CrtTagger> {
        self.taggers.values().nth(tagger_i)
    }

    pub fn taggers(&self) -> impl Iterator<Item = &CrtTagger> {
        self.taggers.values()
    }

    pub fn module(&self, name: &str) -> Option<&CrtModule> {
        self.modules.get(name)
    }

    pub fn module_by_index(&self, module_i: usize) -> Option<&CrtModule> {
        self.modules.values().nth(module_i)
    }

    /// Module `module_i` (local index) of tagger `tagger_i`.
    pub fn module_in_tagger(&self, tagger_i: usize, module_i: usize) -> Option<&CrtModule> {
        let tagger = self.tagger_by_index(tagger_i)?;
        let name = tagger.modules.iter().nth(module_i)?;
        self.module(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &CrtModule> {
        self.modules.values()
    }

    /// Modules of a tagger, in name order.
    pub fn modules_of<'a>(&'a self, tagger: &'a CrtTagger) -> impl Iterator<Item = &'a CrtModule> {
        tagger.modules.iter().filter_map(move |name| self.module(name))
    }

    pub fn strip(&self, name: &str) -> Option<&CrtStrip> {
        self.strips.get(name)
    }

    pub fn strip_by_index(&self, strip_i: usize) -> Option<&CrtStrip> {
        self.strips.values().nth(strip_i)
    }

    /// Strip `strip_i` (local index) of the module with global index `module_i`.
    pub fn strip_in_module(&self, module_i: usize, strip_i: usize) -> Option<&CrtStrip> {
        let module = self.module_by_index(module_i)?;
        let name = module.strips.iter().nth(strip_i)?;
        self.strip(name)
    }

    /// Strip `strip_i` of module `module_i` of tagger `tagger_i` (all local indices).
    pub fn strip_in_tagger_module(
        &self,
        tagger_i: usize,
        module_i: usize,
        strip_i: usize,
    ) -> Option<&CrtStrip> {
        let module = self.module_in_tagger(tagger_i, module_i)?;
        let name = module.strips.iter().nth(strip_i)?;
        self.strip(name)
    }

    pub fn strips(&self) -> impl Iterator<Item = &CrtStrip> {
        self.strips.values()
    }

    // ---------------------------------------------------------------------------------------------
    // Containment
    // ---------------------------------------------------------------------------------------------

    /// Strict containment of `point` in a tagger; `false` for a missing tagger.
    pub fn is_inside_tagger(&self, tagger: Option<&CrtTagger>, point: &Point3<f64>) -> bool {
        tagger.is_some_and(|t| t.aabb.contains_strict(point))
    }

    pub fn is_inside_tagger_by_name(&self, tagger_name: &str, point: &Point3<f64>) -> bool {
        self.is_inside_tagger(self.tagger(tagger_name), point)
    }

    /// Strict containment of `point` in a module; `false` for a missing module.
    ///
    /// Any axis whose full width is exactly 1 is widened by 1 on both sides before testing,
    /// so that stepped simulated trajectories landing on a thin module boundary still count.
    pub fn is_inside_module(&self, module: Option<&CrtModule>, point: &Point3<f64>) -> bool {
        module.is_some_and(|m| m.aabb.widen_unit_axes().contains_strict(point))
    }

    pub fn is_inside_module_by_name(&self, module_name: &str, point: &Point3<f64>) -> bool {
        self.is_inside_module(self.module(module_name), point)
    }

    /// Strict containment of `point` in a strip; `false` for a missing strip.
    pub fn is_inside_strip(&self, strip: Option<&CrtStrip>, point: &Point3<f64>) -> bool {
        strip.is_some_and(|s| s.aabb.contains_strict(point))
    }

    pub fn is_inside_strip_by_name(&self, strip_name: &str, point: &Point3<f64>) -> bool {
        self.is_inside_strip(self.strip(strip_name), point)
    }

    // ---------------------------------------------------------------------------------------------
    // Crossing points
    // ---------------------------------------------------------------------------------------------

    /// Midpoint between the first and last trajectory points accepted by `inside`.
    ///
    /// Both points start at the sentinel `(-99999, -99999, -99999)`, so a trajectory that
    /// never enters returns the sentinel.
    fn crossing_point<F>(trajectory: &Trajectory, inside: F) -> Point3<f64>
    where
        F: Fn(&Point3<f64>) -> bool,
    {
        let mut entry = sentinel_point();
        let mut exit = sentinel_point();

        let mut first = true;
        for point in trajectory.positions().filter(|p| inside(p)) {
            if first {
                entry = *point;
                first = false;
            }
            exit = *point;
        }

        nalgebra::center(&entry, &exit)
    }

    /// Average of the entry and exit points of a trajectory in a tagger.
    ///
    /// Return
    /// ----------
    /// * The crossing point, or the sentinel point when no trajectory point is inside
    ///   (test with [`is_sentinel_point`]).
    pub fn tagger_crossing_point(&self, tagger_name: &str, trajectory: &Trajectory) -> Point3<f64> {
        let tagger = self.tagger(tagger_name);
        Self::crossing_point(trajectory, |p| self.is_inside_tagger(tagger, p))
    }

    /// Average of the entry and exit points of a trajectory in a module (sentinel if none).
    pub fn module_crossing_point(&self, module_name: &str, trajectory: &Trajectory) -> Point3<f64> {
        let module = self.module(module_name);
        Self::crossing_point(trajectory, |p| self.is_inside_module(module, p))
    }

    /// Average of the entry and exit points of a trajectory in a strip (sentinel if none).
    pub fn strip_crossing_point(&self, strip_name: &str, trajectory: &Trajectory) -> Point3<f64> {
        let strip = self.strip(strip_name);
        Self::crossing_point(trajectory, |p| self.is_inside_strip(strip, p))
    }

    // ---------------------------------------------------------------------------------------------
    // Whole-CRT volume
    // ---------------------------------------------------------------------------------------------

    /// Box enclosing every tagger, `None` for an empty geometry.
    pub fn crt_limits_aabb(&self) -> Option<Aabb> {
        self.taggers
            .values()
            .map(|t| t.aabb)
            .reduce(|acc, b| acc.union(&b))
    }

    /// Limits of the volume enclosed by the whole CRT as
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    ///
    /// An empty geometry yields `[+inf, +inf, +inf, -inf, -inf, -inf]`, which contains no point.
    pub fn crt_limits(&self) -> [f64; 6] {
        match self.crt_limits_aabb() {
            Some(b) => [b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z],
            None => [
                f64::INFINITY,
                f64::INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
            ],
        }
    }

    /// Scan a trajectory against the CRT limits.
    ///
    /// Return
    /// ----------
    /// * `(enters, start_outside, end_outside)`. A point that is outside only marks the start
    ///   (index 0) or the end (last index); the start takes precedence for a one-point trajectory.
    fn volume_scan(&self, trajectory: &Trajectory) -> (bool, bool, bool) {
        let limits = self.crt_limits();
        let n = trajectory.len();

        let mut enters = false;
        let mut start_outside = false;
        let mut end_outside = false;
        for (i, p) in trajectory.positions().enumerate() {
            if p.x > limits[0]
                && p.y > limits[1]
                && p.z > limits[2]
                && p.x < limits[3]
                && p.y < limits[4]
                && p.z < limits[5]
            {
                enters = true;
            } else if i == 0 {
                start_outside = true;
            } else if i == n - 1 {
                end_outside = true;
            }
        }
        (enters, start_outside, end_outside)
    }

    /// `true` if the trajectory has a point inside the CRT volume and starts or ends outside it.
    pub fn enters_volume(&self, trajectory: &Trajectory) -> bool {
        let (enters, start_outside, end_outside) = self.volume_scan(trajectory);
        enters && (start_outside || end_outside)
    }

    /// `true` if the trajectory starts outside, passes inside and ends outside the CRT volume.
    pub fn crosses_volume(&self, trajectory: &Trajectory) -> bool {
        let (enters, start_outside, end_outside) = self.volume_scan(trajectory);
        start_outside && enters && end_outside
    }

    // ---------------------------------------------------------------------------------------------
    // Overlaps
    // ---------------------------------------------------------------------------------------------

    /// Two-dimensional overlap test between two modules.
    ///
    /// The per-axis intersection intervals are computed and the modules overlap when any two
    /// of the three axes have a positive-length intersection. The upper X bound is
    /// `min(a.max_x, b.max_y)`, so the test is not symmetric in general.
    pub fn check_overlap(&self, module1: &CrtModule, module2: &CrtModule) -> bool {
        let a = &module1.aabb;
        let b = &module2.aabb;

        let min_x = a.min_x().max(b.min_x());
        let max_x = a.max_x().min(b.max_y());
        let min_y = a.min_y().max(b.min_y());
        let max_y = a.max_y().min(b.max_y());
        let min_z = a.min_z().max(b.min_z());
        let max_z = a.max_z().min(b.max_z());

        let x = min_x < max_x;
        let y = min_y < max_y;
        let z = min_z < max_z;
        (x && y) || (x && z) || (y && z)
    }

    /// `true` if another module of the same tagger, in the other readout plane, overlaps `module`.
    pub fn has_overlap(&self, module: &CrtModule) -> bool {
        let Some(tagger) = self.tagger(&module.tagger) else {
            return false;
        };
        self.modules_of(tagger)
            .filter(|other| other.plane != module.plane)
            .any(|other| self.check_overlap(module, other))
    }

    /// Decide whether a particle crossing a tagger could produce a localised hit there.
    ///
    /// The modules of the tagger crossed by the trajectory are collected. The crossing is valid
    /// when one of them has no overlapping partner in the other plane, or when a pair of
    /// crossed modules overlaps. The pair scan includes each module paired with itself.
    ///
    /// Arguments
    /// -----------------
    /// * `tagger_name`: Tagger to test; an unknown tagger has no modules and yields `false`.
    /// * `trajectory`: Particle path.
    ///
    /// Return
    /// ----------
    /// * `true` if the crossing can be localised, `false` otherwise.
    pub fn valid_crossing_point(&self, tagger_name: &str, trajectory: &Trajectory) -> bool {
        let Some(tagger) = self.tagger(tagger_name) else {
            return false;
        };

        let crossed: SmallVec<[&CrtModule; 4]> = self
            .modules_of(tagger)
            .filter(|m| !is_sentinel_point(&self.module_crossing_point(&m.name, trajectory)))
            .collect();
        trace!(tagger = tagger_name, crossed = crossed.len(), "crossed modules");

        for (i, module) in crossed.iter().enumerate() {
            if !self.has_overlap(module) {
                return true;
            }
            if crossed[i..]
                .iter()
                .any(|other| self.check_overlap(module, other))
            {
                return true;
            }
        }
        false
    }
}
