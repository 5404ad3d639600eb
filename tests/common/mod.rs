#![allow(dead_code)]

use crtmatch::crt_hit::{CrtHit, CrtTrack};
use crtmatch::geometry::crt_geometry::CrtGeometry;
use crtmatch::geometry::detector_description::{GeoVolume, VolumePath};
use crtmatch::trajectory::Trajectory;
use nalgebra::{Point3, Vector3};

pub fn world() -> GeoVolume {
    GeoVolume::translated("volWorld", Vector3::new(1e4, 1e4, 1e4), Vector3::zeros())
}

pub fn detector() -> GeoVolume {
    GeoVolume::translated("volCRT", Vector3::new(2e3, 2e3, 2e3), Vector3::zeros())
}

/// Path of a single-strip module of `tagger`, the strip filling the module.
fn module_path(
    tagger: &GeoVolume,
    module_name: &str,
    module_half: Vector3<f64>,
    module_offset: Vector3<f64>,
) -> VolumePath {
    let module = GeoVolume::translated(module_name, module_half, module_offset);
    let strip = GeoVolume::translated(format!("{module_name}_strip_0"), module_half, Vector3::zeros());
    VolumePath::new(vec![strip, module, tagger.clone(), detector(), world()])
}

/// Tagger centred at `center` whose two modules form a cross in the XY plane.
///
/// ```text
///        y
///        ^     module_1 (plane 1): x in [-1, 1], y in [-3, 3], z in [0.25, 0.75]
///     +--+--+
///  +--+  |  +--+
///  |  +--+--+  |  module_0 (plane 0): x in [-3, 3], y in [-1, 1], z in [-0.75, -0.25]
///  +--+  |  +--+
///     +--+--+   -> x
/// ```
///
/// The tagger itself spans `[-4, 4] x [-4, 4] x [-2, 2]` around its centre.
pub fn cross_tagger_paths(name: &str, center: Vector3<f64>) -> Vec<VolumePath> {
    let tagger = GeoVolume::translated(name, Vector3::new(4.0, 4.0, 2.0), center);
    vec![
        module_path(
            &tagger,
            &format!("{name}_module_0"),
            Vector3::new(3.0, 1.0, 0.25),
            Vector3::new(0.0, 0.0, -0.5),
        ),
        module_path(
            &tagger,
            &format!("{name}_module_1"),
            Vector3::new(1.0, 3.0, 0.25),
            Vector3::new(0.0, 0.0, 0.5),
        ),
    ]
}

/// Tagger whose only module is exactly one unit thick along Z (`z in [0, 1]` around the
/// tagger centre).
pub fn unit_module_tagger_paths(name: &str, center: Vector3<f64>) -> Vec<VolumePath> {
    let tagger = GeoVolume::translated(name, Vector3::new(4.0, 4.0, 2.0), center);
    vec![module_path(
        &tagger,
        &format!("{name}_module_0"),
        Vector3::new(2.0, 2.0, 0.5),
        Vector3::new(0.0, 0.0, 0.5),
    )]
}

/// Three cross taggers stacked along Y: a top wall, a side wall at the origin and a bottom wall.
pub fn toy_crt_paths() -> Vec<VolumePath> {
    let mut paths = cross_tagger_paths("volTaggerTopHigh_0", Vector3::new(0.0, 300.0, 0.0));
    paths.extend(cross_tagger_paths("volTaggerSouth_0", Vector3::zeros()));
    paths.extend(cross_tagger_paths("volTaggerBot_0", Vector3::new(0.0, -300.0, 0.0)));
    paths
}

pub fn toy_crt() -> CrtGeometry {
    CrtGeometry::new(&toy_crt_paths()).unwrap()
}

/// Straight trajectory parallel to Z through `(x, y)`.
pub fn z_line(x: f64, y: f64, z_from: f64, z_to: f64, n_points: usize) -> Trajectory {
    Trajectory::straight(Point3::new(x, y, z_from), Point3::new(x, y, z_to), n_points)
}

/// Straight vertical trajectory at `(x, z)` from `y_top` down to `y_bottom`.
pub fn vertical_trajectory(x: f64, z: f64, y_top: f64, y_bottom: f64, n_points: usize) -> Trajectory {
    Trajectory::straight(Point3::new(x, y_top, z), Point3::new(x, y_bottom, z), n_points)
}

pub fn crt_hit(position: Point3<f64>, time: f64, tagger: &str) -> CrtHit {
    CrtHit::new(position, Vector3::new(1.0, 1.0, 1.0), time, tagger)
}

/// CRT track through `anchor` along the unit `direction`, with endpoints `half_length` away
/// on both sides (the start has the larger Y for a downward direction).
pub fn crt_track_through(
    anchor: Point3<f64>,
    direction: Vector3<f64>,
    half_length: f64,
    time: f64,
) -> CrtTrack {
    let d = direction.normalize();
    CrtTrack::from_points(
        anchor - d * half_length,
        anchor + d * half_length,
        time,
        ("volTaggerTopHigh_0".to_string(), "volTaggerBot_0".to_string()),
    )
}
