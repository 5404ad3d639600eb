//! Detector geometry: world-frame boxes, the CRT tagger/module/strip index built from a
//! detector description, and the TPC drift volumes used by the matching engines.

pub mod aabb;
pub mod crt_geometry;
pub mod detector_description;
pub mod tpc_geometry;
