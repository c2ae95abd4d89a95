//! Indexed triangle mesh store with the structural operations the scan
//! cleanup and calibration stages need:
//!
//! - parallel-array mesh with optional per-corner uv/normal indices,
//! - index-preserving face and vertex removal with attribute compaction,
//! - edge-adjacency connected components ranked by surface area,
//! - seedable RANSAC plane segmentation,
//! - oriented bounding box estimation,
//! - a UV-to-3D locator over the UV-mapped surface.

mod components;
mod edit;
mod mesh;
mod obb;
mod plane;
mod uv;

pub use components::{
    cluster_connected_components, keep_largest_connected_component,
    remove_components_smaller_than, FaceCluster,
};
pub use mesh::{FaceCorner, Mesh, MeshError};
pub use obb::{compute_obb, Obb};
pub use plane::{segment_plane, Plane, PlaneRansacParams, PlaneRansacResult};
pub use uv::UvLocator;
