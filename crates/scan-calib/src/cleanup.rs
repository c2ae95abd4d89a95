//! Mesh cleanup: ground-plane removal and small-component filtering.

use scan_calib_mesh::{
    keep_largest_connected_component, remove_components_smaller_than, segment_plane, Mesh,
    MeshError, PlaneRansacParams,
};

/// Remove the dominant plane and everything disconnected from the scan.
///
/// Segments the largest planar consensus set over the mesh vertices,
/// removes those vertices together with their faces, then keeps only the
/// largest remaining connected component. Returns `false` without
/// mutating the mesh when no plane hypothesis reaches consensus.
pub fn remove_ground_plane(mesh: &mut Mesh, params: &PlaneRansacParams) -> Result<bool, MeshError> {
    let Some(result) = segment_plane(&mesh.vertices, params) else {
        log::warn!("no ground plane found, mesh left unchanged");
        return Ok(false);
    };
    log::info!(
        "ground plane: {} inliers (fitness {:.3}, rmse {:.5})",
        result.inliers.len(),
        result.fitness,
        result.inlier_rmse
    );
    mesh.remove_vertices_by_index(&result.inliers)?;
    keep_largest_connected_component(mesh, true)?;
    Ok(true)
}

/// Drop every connected component with fewer than `min_faces` faces.
///
/// Unreferenced vertices and attributes are compacted away.
pub fn filter_small_components(mesh: &mut Mesh, min_faces: usize) -> Result<(), MeshError> {
    remove_components_smaller_than(mesh, min_faces, true)
}
