//! Edge-adjacency connected components over mesh faces.

use std::collections::{HashMap, VecDeque};

use crate::mesh::{Mesh, MeshError};

/// One face cluster with its accumulated triangle area.
#[derive(Clone, Debug)]
pub struct FaceCluster {
    pub area: f64,
    pub faces: Vec<usize>,
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Map from each unordered vertex-pair edge to the faces sharing it.
fn build_edge_map(mesh: &Mesh) -> HashMap<(usize, usize), Vec<usize>> {
    let mut edges: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (fi, face) in mesh.faces.iter().enumerate() {
        let [a, b, c] = [face[0].vertex, face[1].vertex, face[2].vertex];
        for (u, v) in [(a, b), (b, c), (c, a)] {
            edges.entry(edge_key(u, v)).or_default().push(fi);
        }
    }
    edges
}

/// Cluster faces by edge adjacency.
///
/// Returns the face-to-cluster-id map and the per-cluster metrics. Cluster
/// ids are assigned in BFS discovery order; every face belongs to exactly
/// one cluster. Must be rebuilt after any topology change.
pub fn cluster_connected_components(mesh: &Mesh) -> (Vec<usize>, Vec<FaceCluster>) {
    log::debug!("clustering {} faces by edge adjacency", mesh.faces.len());
    let edge_map = build_edge_map(mesh);

    let mut face_cluster = vec![usize::MAX; mesh.faces.len()];
    let mut clusters = Vec::new();

    for seed in 0..mesh.faces.len() {
        if face_cluster[seed] != usize::MAX {
            continue;
        }
        let cluster_id = clusters.len();
        let mut members = Vec::new();
        let mut area = 0.0;

        let mut queue = VecDeque::from([seed]);
        face_cluster[seed] = cluster_id;
        while let Some(face) = queue.pop_front() {
            members.push(face);
            area += mesh.face_area(face);

            let [a, b, c] = [
                mesh.faces[face][0].vertex,
                mesh.faces[face][1].vertex,
                mesh.faces[face][2].vertex,
            ];
            for (u, v) in [(a, b), (b, c), (c, a)] {
                for &neighbor in &edge_map[&edge_key(u, v)] {
                    if face_cluster[neighbor] == usize::MAX {
                        face_cluster[neighbor] = cluster_id;
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        clusters.push(FaceCluster {
            area,
            faces: members,
        });
    }

    log::debug!("found {} connected components", clusters.len());
    (face_cluster, clusters)
}

fn keep_clusters(
    mesh: &mut Mesh,
    face_cluster: &[usize],
    keep: impl Fn(usize) -> bool,
    filter_vertices: bool,
) -> Result<(), MeshError> {
    let mask: Vec<bool> = face_cluster.iter().map(|&c| keep(c)).collect();
    mesh.keep_faces_by_mask(&mask)?;
    if filter_vertices {
        mesh.remove_unreferenced_vertices()?;
    }
    Ok(())
}

/// Retain only the cluster with the largest surface area.
///
/// Idempotent: re-running on the result is a no-op.
pub fn keep_largest_connected_component(
    mesh: &mut Mesh,
    filter_vertices: bool,
) -> Result<(), MeshError> {
    let (face_cluster, clusters) = cluster_connected_components(mesh);
    let Some(largest) = clusters
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.area.total_cmp(&b.area))
        .map(|(id, _)| id)
    else {
        return Ok(());
    };
    log::info!(
        "keeping largest component: {} of {} faces",
        clusters[largest].faces.len(),
        mesh.faces.len()
    );
    keep_clusters(mesh, &face_cluster, |c| c == largest, filter_vertices)
}

/// Retain only clusters with at least `min_faces` member faces.
pub fn remove_components_smaller_than(
    mesh: &mut Mesh,
    min_faces: usize,
    filter_vertices: bool,
) -> Result<(), MeshError> {
    let (face_cluster, clusters) = cluster_connected_components(mesh);
    let kept = clusters
        .iter()
        .filter(|c| c.faces.len() >= min_faces)
        .count();
    log::info!(
        "keeping {kept} of {} components with >= {min_faces} faces",
        clusters.len()
    );
    keep_clusters(
        mesh,
        &face_cluster,
        |c| clusters[c].faces.len() >= min_faces,
        filter_vertices,
    )
}
