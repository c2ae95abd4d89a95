//! Structural mesh edits with attribute compaction.
//!
//! Every edit computes its full replacement state before committing, so a
//! failed precondition leaves the mesh untouched. Surviving corners are
//! rewritten through old-to-new tables; an absent (`None`) attribute index
//! stays absent.

use crate::mesh::{FaceCorner, Mesh, MeshError};

/// Compact an attribute arena down to the referenced entries.
///
/// Returns the surviving entries (in ascending old-index order) and an
/// old-to-new lookup table.
fn compact_arena<T: Clone>(
    arena: &[T],
    referenced: impl Iterator<Item = usize>,
) -> (Vec<T>, Vec<Option<usize>>) {
    let mut used = vec![false; arena.len()];
    for idx in referenced {
        used[idx] = true;
    }
    let mut lut = vec![None; arena.len()];
    let mut kept = Vec::new();
    for (old, flag) in used.iter().enumerate() {
        if *flag {
            lut[old] = Some(kept.len());
            kept.push(arena[old].clone());
        }
    }
    (kept, lut)
}

impl Mesh {
    /// Keep exactly the faces selected by `mask`.
    ///
    /// Material ids are pruned in lockstep; uv and normal arenas are
    /// compacted to the entries the surviving faces reference, and every
    /// surviving corner is rewritten through the rebuilt index tables.
    pub fn keep_faces_by_mask(&mut self, mask: &[bool]) -> Result<(), MeshError> {
        if mask.len() != self.faces.len() {
            return Err(MeshError::MaskLength {
                field: "faces",
                expected: self.faces.len(),
                got: mask.len(),
            });
        }

        let mut faces: Vec<[FaceCorner; 3]> = self
            .faces
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(f, _)| *f)
            .collect();

        let material_ids = if self.material_ids.is_empty() {
            Vec::new()
        } else {
            self.material_ids
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(id, _)| *id)
                .collect()
        };

        let (uv_coords, uv_lut) = compact_arena(
            &self.uv_coords,
            faces.iter().flatten().filter_map(|c| c.uv),
        );
        let (normals, normal_lut) = compact_arena(
            &self.normals,
            faces.iter().flatten().filter_map(|c| c.normal),
        );

        for face in &mut faces {
            for corner in face.iter_mut() {
                corner.uv = corner.uv.map(|old| {
                    uv_lut[old].expect("every surviving uv index was marked referenced")
                });
                corner.normal = corner.normal.map(|old| {
                    normal_lut[old].expect("every surviving normal index was marked referenced")
                });
            }
        }

        self.faces = faces;
        self.material_ids = material_ids;
        self.uv_coords = uv_coords;
        self.normals = normals;
        Ok(())
    }

    /// Keep exactly the vertices selected by `mask`.
    ///
    /// Faces referencing a removed vertex are dropped first (cascading the
    /// uv/normal compaction), then surviving faces' vertex indices are
    /// rewritten through the vertex old-to-new table.
    pub fn keep_vertices_by_mask(&mut self, mask: &[bool]) -> Result<(), MeshError> {
        if mask.len() != self.vertices.len() {
            return Err(MeshError::MaskLength {
                field: "vertices",
                expected: self.vertices.len(),
                got: mask.len(),
            });
        }

        let face_mask: Vec<bool> = self
            .faces
            .iter()
            .map(|f| f.iter().all(|c| mask[c.vertex]))
            .collect();
        self.keep_faces_by_mask(&face_mask)?;

        let mut lut = vec![None; mask.len()];
        let mut kept = Vec::new();
        for (old, keep) in mask.iter().enumerate() {
            if *keep {
                lut[old] = Some(kept.len());
                kept.push(self.vertices[old]);
            }
        }
        self.vertices = kept;
        for face in &mut self.faces {
            for corner in face.iter_mut() {
                corner.vertex =
                    lut[corner.vertex].expect("faces touching removed vertices were dropped");
            }
        }
        Ok(())
    }

    /// Remove the vertices at `indices` (duplicates allowed).
    pub fn remove_vertices_by_index(&mut self, indices: &[usize]) -> Result<(), MeshError> {
        let mut mask = vec![true; self.vertices.len()];
        for &idx in indices {
            if idx >= self.vertices.len() {
                return Err(MeshError::IndexOutOfRange {
                    field: "vertices",
                    index: idx,
                    len: self.vertices.len(),
                });
            }
            mask[idx] = false;
        }
        self.keep_vertices_by_mask(&mask)
    }

    /// Drop vertices no face references.
    pub fn remove_unreferenced_vertices(&mut self) -> Result<(), MeshError> {
        let mut mask = vec![false; self.vertices.len()];
        for face in &self.faces {
            for corner in face {
                mask[corner.vertex] = true;
            }
        }
        self.keep_vertices_by_mask(&mask)
    }

    /// Drop faces with a repeated vertex index. Returns the removed count.
    pub fn remove_degenerate_faces(&mut self) -> Result<usize, MeshError> {
        let before = self.faces.len();
        let mask: Vec<bool> = self
            .faces
            .iter()
            .map(|f| {
                let [a, b, c] = [f[0].vertex, f[1].vertex, f[2].vertex];
                a != b && b != c && c != a
            })
            .collect();
        self.keep_faces_by_mask(&mask)?;
        let removed = before - self.faces.len();
        if removed > 0 {
            log::debug!("removed {removed} degenerate faces");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3, Vector3};

    /// Two triangles sharing an edge, full uv/normal/material attribution.
    fn quad_mesh() -> Mesh {
        let corner = |v, uv, n| FaceCorner {
            vertex: v,
            uv: Some(uv),
            normal: Some(n),
        };
        Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![
                [corner(0, 0, 0), corner(1, 1, 0), corner(2, 2, 0)],
                [corner(0, 0, 1), corner(2, 2, 1), corner(3, 3, 1)],
            ],
            uv_coords: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            normals: vec![Vector3::z(), Vector3::z()],
            material_ids: vec![5, 9],
        }
    }

    #[test]
    fn face_mask_compacts_uvs_and_materials() {
        let mut mesh = quad_mesh();
        mesh.keep_faces_by_mask(&[false, true]).unwrap();

        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.material_ids, vec![9]);
        // uv 1 was only referenced by the dropped face
        assert_eq!(mesh.uv_coords.len(), 3);
        assert_eq!(mesh.normals.len(), 1);
        mesh.validate().unwrap();

        // compaction closure: every surviving arena entry is referenced
        let mut uv_used = vec![false; mesh.uv_coords.len()];
        let mut n_used = vec![false; mesh.normals.len()];
        for face in &mesh.faces {
            for c in face {
                uv_used[c.uv.unwrap()] = true;
                n_used[c.normal.unwrap()] = true;
            }
        }
        assert!(uv_used.into_iter().all(|u| u));
        assert!(n_used.into_iter().all(|u| u));
    }

    #[test]
    fn face_mask_preserves_absent_attributes() {
        let mut mesh = quad_mesh();
        mesh.faces[1][0].uv = None;
        mesh.keep_faces_by_mask(&[false, true]).unwrap();
        assert_eq!(mesh.faces[0][0].uv, None);
        mesh.validate().unwrap();
    }

    #[test]
    fn vertex_removal_cascades_to_faces() {
        let mut mesh = quad_mesh();
        mesh.remove_vertices_by_index(&[1]).unwrap();

        // Only the second triangle survives, with remapped vertex indices.
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.faces.len(), 1);
        let verts: Vec<usize> = mesh.faces[0].iter().map(|c| c.vertex).collect();
        assert_eq!(verts, vec![0, 1, 2]);
        assert_eq!(mesh.material_ids, vec![9]);
        mesh.validate().unwrap();
    }

    #[test]
    fn unreferenced_vertices_are_compacted() {
        let mut mesh = quad_mesh();
        mesh.vertices.push(Point3::new(9.0, 9.0, 9.0));
        mesh.remove_unreferenced_vertices().unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        mesh.validate().unwrap();
    }

    #[test]
    fn degenerate_faces_are_dropped() {
        let mut mesh = quad_mesh();
        mesh.faces[0][1].vertex = 0;
        let removed = mesh.remove_degenerate_faces().unwrap();
        assert_eq!(removed, 1);
        assert!(mesh
            .faces
            .iter()
            .all(|f| f[0].vertex != f[1].vertex
                && f[1].vertex != f[2].vertex
                && f[2].vertex != f[0].vertex));
        mesh.validate().unwrap();
    }

    #[test]
    fn bad_mask_length_leaves_mesh_untouched() {
        let mut mesh = quad_mesh();
        let err = mesh.keep_faces_by_mask(&[true]).unwrap_err();
        assert!(matches!(err, MeshError::MaskLength { field: "faces", .. }));
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.uv_coords.len(), 4);
    }
}
