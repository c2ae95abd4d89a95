//! Parallel-array triangle mesh.

use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// One face corner: a mandatory vertex index plus optional uv/normal indices.
///
/// `None` means the attribute is absent for this corner, never "unknown".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceCorner {
    pub vertex: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceCorner {
    pub fn position_only(vertex: usize) -> Self {
        Self {
            vertex,
            uv: None,
            normal: None,
        }
    }

    pub fn with_uv(vertex: usize, uv: usize) -> Self {
        Self {
            vertex,
            uv: Some(uv),
            normal: None,
        }
    }
}

/// Structural errors raised by mesh edits.
///
/// Dangling attribute indices are structurally impossible after an edit; a
/// [`MeshError::DanglingIndex`] from [`Mesh::validate`] indicates an
/// implementation bug, not bad input.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("mask length {got} does not match {field} length {expected}")]
    MaskLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{field} index {index} out of range (len {len})")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },
    #[error("face {face} corner {corner}: dangling {field} index {index} (len {len})")]
    DanglingIndex {
        face: usize,
        corner: usize,
        field: &'static str,
        index: usize,
        len: usize,
    },
}

/// Indexed triangle mesh with flat attribute arenas.
///
/// Faces hold indices into the arenas, never owning references. The mesh is
/// exclusively owned by the calling stage and mutated in place.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[FaceCorner; 3]>,
    pub uv_coords: Vec<Point2<f64>>,
    pub normals: Vec<Vector3<f64>>,
    /// Per-face material id; empty when the mesh carries no materials.
    pub material_ids: Vec<u32>,
}

impl Mesh {
    /// Twice-area cross product over the face's vertex positions, halved.
    pub fn face_area(&self, face: usize) -> f64 {
        let [c0, c1, c2] = self.faces[face];
        let v0 = self.vertices[c0.vertex];
        let v1 = self.vertices[c1.vertex];
        let v2 = self.vertices[c2.vertex];
        0.5 * (v1 - v0).cross(&(v2 - v0)).norm()
    }

    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len()).map(|f| self.face_area(f)).sum()
    }

    /// Verify every index invariant. Intended for tests and debugging; any
    /// failure after an edit is an implementation bug.
    pub fn validate(&self) -> Result<(), MeshError> {
        if !self.material_ids.is_empty() && self.material_ids.len() != self.faces.len() {
            return Err(MeshError::MaskLength {
                field: "material_ids",
                expected: self.faces.len(),
                got: self.material_ids.len(),
            });
        }
        for (fi, face) in self.faces.iter().enumerate() {
            for (ci, corner) in face.iter().enumerate() {
                if corner.vertex >= self.vertices.len() {
                    return Err(MeshError::DanglingIndex {
                        face: fi,
                        corner: ci,
                        field: "vertex",
                        index: corner.vertex,
                        len: self.vertices.len(),
                    });
                }
                if let Some(uv) = corner.uv {
                    if uv >= self.uv_coords.len() {
                        return Err(MeshError::DanglingIndex {
                            face: fi,
                            corner: ci,
                            field: "uv",
                            index: uv,
                            len: self.uv_coords.len(),
                        });
                    }
                }
                if let Some(n) = corner.normal {
                    if n >= self.normals.len() {
                        return Err(MeshError::DanglingIndex {
                            face: fi,
                            corner: ci,
                            field: "normal",
                            index: n,
                            len: self.normals.len(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply a homogeneous transform to every vertex. Normals are rotated
    /// by the upper-left 3x3 block and renormalized, which is exact for the
    /// uniform-scale transforms this pipeline produces.
    pub fn transform(&mut self, m: &Matrix4<f64>) {
        for v in &mut self.vertices {
            *v = m.transform_point(v);
        }
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        for n in &mut self.normals {
            let rotated = r * *n;
            let norm = rotated.norm();
            if norm > 0.0 {
                *n = rotated / norm;
            }
        }
    }

    /// Area-weighted per-vertex normals. Replaces the normal arena with one
    /// entry per vertex and points every corner at its vertex's normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut acc = vec![Vector3::zeros(); self.vertices.len()];
        for face in &self.faces {
            let v0 = self.vertices[face[0].vertex];
            let v1 = self.vertices[face[1].vertex];
            let v2 = self.vertices[face[2].vertex];
            // Cross product magnitude carries the area weighting.
            let fn_unscaled = (v1 - v0).cross(&(v2 - v0));
            for corner in face {
                acc[corner.vertex] += fn_unscaled;
            }
        }
        self.normals = acc
            .into_iter()
            .map(|n| {
                let norm = n.norm();
                if norm > 0.0 {
                    n / norm
                } else {
                    Vector3::zeros()
                }
            })
            .collect();
        for face in &mut self.faces {
            for corner in face.iter_mut() {
                corner.normal = Some(corner.vertex);
            }
        }
    }
}
