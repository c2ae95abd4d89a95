//! UV-space point lookup: map a texture coordinate to the 3D surface point.

use nalgebra::{Point2, Point3, Vector2};

use crate::mesh::Mesh;

const MIN_GRID_RES: usize = 8;
const MAX_GRID_RES: usize = 256;
const BARY_TOL: f64 = -1e-9;

/// Uniform-grid acceleration structure over a mesh's UV triangles.
///
/// Built once per mesh; faces are binned into every grid cell their UV
/// bounding box overlaps. Invalidated by any change to the mesh topology
/// or UV coordinates.
#[derive(Clone, Debug)]
pub struct UvLocator {
    min: Vector2<f64>,
    cell: Vector2<f64>,
    res: usize,
    bins: Vec<Vec<usize>>,
}

impl UvLocator {
    /// Build the grid from the mesh's UV-mapped faces.
    ///
    /// Returns `None` when no face carries a full set of UV coordinates.
    pub fn build(mesh: &Mesh) -> Option<Self> {
        let mut min = Vector2::repeat(f64::INFINITY);
        let mut max = Vector2::repeat(f64::NEG_INFINITY);
        let mut uv_faces = 0usize;
        for face in &mesh.faces {
            let Some([a, b, c]) = face_uvs(mesh, face) else {
                continue;
            };
            uv_faces += 1;
            for p in [a, b, c] {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
            }
        }
        if uv_faces == 0 {
            return None;
        }

        let res = ((uv_faces as f64).sqrt().ceil() as usize).clamp(MIN_GRID_RES, MAX_GRID_RES);
        let span = max - min;
        let cell = Vector2::new(
            (span.x / res as f64).max(f64::MIN_POSITIVE),
            (span.y / res as f64).max(f64::MIN_POSITIVE),
        );

        let mut locator = Self {
            min,
            cell,
            res,
            bins: vec![Vec::new(); res * res],
        };
        for (fi, face) in mesh.faces.iter().enumerate() {
            let Some([a, b, c]) = face_uvs(mesh, face) else {
                continue;
            };
            let lo_x = a.x.min(b.x).min(c.x);
            let lo_y = a.y.min(b.y).min(c.y);
            let hi_x = a.x.max(b.x).max(c.x);
            let hi_y = a.y.max(b.y).max(c.y);
            let (ci0, cj0) = locator.cell_of(lo_x, lo_y);
            let (ci1, cj1) = locator.cell_of(hi_x, hi_y);
            for cj in cj0..=cj1 {
                for ci in ci0..=ci1 {
                    locator.bins[cj * res + ci].push(fi);
                }
            }
        }
        log::debug!("uv locator: {uv_faces} faces over a {res}x{res} grid");
        Some(locator)
    }

    fn cell_of(&self, u: f64, v: f64) -> (usize, usize) {
        let ci = ((u - self.min.x) / self.cell.x).floor();
        let cj = ((v - self.min.y) / self.cell.y).floor();
        (
            (ci.max(0.0) as usize).min(self.res - 1),
            (cj.max(0.0) as usize).min(self.res - 1),
        )
    }

    /// Locate the 3D surface point mapped to `uv`.
    ///
    /// The containing triangle is found in UV space and its vertex
    /// positions are interpolated barycentrically. Returns `None` for
    /// coordinates outside every UV triangle.
    pub fn lookup(&self, uv: Point2<f64>, mesh: &Mesh) -> Option<Point3<f64>> {
        let (ci, cj) = self.cell_of(uv.x, uv.y);
        for &fi in self.bins.get(cj * self.res + ci)? {
            let face = mesh.faces.get(fi)?;
            let [a, b, c] = face_uvs(mesh, face)?;
            let Some((wa, wb, wc)) = barycentric(&uv, &a, &b, &c) else {
                continue;
            };
            if wa >= BARY_TOL && wb >= BARY_TOL && wc >= BARY_TOL {
                let pa = mesh.vertices.get(face[0].vertex)?;
                let pb = mesh.vertices.get(face[1].vertex)?;
                let pc = mesh.vertices.get(face[2].vertex)?;
                return Some(Point3::from(
                    pa.coords * wa + pb.coords * wb + pc.coords * wc,
                ));
            }
        }
        None
    }
}

fn face_uvs(mesh: &Mesh, face: &[crate::mesh::FaceCorner; 3]) -> Option<[Point2<f64>; 3]> {
    let mut uvs = [Point2::origin(); 3];
    for (slot, corner) in uvs.iter_mut().zip(face.iter()) {
        *slot = *mesh.uv_coords.get(corner.uv?)?;
    }
    Some(uvs)
}

/// Barycentric weights of `p` in triangle `(a, b, c)`; `None` for a
/// degenerate triangle.
fn barycentric(
    p: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
) -> Option<(f64, f64, f64)> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let denom = v0.x * v1.y - v1.x * v0.y;
    if denom.abs() < 1e-15 {
        return None;
    }
    let wb = (v2.x * v1.y - v1.x * v2.y) / denom;
    let wc = (v0.x * v2.y - v2.x * v0.y) / denom;
    Some((1.0 - wb - wc, wb, wc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FaceCorner;
    use approx::assert_relative_eq;

    /// Unit UV square mapped onto a planar 10x10 patch at z = 2.
    fn textured_patch() -> Mesh {
        let f = |a, b, c| {
            [
                FaceCorner::with_uv(a, a),
                FaceCorner::with_uv(b, b),
                FaceCorner::with_uv(c, c),
            ]
        };
        Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 2.0),
                Point3::new(10.0, 0.0, 2.0),
                Point3::new(10.0, 10.0, 2.0),
                Point3::new(0.0, 10.0, 2.0),
            ],
            faces: vec![f(0, 1, 2), f(0, 2, 3)],
            uv_coords: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            ..Mesh::default()
        }
    }

    #[test]
    fn interior_lookup_interpolates_positions() {
        let mesh = textured_patch();
        let locator = UvLocator::build(&mesh).unwrap();

        let p = locator.lookup(Point2::new(0.25, 0.75), &mesh).unwrap();
        assert_relative_eq!(p, Point3::new(2.5, 7.5, 2.0), epsilon = 1e-9);

        let p = locator.lookup(Point2::new(0.9, 0.1), &mesh).unwrap();
        assert_relative_eq!(p, Point3::new(9.0, 1.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn vertices_and_shared_edge_hit_exactly() {
        let mesh = textured_patch();
        let locator = UvLocator::build(&mesh).unwrap();

        let p = locator.lookup(Point2::new(0.0, 0.0), &mesh).unwrap();
        assert_relative_eq!(p, mesh.vertices[0], epsilon = 1e-9);

        // On the diagonal shared by both triangles.
        let p = locator.lookup(Point2::new(0.5, 0.5), &mesh).unwrap();
        assert_relative_eq!(p, Point3::new(5.0, 5.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn outside_coordinates_give_none() {
        let mesh = textured_patch();
        let locator = UvLocator::build(&mesh).unwrap();
        assert!(locator.lookup(Point2::new(1.5, 0.5), &mesh).is_none());
        assert!(locator.lookup(Point2::new(-0.1, -0.1), &mesh).is_none());
    }

    #[test]
    fn mesh_without_uvs_gives_no_locator() {
        let mesh = Mesh {
            vertices: vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[
                FaceCorner::position_only(0),
                FaceCorner::position_only(1),
                FaceCorner::position_only(2),
            ]],
            ..Mesh::default()
        };
        assert!(UvLocator::build(&mesh).is_none());
    }
}
