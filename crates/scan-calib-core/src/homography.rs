//! Planar homography estimation.
//!
//! Used by the fiducial detector to sample marker cells from arbitrary
//! quads and to project catalog board corners into the image.

use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// 3x3 planar projective transform, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Hartley normalization: translate to the centroid, scale so the mean
/// distance from it is sqrt(2).
fn normalizing_transform(pts: &[Point2<f64>]) -> Matrix3<f64> {
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        mean_dist += ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
    }
    mean_dist /= n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn apply_3x3(t: &Matrix3<f64>, p: Point2<f64>) -> Point2<f64> {
    let v = t * Vector3::new(p.x, p.y, 1.0);
    Point2::new(v[0] / v[2], v[1] / v[2])
}

/// Estimate `H` with `dst ~ H * src` from N >= 4 correspondences.
///
/// Normalized DLT: both point sets are Hartley-normalized, the stacked
/// 2Nx9 system is solved by SVD, and the result is denormalized and scaled
/// so `h33 == 1`. Returns `None` for short or degenerate input.
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let t_src = normalizing_transform(src);
    let t_dst = normalizing_transform(dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let s = apply_3x3(&t_src, src[k]);
        let d = apply_3x3(&t_dst, dst[k]);
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Null vector of A = right singular vector with the smallest singular value.
    let svd = a.svd(true, true);
    let vt = svd.v_t?;
    let h = vt.row(vt.nrows().checked_sub(1)?);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    let h_full = t_dst.try_inverse()? * hn * t_src;
    let scale = h_full[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h_full / scale))
}
