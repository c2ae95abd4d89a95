//! Minimal rotation aligning one direction onto another.

use nalgebra::{Matrix3, Vector3};

const ANTIPARALLEL_TOL: f64 = 1e-3;
const PARALLEL_TOL: f64 = 1e-7;

/// Rotation matrix `R` with `R * a ~ b` for unit vectors `a`, `b`.
///
/// The naive Rodrigues form `I + [v]x + [v]x^2 / (1 + a.b)` blows up as
/// `a -> -b`. Anti-parallel inputs are handled first with a 180-degree
/// rotation whose axis is chosen deterministically from `tiebreak`: the
/// diagonal is the per-component sign of `|tiebreak| - 1`, so the axis
/// nearest to `tiebreak` keeps its sign. The Rodrigues refinement then runs
/// on the pre-rotated vector, where `1 + a.b` is well-conditioned.
pub fn align_rotation(a: &Vector3<f64>, b: &Vector3<f64>, tiebreak: &Vector3<f64>) -> Matrix3<f64> {
    let mut r = Matrix3::identity();

    // Anti-parallel at low precision: deterministic 180-degree pre-rotation.
    if (a.dot(b) + 1.0).abs() < ANTIPARALLEL_TOL {
        r = Matrix3::from_diagonal(&Vector3::new(
            1.0_f64.copysign(tiebreak.x.abs() - 1.0),
            1.0_f64.copysign(tiebreak.y.abs() - 1.0),
            1.0_f64.copysign(tiebreak.z.abs() - 1.0),
        ));
    }

    // Already aligned (possibly by the pre-rotation) at high precision.
    let a = r * a;
    let c = a.dot(b);
    if (c - 1.0).abs() < PARALLEL_TOL {
        return r;
    }

    let v = a.cross(b);
    let vx = skew(&v);
    let rod = Matrix3::identity() + vx + vx * vx / (1.0 + c);
    rod * r
}

#[inline]
fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
