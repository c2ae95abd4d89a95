//! Oriented bounding box from the point covariance eigenbasis.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};

/// Oriented bounding box described by one corner and three edge vectors.
///
/// Edges are ordered longest first. Each edge runs from `corner` to the
/// adjacent box corner, so edge directions carry an arbitrary sign.
#[derive(Clone, Debug)]
pub struct Obb {
    pub corner: Point3<f64>,
    pub edges: [Vector3<f64>; 3],
}

impl Obb {
    /// Box center.
    pub fn center(&self) -> Point3<f64> {
        self.corner + (self.edges[0] + self.edges[1] + self.edges[2]) * 0.5
    }

    /// Unit directions of the major, middle and minor axes.
    pub fn axes(&self) -> [Vector3<f64>; 3] {
        [
            self.edges[0].normalize(),
            self.edges[1].normalize(),
            self.edges[2].normalize(),
        ]
    }

    /// Edge lengths, longest first.
    pub fn extents(&self) -> [f64; 3] {
        [
            self.edges[0].norm(),
            self.edges[1].norm(),
            self.edges[2].norm(),
        ]
    }

    /// Among the box axes, the unit direction whose alignment with
    /// `target` is strongest, sign-corrected to point along `target`.
    pub fn closest_axis(&self, target: &Vector3<f64>) -> Vector3<f64> {
        let mut best = self.edges[0].normalize();
        let mut best_dot = best.dot(target);
        for edge in &self.edges[1..] {
            let axis = edge.normalize();
            let dot = axis.dot(target);
            if dot.abs() > best_dot.abs() {
                best = axis;
                best_dot = dot;
            }
        }
        if best_dot < 0.0 {
            -best
        } else {
            best
        }
    }
}

/// Fit an oriented bounding box to a point cloud.
///
/// The orientation comes from the eigenvectors of the point covariance;
/// extents are the projection ranges along each eigenvector. Returns `None`
/// for fewer than three points.
pub fn compute_obb(points: &[Point3<f64>]) -> Option<Obb> {
    if points.len() < 3 {
        return None;
    }

    let n = points.len() as f64;
    let mean = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / n;
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p.coords - mean;
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = SymmetricEigen::new(cov);
    let axes: [Vector3<f64>; 3] = [
        eig.eigenvectors.column(0).into(),
        eig.eigenvectors.column(1).into(),
        eig.eigenvectors.column(2).into(),
    ];

    // Projection range of the cloud along each eigenvector.
    let mut spans = [(0.0f64, 0.0f64); 3];
    for (axis, span) in axes.iter().zip(spans.iter_mut()) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for p in points {
            let t = axis.dot(&(p.coords - mean));
            lo = lo.min(t);
            hi = hi.max(t);
        }
        *span = (lo, hi);
    }

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        let la = spans[a].1 - spans[a].0;
        let lb = spans[b].1 - spans[b].0;
        lb.total_cmp(&la)
    });

    let corner = Point3::from(
        mean + order
            .iter()
            .map(|&i| axes[i] * spans[i].0)
            .sum::<Vector3<f64>>(),
    );
    let edges = order.map(|i| axes[i] * (spans[i].1 - spans[i].0));

    Some(Obb { corner, edges })
}
