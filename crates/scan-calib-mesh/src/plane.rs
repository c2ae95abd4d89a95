//! RANSAC plane segmentation for point clouds.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Plane in Hessian normal form: `normal . p + offset = 0`, unit normal.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    /// Absolute point-to-plane distance.
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        (self.normal.dot(&p.coords) + self.offset).abs()
    }
}

/// Parameters for [`segment_plane`].
#[derive(Clone, Copy, Debug)]
pub struct PlaneRansacParams {
    /// Inlier distance threshold.
    pub distance_threshold: f64,
    /// Points drawn per hypothesis. 3 fits by cross product, more by a
    /// minimum-variance fit.
    pub sample_size: usize,
    /// Hard cap on hypothesis count.
    pub max_iterations: usize,
    /// Target probability of drawing at least one all-inlier sample,
    /// used to shrink the iteration budget adaptively.
    pub confidence: f64,
    /// RNG seed, for reproducible segmentation.
    pub seed: u64,
}

impl Default for PlaneRansacParams {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            sample_size: 3,
            max_iterations: 1000,
            confidence: 0.999,
            seed: 0,
        }
    }
}

/// Winning plane hypothesis with its consensus set.
#[derive(Clone, Debug)]
pub struct PlaneRansacResult {
    pub plane: Plane,
    /// Indices of consensus points, ascending.
    pub inliers: Vec<usize>,
    /// Inlier fraction of the full cloud.
    pub fitness: f64,
    /// Root mean square inlier distance.
    pub inlier_rmse: f64,
}

/// Fit a plane through exactly three points.
fn fit_cross_product(points: &[Point3<f64>]) -> Option<Plane> {
    let normal = (points[1] - points[0]).cross(&(points[2] - points[0]));
    let norm = normal.norm();
    if norm < 1e-12 {
        return None;
    }
    let normal = normal / norm;
    Some(Plane {
        normal,
        offset: -normal.dot(&points[0].coords),
    })
}

/// Least-squares plane through any number of points: the normal is the
/// covariance eigenvector with the smallest eigenvalue.
fn fit_min_variance(points: &[Point3<f64>]) -> Option<Plane> {
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
    let eig = SymmetricEigen::new(cov);
    let mut min_idx = 0;
    for i in 1..3 {
        if eig.eigenvalues[i] < eig.eigenvalues[min_idx] {
            min_idx = i;
        }
    }
    if eig.eigenvalues[min_idx].is_nan() {
        return None;
    }
    let normal: Vector3<f64> = eig.eigenvectors.column(min_idx).into();
    let norm = normal.norm();
    if norm < 1e-12 {
        return None;
    }
    let normal = normal / norm;
    Some(Plane {
        normal,
        offset: -normal.dot(&mean),
    })
}

fn fit_plane(points: &[Point3<f64>]) -> Option<Plane> {
    if points.len() == 3 {
        fit_cross_product(points)
    } else {
        fit_min_variance(points)
    }
}

fn consensus(points: &[Point3<f64>], plane: &Plane, threshold: f64) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut sq_sum = 0.0;
    for (i, p) in points.iter().enumerate() {
        let d = plane.distance(p);
        if d <= threshold {
            inliers.push(i);
            sq_sum += d * d;
        }
    }
    let rmse = if inliers.is_empty() {
        f64::INFINITY
    } else {
        (sq_sum / inliers.len() as f64).sqrt()
    };
    (inliers, rmse)
}

/// Iteration count needed to hit `confidence` given the observed inlier
/// ratio `w` and sample size `m`.
fn required_iterations(confidence: f64, w: f64, m: usize, cap: usize) -> usize {
    if w <= 0.0 {
        return cap;
    }
    let denom = (1.0 - w.powi(m as i32)).max(f64::MIN_POSITIVE).ln();
    if denom >= 0.0 {
        return 1;
    }
    let needed = ((1.0 - confidence).ln() / denom).ceil();
    (needed as usize).clamp(1, cap)
}

/// Segment the dominant plane from a point cloud.
///
/// Hypotheses are drawn with a seeded RNG; the winner maximizes inlier
/// count with RMSE as a tiebreaker. The winning consensus set is refit
/// with the minimum-variance estimator and its inliers recomputed against
/// the refit plane. Returns `None` when no valid hypothesis is found or
/// the cloud is smaller than `sample_size`.
pub fn segment_plane(
    points: &[Point3<f64>],
    params: &PlaneRansacParams,
) -> Option<PlaneRansacResult> {
    let m = params.sample_size.max(3);
    if points.len() < m {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let indices: Vec<usize> = (0..points.len()).collect();

    let mut best: Option<(Plane, Vec<usize>, f64)> = None;
    let mut budget = params.max_iterations.max(1);
    let mut iteration = 0;

    while iteration < budget {
        iteration += 1;
        let sample: Vec<Point3<f64>> = indices
            .choose_multiple(&mut rng, m)
            .map(|&i| points[i])
            .collect();
        let Some(plane) = fit_plane(&sample) else {
            continue;
        };
        let (inliers, rmse) = consensus(points, &plane, params.distance_threshold);
        if inliers.is_empty() {
            continue;
        }

        let better = match &best {
            None => true,
            Some((_, best_inliers, best_rmse)) => {
                inliers.len() > best_inliers.len()
                    || (inliers.len() == best_inliers.len() && rmse < *best_rmse)
            }
        };
        if better {
            let w = inliers.len() as f64 / points.len() as f64;
            budget = required_iterations(params.confidence, w, m, params.max_iterations.max(1));
            best = Some((plane, inliers, rmse));
        }
    }

    let (_, inliers, _) = best?;
    log::debug!(
        "plane consensus after {iteration} iterations: {} of {} points",
        inliers.len(),
        points.len()
    );

    // Final refit over the full consensus set, then rescore against it.
    let inlier_points: Vec<Point3<f64>> = inliers.iter().map(|&i| points[i]).collect();
    let plane = fit_min_variance(&inlier_points)?;
    let (inliers, inlier_rmse) = consensus(points, &plane, params.distance_threshold);
    if inliers.is_empty() {
        return None;
    }

    Some(PlaneRansacResult {
        plane,
        fitness: inliers.len() as f64 / points.len() as f64,
        inliers,
        inlier_rmse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    /// Grid on z = 0 with `outliers` points lifted well above threshold.
    fn noisy_plane_cloud(outliers: usize) -> Vec<Point3<f64>> {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pts = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let z = rng.random_range(-1e-4..1e-4);
                pts.push(Point3::new(i as f64 * 0.1, j as f64 * 0.1, z));
            }
        }
        for _ in 0..outliers {
            pts.push(Point3::new(
                rng.random_range(0.0..2.0),
                rng.random_range(0.0..2.0),
                rng.random_range(0.5..2.0),
            ));
        }
        pts
    }

    #[test]
    fn recovers_dominant_plane_among_outliers() {
        let pts = noisy_plane_cloud(80);
        let params = PlaneRansacParams {
            distance_threshold: 0.01,
            ..PlaneRansacParams::default()
        };
        let result = segment_plane(&pts, &params).unwrap();

        assert_relative_eq!(result.plane.normal.z.abs(), 1.0, epsilon = 1e-3);
        assert!(result.plane.offset.abs() < 1e-3);
        assert_eq!(result.inliers.len(), 400);
        assert_relative_eq!(result.fitness, 400.0 / 480.0, epsilon = 1e-12);
        assert!(result.inlier_rmse < 1e-3);
    }

    #[test]
    fn same_seed_gives_same_consensus() {
        let pts = noisy_plane_cloud(80);
        let params = PlaneRansacParams {
            seed: 7,
            ..PlaneRansacParams::default()
        };
        let a = segment_plane(&pts, &params).unwrap();
        let b = segment_plane(&pts, &params).unwrap();
        assert_eq!(a.inliers, b.inliers);
        assert_relative_eq!(a.plane.offset, b.plane.offset, epsilon = 1e-15);
    }

    #[test]
    fn larger_samples_use_least_squares_fit() {
        let pts = noisy_plane_cloud(20);
        let params = PlaneRansacParams {
            sample_size: 10,
            ..PlaneRansacParams::default()
        };
        let result = segment_plane(&pts, &params).unwrap();
        assert_relative_eq!(result.plane.normal.z.abs(), 1.0, epsilon = 1e-3);
        assert_eq!(result.inliers.len(), 400);
    }

    #[test]
    fn undersized_cloud_gives_none() {
        let pts = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(segment_plane(&pts, &PlaneRansacParams::default()).is_none());
    }

    #[test]
    fn collinear_samples_are_rejected() {
        // All points on a line: every 3-sample is degenerate.
        let pts: Vec<_> = (0..10)
            .map(|i| Point3::new(i as f64, 0.0, 0.0))
            .collect();
        assert!(segment_plane(&pts, &PlaneRansacParams::default()).is_none());
    }
}
