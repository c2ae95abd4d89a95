//! Physical keypoint catalog of the sample square.
//!
//! The sample square carries two small fiducial boards, one near the top
//! edge and one near the bottom. Each board contributes four marker
//! top-left corners and four internal board corners, giving sixteen
//! keypoints with known physical positions.

use nalgebra::{Point2, Vector2};
use std::sync::OnceLock;

/// Keypoints on the sample square.
pub const KEYPOINT_COUNT: usize = 16;

/// Keypoints contributed by one board: four markers plus four corners.
pub const KEYPOINTS_PER_BOARD: usize = 8;

/// Markers (and internal corners) per board.
pub const MARKERS_PER_BOARD: usize = 4;

/// Board square side in cm.
pub const SQUARE_SIDE_CM: f64 = 10.0 / 15.0;

/// Marker side in cm (7 of 10 square units).
pub const MARKER_SIDE_CM: f64 = 7.0 / 15.0;

/// Physical positions of the keypoints relative to the top-left corner of
/// the sample square, in cm. Marker keypoints are marker top-left corners.
/// Values follow the Sample Square v1 placement guide.
const KEYPOINT_POS_CM: [[f64; 2]; KEYPOINT_COUNT] = [
    // board 0 markers
    [0.966666666666667, 0.3],
    [0.3, 0.966666666666667],
    [1.633333333333334, 0.966666666666667],
    [0.966666666666667, 1.633333333333334],
    // board 0 corners
    [0.866623541666667, 0.866623541666667],
    [1.533290208333333, 0.866623541666667],
    [0.866623541666667, 1.533290208333333],
    [1.533290208333333, 1.533290208333333],
    // board 1 markers
    [0.966666666666667, 13.4],
    [0.3, 14.066666666666667],
    [1.633333333333334, 14.066666666666667],
    [0.966666666666667, 14.733333333333334],
    // board 1 corners
    [0.866623541666667, 13.966623541666667],
    [1.533290208333333, 13.966623541666667],
    [0.866623541666667, 14.633290208333333],
    [1.533290208333333, 14.633290208333333],
];

/// Flat keypoint id of a board's marker (marker top-left corner).
#[inline]
pub fn marker_keypoint(board: usize, marker: usize) -> usize {
    board * KEYPOINTS_PER_BOARD + marker
}

/// Flat keypoint id of a board's internal corner.
#[inline]
pub fn corner_keypoint(board: usize, corner: usize) -> usize {
    board * KEYPOINTS_PER_BOARD + MARKERS_PER_BOARD + corner
}

/// Immutable catalog of sample-square keypoint positions with their
/// pairwise distance matrix.
#[derive(Debug)]
pub struct KeypointCatalog {
    positions: [Point2<f64>; KEYPOINT_COUNT],
    distances: [[f64; KEYPOINT_COUNT]; KEYPOINT_COUNT],
}

impl KeypointCatalog {
    /// Physical position of a keypoint, in cm.
    #[inline]
    pub fn position(&self, id: usize) -> Point2<f64> {
        self.positions[id]
    }

    /// Physical distance between two keypoints, in cm.
    #[inline]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.distances[a][b]
    }

    /// Physical direction from keypoint `a` to keypoint `b`.
    pub fn direction(&self, a: usize, b: usize) -> Vector2<f64> {
        self.positions[b] - self.positions[a]
    }
}

/// Process-wide keypoint catalog.
pub fn catalog() -> &'static KeypointCatalog {
    static CATALOG: OnceLock<KeypointCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let positions = KEYPOINT_POS_CM.map(|[x, y]| Point2::new(x, y));
        let distances = std::array::from_fn(|a| {
            std::array::from_fn(|b| (positions[b] - positions[a]).norm())
        });
        KeypointCatalog {
            positions,
            distances,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn boards_are_translates_of_each_other() {
        let cat = catalog();
        let shift = cat.position(8) - cat.position(0);
        assert_relative_eq!(shift.x, 0.0, epsilon = 1e-9);
        for k in 0..KEYPOINTS_PER_BOARD {
            let d = cat.position(k + KEYPOINTS_PER_BOARD) - cat.position(k);
            assert_relative_eq!(d, shift, epsilon = 1e-9);
        }
    }

    #[test]
    fn marker_spacing_matches_square_side() {
        let cat = catalog();
        // Markers 1 and 2 sit one square apart on each side of marker 0's
        // column, two squares apart from each other.
        assert_relative_eq!(
            cat.distance(1, 2),
            2.0 * SQUARE_SIDE_CM,
            epsilon = 1e-9
        );
        // Marker 0 to marker 3 spans two squares vertically.
        let d = cat.direction(0, 3);
        assert_relative_eq!(d.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(d.y, 2.0 * SQUARE_SIDE_CM, epsilon = 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let cat = catalog();
        for a in 0..KEYPOINT_COUNT {
            for b in 0..KEYPOINT_COUNT {
                assert_relative_eq!(cat.distance(a, b), cat.distance(b, a));
            }
        }
    }

    #[test]
    fn flat_id_helpers_cover_the_namespace() {
        assert_eq!(marker_keypoint(0, 0), 0);
        assert_eq!(corner_keypoint(0, 0), 4);
        assert_eq!(marker_keypoint(1, 3), 11);
        assert_eq!(corner_keypoint(1, 3), 15);
    }
}
