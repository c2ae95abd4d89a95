//! Sample-square detection with orientation normalization.

use nalgebra::Point2;
use scan_calib_core::{GrayImage, GrayImageView, QuarterTurn};

use crate::board::{detect_board, BoardLayout, DecodeParams, DetectedBoard};
use crate::catalog::catalog;
use crate::quads::extract_quad_candidates;

/// Image axis a detection was mirrored along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipAxis {
    /// Mirrored left-right.
    Horizontal,
    /// Mirrored top-bottom.
    Vertical,
}

/// Detection parameters for the whole sample square.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Minimum quad perimeter as a fraction of the max image dimension.
    pub min_marker_perimeter_rate: f64,
    /// Above this max dimension the perimeter rate is relaxed; markers
    /// are small relative to large-area scans.
    pub large_image_dim: usize,
    /// Perimeter rate used for large images.
    pub large_image_perimeter_rate: f64,
    pub decode: DecodeParams,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            min_marker_perimeter_rate: 0.03,
            large_image_dim: 14000,
            large_image_perimeter_rate: 0.015,
            decode: DecodeParams::default(),
        }
    }
}

/// One detected keypoint in the flat sample-square namespace.
#[derive(Clone, Copy, Debug)]
pub struct Keypoint {
    pub id: usize,
    pub position: Point2<f64>,
}

/// Result of [`detect_sample_square`].
///
/// All pixel coordinates are reported in the normalized orientation: the
/// winning flip has already been applied, and a non-`None` `rotation` has
/// been applied to every coordinate in place.
#[derive(Clone, Debug)]
pub struct SampleSquareDetection {
    /// At least two keypoints were found.
    pub detected: bool,
    pub boards: [DetectedBoard; 2],
    /// Keypoints of both boards, ascending by id.
    pub keypoints: Vec<Keypoint>,
    /// Mean pixels-per-cm over all keypoint pairs; zero when not detected.
    pub pixels_per_cm: f64,
    /// Mirror axis of the winning orientation, if any.
    pub flip: Option<FlipAxis>,
    /// Quarter-turn applied to normalize the reported coordinates.
    pub rotation: Option<QuarterTurn>,
}

/// Detect the sample square in a texture image.
///
/// Detection runs on the image as-is and mirrored along each axis; the
/// orientation with the most keypoints wins, ties favoring unmirrored.
/// With two or more keypoints, the mean signed angle between observed and
/// catalog pair directions is snapped to a quarter turn and applied to
/// the reported coordinates. Zero detections is a soft miss, never an
/// error.
pub fn detect_sample_square(img: &GrayImage, params: &DetectParams) -> SampleSquareDetection {
    let (mut boards, mut keypoints) = detect_boards(&img.view(), params);
    let mut flip = None;

    for axis in [FlipAxis::Horizontal, FlipAxis::Vertical] {
        let mirrored = match axis {
            FlipAxis::Horizontal => img.flipped_horizontal(),
            FlipAxis::Vertical => img.flipped_vertical(),
        };
        let (b, kp) = detect_boards(&mirrored.view(), params);
        if kp.len() > keypoints.len() {
            boards = b;
            keypoints = kp;
            flip = Some(axis);
        }
    }

    let detected = keypoints.len() > 1;
    let mut pixels_per_cm = 0.0;
    let mut rotation = None;

    if detected {
        let (ppcm, theta) = pair_statistics(&keypoints);
        pixels_per_cm = ppcm;

        rotation = snap_quarter_turn(theta);
        if let Some(turn) = rotation {
            let max_x = (img.width - 1) as f64;
            let max_y = (img.height - 1) as f64;
            let map = |p: Point2<f64>| turn.map_point(p, max_x, max_y);

            for kp in &mut keypoints {
                kp.position = map(kp.position);
            }
            for board in &mut boards {
                for m in &mut board.markers {
                    m.corners = m.corners.map(&map);
                }
                for c in &mut board.corners {
                    c.position = map(c.position);
                }
            }
        }
    }

    log::info!(
        "sample square: {} keypoints, {:.2} px/cm, flip {:?}, rotation {:?}",
        keypoints.len(),
        pixels_per_cm,
        flip,
        rotation
    );

    SampleSquareDetection {
        detected,
        boards,
        keypoints,
        pixels_per_cm,
        flip,
        rotation,
    }
}

/// Detect both boards in one orientation and flatten their keypoints.
fn detect_boards(
    img: &GrayImageView<'_>,
    params: &DetectParams,
) -> ([DetectedBoard; 2], Vec<Keypoint>) {
    let max_dim = img.width.max(img.height);
    let rate = if max_dim > params.large_image_dim {
        params.large_image_perimeter_rate
    } else {
        params.min_marker_perimeter_rate
    };
    let quads = extract_quad_candidates(img, rate * max_dim as f64);

    let boards = [0, 1].map(|idx| {
        detect_board(
            img,
            &quads,
            &BoardLayout::sample_square(idx),
            &params.decode,
        )
    });

    let mut keypoints = Vec::new();
    for board in &boards {
        for m in &board.markers {
            keypoints.push(Keypoint {
                id: m.keypoint,
                // The marker keypoint is its canonical top-left corner.
                position: m.corners[0],
            });
        }
        for c in &board.corners {
            keypoints.push(Keypoint {
                id: c.keypoint,
                position: c.position,
            });
        }
    }
    keypoints.sort_by_key(|kp| kp.id);

    (boards, keypoints)
}

/// Mean pixels-per-cm and mean signed rotation angle over keypoint pairs.
fn pair_statistics(keypoints: &[Keypoint]) -> (f64, f64) {
    let cat = catalog();
    let mut ppcm_sum = 0.0;
    let mut theta_sum = 0.0;
    let mut pairs = 0usize;

    for (i, a) in keypoints.iter().enumerate() {
        for b in &keypoints[i + 1..] {
            let dist_px = (b.position - a.position).norm();
            ppcm_sum += dist_px / cat.distance(a.id, b.id);

            let dir_px = (b.position - a.position) / dist_px;
            let dir_cm = cat.direction(a.id, b.id).normalize();
            let mut theta = (dir_px.x * dir_cm.y - dir_px.y * dir_cm.x)
                .atan2(dir_px.dot(&dir_cm));
            if theta < 0.0 {
                theta += std::f64::consts::TAU;
            }
            theta_sum += theta;
            pairs += 1;
        }
    }

    (ppcm_sum / pairs as f64, theta_sum / pairs as f64)
}

/// Snap a mean angle to the nearest quarter turn; `None` for zero.
fn snap_quarter_turn(theta: f64) -> Option<QuarterTurn> {
    use std::f64::consts::{FRAC_PI_2, PI};
    let snaps = [
        (0.0, None),
        (FRAC_PI_2, Some(QuarterTurn::Cw90)),
        (PI, Some(QuarterTurn::Cw180)),
        (1.5 * PI, Some(QuarterTurn::Cw270)),
    ];
    snaps
        .iter()
        .min_by(|(a, _), (b, _)| (theta - a).abs().total_cmp(&(theta - b).abs()))
        .and_then(|&(_, turn)| turn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KEYPOINT_COUNT;
    use crate::testutil::render_sample_square;
    use approx::assert_relative_eq;

    fn assert_keypoints_match_catalog(det: &SampleSquareDetection, ppcm: f64, tol_px: f64) {
        assert_eq!(det.keypoints.len(), KEYPOINT_COUNT);
        for kp in &det.keypoints {
            let expected = catalog().position(kp.id) * ppcm;
            assert_relative_eq!(kp.position, expected, epsilon = tol_px);
        }
    }

    #[test]
    fn upright_square_detects_all_keypoints() {
        let (img, ppcm) = render_sample_square(10);
        let det = detect_sample_square(&img, &DetectParams::default());

        assert!(det.detected);
        assert!(det.flip.is_none());
        assert!(det.rotation.is_none());
        assert!((det.pixels_per_cm - ppcm).abs() / ppcm < 0.01);
        assert_keypoints_match_catalog(&det, ppcm, 1.5);
    }

    #[test]
    fn clockwise_rolled_image_is_normalized_back() {
        let (img, ppcm) = render_sample_square(10);
        let rolled = img.rotated(QuarterTurn::Cw90);
        let det = detect_sample_square(&rolled, &DetectParams::default());

        assert!(det.detected);
        assert!(det.flip.is_none());
        assert_eq!(det.rotation, Some(QuarterTurn::Cw270));
        assert_keypoints_match_catalog(&det, ppcm, 1.5);
    }

    #[test]
    fn mirrored_image_wins_on_the_flipped_trial() {
        let (img, ppcm) = render_sample_square(10);
        let mirrored = img.flipped_horizontal();
        let det = detect_sample_square(&mirrored, &DetectParams::default());

        assert!(det.detected);
        assert_eq!(det.flip, Some(FlipAxis::Horizontal));
        assert!(det.rotation.is_none());
        assert_keypoints_match_catalog(&det, ppcm, 1.5);
    }

    #[test]
    fn blank_image_is_a_soft_miss() {
        let img = GrayImage::new(64, 64, 255);
        let det = detect_sample_square(&img, &DetectParams::default());

        assert!(!det.detected);
        assert!(det.keypoints.is_empty());
        assert_eq!(det.pixels_per_cm, 0.0);
        assert!(det.flip.is_none() && det.rotation.is_none());
    }

    #[test]
    fn lone_marker_still_yields_interpolated_corners() {
        use crate::board::BoardLayout;
        use crate::testutil::render_marker;

        // One marker of board 0 at its catalog position, 150 px/cm.
        let ppcm = 150.0;
        let mut img = GrayImage::new(400, 400, 255);
        let layout = BoardLayout::sample_square(0);
        let tl = catalog().position(0) * ppcm;
        render_marker(
            &mut img,
            layout.dictionary().codes[0],
            tl.x.round() as usize,
            tl.y.round() as usize,
            10,
        );

        let det = detect_sample_square(&img, &DetectParams::default());
        assert!(det.detected);
        // The marker keypoint plus the four corners projected through the
        // single-marker homography.
        let ids: Vec<usize> = det.keypoints.iter().map(|kp| kp.id).collect();
        assert_eq!(ids, vec![0, 4, 5, 6, 7]);
        assert!((det.pixels_per_cm - ppcm).abs() / ppcm < 0.015);
    }
}
