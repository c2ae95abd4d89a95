//! Per-board marker decoding and internal corner interpolation.
//!
//! Each sample-square board is a 3x3 checkerboard carrying four markers on
//! its white squares. Markers are decoded from quad candidates; the four
//! internal checkerboard corners are then interpolated through a board
//! plane to image homography fit on the decoded marker corners.

use nalgebra::Point2;
use scan_calib_core::{estimate_homography, GrayImageView};

use crate::catalog::{
    catalog, corner_keypoint, marker_keypoint, MARKERS_PER_BOARD, MARKER_SIDE_CM,
};
use crate::dictionary::{aruco_original_subset, Dictionary, MARKER_BITS};
use crate::matcher::Matcher;
use crate::threshold::otsu_threshold;

/// Family ids are cut in blocks of 512 per board.
const BOARD_ID_STRIDE: u32 = 512;

/// Grid cells per marker side: payload plus a one-cell black border.
const GRID_CELLS: usize = MARKER_BITS + 2;

/// Subdivision of the threshold sampling grid relative to cell size.
const THRESH_SUBDIV: usize = 3;

/// Decoder configuration shared by both boards.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Maximum Hamming distance accepted by the dictionary matcher.
    pub max_hamming: u8,
    /// Require this fraction of border cells to read black.
    pub min_border_score: f64,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            max_hamming: 1,
            min_border_score: 0.85,
        }
    }
}

/// One decoded marker with its image corners in canonical order
/// (TL, TR, BR, BL of the marker's own frame).
#[derive(Clone, Debug)]
pub struct DetectedMarker {
    /// Flat keypoint id of the marker's top-left corner.
    pub keypoint: usize,
    pub corners: [Point2<f64>; 4],
    pub hamming: u8,
    pub border_score: f64,
}

/// One interpolated internal board corner.
#[derive(Clone, Copy, Debug)]
pub struct DetectedCorner {
    /// Flat keypoint id of the corner.
    pub keypoint: usize,
    pub position: Point2<f64>,
}

/// Detection result for one board, sorted ascending by keypoint id.
#[derive(Clone, Debug, Default)]
pub struct DetectedBoard {
    pub markers: Vec<DetectedMarker>,
    pub corners: Vec<DetectedCorner>,
}

impl DetectedBoard {
    /// Total keypoints this board contributes.
    #[inline]
    pub fn keypoint_count(&self) -> usize {
        self.markers.len() + self.corners.len()
    }
}

/// Static layout of one sample-square board.
#[derive(Clone, Debug)]
pub struct BoardLayout {
    index: usize,
    dictionary: Dictionary,
}

impl BoardLayout {
    /// Layout of sample-square board 0 (top) or 1 (bottom).
    pub fn sample_square(index: usize) -> Self {
        debug_assert!(index < 2);
        Self {
            index,
            dictionary: aruco_original_subset(index as u32 * BOARD_ID_STRIDE, MARKERS_PER_BOARD),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Physical marker corners in catalog coordinates (TL, TR, BR, BL), cm.
    fn marker_object_corners(&self, marker: usize) -> [Point2<f64>; 4] {
        let tl = catalog().position(marker_keypoint(self.index, marker));
        let s = MARKER_SIDE_CM;
        [
            tl,
            Point2::new(tl.x + s, tl.y),
            Point2::new(tl.x + s, tl.y + s),
            Point2::new(tl.x, tl.y + s),
        ]
    }
}

/// Decode one board's markers from quad candidates and interpolate its
/// internal corners.
pub(crate) fn detect_board(
    img: &GrayImageView<'_>,
    quads: &[[Point2<f64>; 4]],
    layout: &BoardLayout,
    params: &DecodeParams,
) -> DetectedBoard {
    let matcher = Matcher::new(layout.dictionary().clone(), params.max_hamming);

    let mut markers: Vec<DetectedMarker> = Vec::new();
    for quad in quads {
        let Some(det) = decode_quad(img, quad, &matcher, params, layout.index) else {
            continue;
        };
        match markers.iter_mut().find(|m| m.keypoint == det.keypoint) {
            Some(prev) => {
                if (det.hamming, -det.border_score) < (prev.hamming, -prev.border_score) {
                    *prev = det;
                }
            }
            None => markers.push(det),
        }
    }
    markers.sort_by_key(|m| m.keypoint);

    let corners = interpolate_corners(&markers, layout);
    log::debug!(
        "board {}: {} markers, {} corners",
        layout.index(),
        markers.len(),
        corners.len()
    );

    DetectedBoard { markers, corners }
}

/// Fit the board-plane-to-image homography on every decoded marker corner
/// and project the catalog's internal corner positions through it. One
/// decoded marker (four correspondences) is enough.
fn interpolate_corners(markers: &[DetectedMarker], layout: &BoardLayout) -> Vec<DetectedCorner> {
    if markers.is_empty() {
        return Vec::new();
    }

    let mut object = Vec::with_capacity(markers.len() * 4);
    let mut image = Vec::with_capacity(markers.len() * 4);
    for m in markers {
        let local = m.keypoint - marker_keypoint(layout.index, 0);
        object.extend_from_slice(&layout.marker_object_corners(local));
        image.extend_from_slice(&m.corners);
    }
    let Some(h) = estimate_homography(&object, &image) else {
        return Vec::new();
    };

    (0..MARKERS_PER_BOARD)
        .map(|c| {
            let kp = corner_keypoint(layout.index, c);
            DetectedCorner {
                keypoint: kp,
                position: h.apply(catalog().position(kp)),
            }
        })
        .collect()
}

fn decode_quad(
    img: &GrayImageView<'_>,
    quad: &[Point2<f64>; 4],
    matcher: &Matcher,
    params: &DecodeParams,
    board_index: usize,
) -> Option<DetectedMarker> {
    let unit = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let h = estimate_homography(&unit, quad)?;

    // Threshold over a fine grid spanning the whole quad.
    let fine = GRID_CELLS * THRESH_SUBDIV;
    let mut thr_samples = Vec::with_capacity(fine * fine);
    for ty in 0..fine {
        for tx in 0..fine {
            let p = h.apply(Point2::new(
                (tx as f64 + 0.5) / fine as f64,
                (ty as f64 + 0.5) / fine as f64,
            ));
            if let Some(v) = sample_mean_3x3(img, p.x, p.y) {
                thr_samples.push(v);
            }
        }
    }
    let thr = otsu_threshold(thr_samples);

    // Read the cell grid: 24 border cells plus the 5x5 payload.
    let mut border_ok = 0u32;
    let mut code = 0u64;
    for cy in 0..GRID_CELLS {
        for cx in 0..GRID_CELLS {
            let p = h.apply(Point2::new(
                (cx as f64 + 0.5) / GRID_CELLS as f64,
                (cy as f64 + 0.5) / GRID_CELLS as f64,
            ));
            let is_black = sample_mean_3x3(img, p.x, p.y)? < thr;

            let is_border = cx == 0 || cy == 0 || cx + 1 == GRID_CELLS || cy + 1 == GRID_CELLS;
            if is_border {
                if is_black {
                    border_ok += 1;
                }
            } else if is_black {
                code |= 1u64 << ((cy - 1) * MARKER_BITS + (cx - 1));
            }
        }
    }

    let border_total = GRID_CELLS * GRID_CELLS - MARKER_BITS * MARKER_BITS;
    let border_score = border_ok as f64 / border_total as f64;
    if border_score < params.min_border_score {
        return None;
    }

    let m = matcher.match_code(code)?;
    // The observed grid is the canonical marker rotated clockwise by
    // `rotation` quarter turns, so the canonical corner `i` sits at
    // observed corner `rotation + i`.
    let r = m.rotation as usize;
    let corners = std::array::from_fn(|i| quad[(r + i) % 4]);

    Some(DetectedMarker {
        keypoint: marker_keypoint(board_index, m.index as usize),
        corners,
        hamming: m.hamming,
        border_score,
    })
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f64, y: f64) -> Option<u8> {
    let ix = x.floor() as i64;
    let iy = y.floor() as i64;
    if ix < 1 || iy < 1 || ix + 1 >= img.width as i64 || iy + 1 >= img.height as i64 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let idx = (iy + dy) as usize * img.width + (ix + dx) as usize;
            sum += img.data[idx] as u32;
        }
    }
    Some((sum / 9) as u8)
}
